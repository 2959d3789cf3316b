//! Prompt construction and output parsing

use serde::Deserialize;
use serde_json::Value;

use super::{default_confidence, GenerationRequest, GeneratorError, RecommendationCandidate};

/// Cap on exclusion names in one prompt
pub const MAX_EXCLUDED_IN_PROMPT: usize = 100;

pub const RECOMMENDATION_SYSTEM_PROMPT: &str = "You are an expert in heavy metal and all of its \
subgenres. You recommend real, existing songs that are available on Spotify. You answer with a \
single JSON object and nothing else.";

pub const BIO_SYSTEM_PROMPT: &str = "You are a music journalist specialising in metal. You write \
short, factual artist biographies in plain text without Markdown.";

/// User message for a candidate batch
pub fn recommendation_prompt(request: &GenerationRequest) -> String {
    let seed = &request.seed;
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "Base track: \"{}\" by {}\n",
        seed.name,
        seed.artists.join(", ")
    ));
    if !seed.genres.is_empty() {
        prompt.push_str(&format!("Genres: {}\n", seed.genres.join(", ")));
    }
    prompt.push_str(&format!("Desired mood and direction: {}\n\n", request.description));

    prompt.push_str(&format!(
        "Recommend {} songs that match the base track and the desired mood. \
         Prefer variety across artists.\n",
        request.count
    ));

    if !request.exclude.is_empty() {
        prompt.push_str("Do NOT recommend any of these tracks:\n");
        for name in request.exclude.iter().take(MAX_EXCLUDED_IN_PROMPT) {
            prompt.push_str("- ");
            prompt.push_str(name);
            prompt.push('\n');
        }
    }

    prompt.push_str(
        "\nRespond with JSON of the form {\"recommendations\": [{\"song_title\": string, \
         \"artist_name\": string, \"reasoning\": string, \"confidence\": number between 0 and 1}]}. \
         The reasoning is one or two sentences explaining the fit.",
    );

    prompt
}

/// User message for an artist biography
pub fn bio_prompt(artist_name: &str) -> String {
    format!(
        "Write a 2-3 sentence biography of the metal artist \"{}\": origin, style and \
         notable releases.",
        artist_name
    )
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(default, alias = "title", alias = "song")]
    song_title: String,
    #[serde(default, alias = "artist")]
    artist_name: String,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("json") on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse generator output into candidates
///
/// Accepts `{"recommendations": [...]}` or a bare array. Entries missing a
/// title or artist are dropped; confidence is clamped to [0, 1].
pub fn parse_candidates(content: &str) -> Result<Vec<RecommendationCandidate>, GeneratorError> {
    let value: Value = serde_json::from_str(strip_code_fence(content))
        .map_err(|e| GeneratorError::Malformed(e.to_string()))?;

    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => map
            .remove("recommendations")
            .ok_or_else(|| GeneratorError::Malformed("missing \"recommendations\" array".into()))?,
        _ => return Err(GeneratorError::Malformed("expected a JSON object or array".into())),
    };

    let raw: Vec<RawCandidate> =
        serde_json::from_value(list).map_err(|e| GeneratorError::Malformed(e.to_string()))?;

    let candidates: Vec<RecommendationCandidate> = raw
        .into_iter()
        .filter_map(|c| {
            let song_title = c.song_title.trim().to_string();
            let artist_name = c.artist_name.trim().to_string();
            if song_title.is_empty() || artist_name.is_empty() {
                return None;
            }
            let confidence = c
                .confidence
                .filter(|v| v.is_finite())
                .unwrap_or_else(default_confidence)
                .clamp(0.0, 1.0);
            Some(RecommendationCandidate {
                song_title,
                artist_name,
                reasoning: c.reasoning.trim().to_string(),
                confidence,
            })
        })
        .collect();

    if candidates.is_empty() {
        return Err(GeneratorError::Empty);
    }
    Ok(candidates)
}
