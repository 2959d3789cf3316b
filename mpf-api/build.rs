//! Build identification for the mpf-api startup banner
//!
//! Exports GIT_HASH (with a `-dirty` suffix for uncommitted changes),
//! BUILD_TIMESTAMP and BUILD_PROFILE to `env!`.

use std::process::Command;

/// Trimmed stdout of a successful git invocation
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    let hash = git(&["rev-parse", "--short=8", "HEAD"]);
    let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
        .is_some_and(|status| !status.is_empty());

    let git_hash = match (hash, dirty) {
        (Some(hash), true) => format!("{}-dirty", hash),
        (Some(hash), false) => hash,
        (None, _) => "unknown".to_string(),
    };

    let built_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".into());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", built_at);
    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
}
