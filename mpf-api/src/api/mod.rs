//! HTTP API handlers for mpf-api

pub mod blocked;
pub mod health;
pub mod library;
pub mod recommendations;
pub mod tracks;
pub mod validation;

pub use blocked::{block_track, list_blocked, unblock_track};
pub use health::health_routes;
pub use library::{add_to_library, list_library, remove_from_library};
pub use recommendations::generate_recommendations;
pub use tracks::{get_track, search_tracks};
