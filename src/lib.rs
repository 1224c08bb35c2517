//! Core library for music-link-resolver: turn a Spotify or YouTube link
//! into a normalized list of tracks.
pub mod api;
pub mod cache;
pub mod classify;
pub mod config;
pub mod enrich;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod pool;
pub mod util;

pub use error::ResolveError;
pub use models::{ResolutionResult, ResolveOptions, ResolvedTrack};
pub use pipeline::Pipeline;
