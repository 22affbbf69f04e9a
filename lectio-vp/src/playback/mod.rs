//! Playback engine components

pub mod cache;
pub mod engine;
pub mod fetch;
pub mod navigator;
pub mod prefetch;
pub mod session;

pub use engine::PlayerEngine;
