// GSG Upstream Clients
//
// This crate contains pure HTTP client implementations and wire types for the
// upstream services the multi-stream viewer reads from.
//
// Architecture:
// - gsg-providers: Pure HTTP client + wire types (public stream feed, current event)
// - gsg-core: Stream map, reconciliation pipeline, filtering and layout on top of these types

// Shared error types
pub mod error;

// Wire types
pub mod types;

// HTTP client
mod client;

// Re-export client types for convenience
pub use client::GsgClient;
pub use error::ProviderClientError;
pub use reqwest::StatusCode;
pub use types::{CurrentEvent, FeedResponse, RaidTrain, ScheduleSlot, StreamRecord};
