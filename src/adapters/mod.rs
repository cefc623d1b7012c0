// Adapters layer: concrete implementations for external systems
// (registry HTTP clients, local storage, identifier files, CSV export).

pub mod export;
pub mod http;
pub mod identifiers;
pub mod storage;
#[cfg(feature = "server")]
pub mod server;
