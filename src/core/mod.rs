pub mod endpoint;
pub mod engine;
pub mod lookup;
pub mod merger;
pub mod selector;
pub mod worker_pool;

pub use crate::domain::model::{
    BatchEvent, CandidateRecord, CompoundKey, EnrichmentRecord, Identifier, Progress, ResultRow,
};
pub use crate::domain::ports::{
    BatchObserver, ConfigProvider, PrimaryRegistry, SecondaryRegistry, Storage,
};
pub use crate::utils::error::Result;
