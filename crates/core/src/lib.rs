//! Core types, errors, and the store contract for the EcoTrack ingestion engine.

pub mod error;
pub mod indicator;
pub mod provider;
pub mod retention;
pub mod store;
pub mod zone;

pub use error::{Error, FetchError, ParseError, Result, SchedulerError, StoreError};
pub use indicator::*;
pub use provider::*;
pub use retention::*;
pub use store::*;
pub use zone::*;
