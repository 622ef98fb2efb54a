//! Core business logic abstractions

pub mod clock;
pub mod config;
pub mod error;
pub mod log;
pub mod model;
pub mod provider;
pub mod store;

// Re-export main types for cleaner imports
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{RateError, StoreError};
pub use model::{RateKey, RatePair, RateSource, RateValue};
pub use provider::{ProviderCapability, RateProvider};
pub use store::RateStore;
