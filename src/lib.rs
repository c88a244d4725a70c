pub mod error;
pub mod types;

pub mod numerics;

pub mod config;
pub mod reference_tables;

pub mod data;
pub mod exposure;

pub mod fx;
pub mod hierarchy;
pub mod classifier;
pub mod crm;
pub mod sa;
pub mod irb;
pub mod slotting;
pub mod aggregator;
pub mod traits;

pub mod pipeline;

pub use error::CorpFinanceError;
pub use types::*;

/// Standard result type for all RWA calculation operations.
pub type CorpFinanceResult<T> = Result<T, CorpFinanceError>;
