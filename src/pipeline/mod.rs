//! Pipeline module - loading, partitioning, predictor filtering and evaluation

pub mod correlation;
pub mod error;
pub mod evaluate;
pub mod features;
pub mod loader;
pub mod missing;
pub mod partition;
pub mod predictors;

pub use correlation::*;
pub use error::PipelineError;
pub use evaluate::*;
pub use features::*;
pub use loader::*;
pub use missing::*;
pub use partition::*;
pub use predictors::*;
