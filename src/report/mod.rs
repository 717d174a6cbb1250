//! Report module - terminal summaries, charts and the JSON export

pub mod analysis_report;
pub mod clusters;
pub mod evaluation;
pub mod summary;

pub use analysis_report::*;
pub use clusters::*;
pub use evaluation::*;
pub use summary::*;
