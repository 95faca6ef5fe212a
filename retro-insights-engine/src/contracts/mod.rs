//! Pipeline Contracts
//!
//! Data types exchanged between the pipeline stages and with callers.

pub mod analysis;
pub mod experiment;
pub mod hypothesis;
pub mod metric;
pub mod report;
pub mod sprint;

pub use analysis::*;
pub use experiment::*;
pub use hypothesis::*;
pub use metric::*;
pub use report::*;
pub use sprint::*;
