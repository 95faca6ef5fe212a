//! External Collaborators
//!
//! Narrative enrichment is the only part of the pipeline that talks to the
//! outside world. Everything here is optional for a valid report.

pub mod chat;
pub mod enrichment;

pub use chat::*;
pub use enrichment::*;
