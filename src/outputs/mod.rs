//! Output generation: the brief text and the JSON run report.
//!
//! # Submodules
//!
//! - [`brief`]: Renders enriched headlines into the generation API's input text
//! - [`json`]: Writes each [`BriefRun`](crate::pipeline::BriefRun) to a dated JSON file

pub mod brief;
pub mod json;
