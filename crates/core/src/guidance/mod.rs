//! Turns free-text guidance answers into addressed/unaddressed task lists.
//!
//! Section extraction sits behind [`ResponseExtractor`] so each prompt template can
//! ship its own extractor; [`GuidanceParser`] handles the line-level task split.

pub mod extractor;
pub mod parser;

pub use extractor::{GuidanceSections, ResponseExtractor, TwoSectionExtractor};
pub use parser::GuidanceParser;
