//! Lexical pre-validation for Quill template sources.
//!
//! [`TagBoundaryScanner`] inspects a chunk of raw template text and reports
//! whether its tag marks look well-formed, without parsing. See
//! [`scanner`] for the classification rules.

pub mod scanner;

pub use scanner::{ScanResult, TagBoundaryScanner, is_identifier_char, scan};
