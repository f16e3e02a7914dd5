//! Shared utility functions for task-forge.
//!
//! This module provides common utilities used across multiple modules,
//! including JSON extraction from model responses.

pub mod json_extraction;

pub use json_extraction::{
    extract_from_code_block, extract_json_object, find_matching_brace, JsonExtractionError,
};
