//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Task extraction prompt
pub const EXTRACT: &str = include_str!("../../prompts/extract.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "extract" => Some(EXTRACT),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
