/*
 * catalog.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error code catalog and lookup.
//!
//! Maps error codes (like "D-2-1") to their metadata. Subsystems:
//!
//! | Code  | Subsystem   |
//! |-------|-------------|
//! | D-1-x | indentation |
//! | D-2-x | syntax      |
//! | D-3-x | reference   |
//! | D-4-x | unsupported |
//! | D-5-x | render      |
//! | D-6-x | environment |
//! | D-7-x | lint        |

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for an error code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorCodeInfo {
    /// Subsystem name (e.g., "syntax", "indentation")
    pub subsystem: String,

    /// Short title for the error
    pub title: String,

    /// Default message template
    pub message_template: String,

    /// URL to documentation (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,

    /// When this error was introduced (version)
    pub since_version: String,
}

/// Global error catalog, embedded from `error_catalog.json` at compile time.
///
/// # Panics
///
/// Panics on first access if the embedded JSON is invalid, which can only
/// happen if the catalog file was edited incorrectly.
pub static ERROR_CATALOG: Lazy<HashMap<String, ErrorCodeInfo>> = Lazy::new(|| {
    let json_data = include_str!("../error_catalog.json");
    serde_json::from_str(json_data).expect("Invalid error catalog JSON - this is a bug in diet")
});

/// Look up error code information.
///
/// ```
/// use diet_error_reporting::catalog::get_error_info;
///
/// let info = get_error_info("D-2-1").unwrap();
/// assert_eq!(info.subsystem, "syntax");
/// ```
pub fn get_error_info(code: &str) -> Option<&ErrorCodeInfo> {
    ERROR_CATALOG.get(code)
}

/// Get documentation URL for an error code.
pub fn get_docs_url(code: &str) -> Option<&str> {
    ERROR_CATALOG
        .get(code)
        .and_then(|info| info.docs_url.as_deref())
}

/// Get the subsystem name for an error code.
///
/// ```
/// use diet_error_reporting::catalog::get_subsystem;
///
/// assert_eq!(get_subsystem("D-1-1"), Some("indentation"));
/// ```
pub fn get_subsystem(code: &str) -> Option<&str> {
    ERROR_CATALOG.get(code).map(|info| info.subsystem.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        assert!(!ERROR_CATALOG.is_empty());
    }

    #[test]
    fn test_every_code_matches_format() {
        for (code, info) in ERROR_CATALOG.iter() {
            let parts: Vec<&str> = code.split('-').collect();
            assert_eq!(parts.len(), 3, "bad code {}", code);
            assert_eq!(parts[0], "D");
            assert!(parts[1].parse::<u32>().is_ok(), "bad code {}", code);
            assert!(parts[2].parse::<u32>().is_ok(), "bad code {}", code);
            assert!(!info.title.is_empty());
        }
    }

    #[test]
    fn test_known_codes() {
        assert_eq!(get_subsystem("D-1-1"), Some("indentation"));
        assert_eq!(get_subsystem("D-2-1"), Some("syntax"));
        assert_eq!(get_subsystem("D-3-1"), Some("reference"));
        assert_eq!(get_subsystem("D-4-1"), Some("unsupported"));
        assert_eq!(get_subsystem("D-5-1"), Some("render"));
        assert_eq!(get_subsystem("D-7-2"), Some("lint"));
    }

    #[test]
    fn test_nonexistent_code() {
        assert!(get_error_info("D-999-999").is_none());
        assert!(get_docs_url("D-999-999").is_none());
        assert!(get_subsystem("D-999-999").is_none());
    }

    #[test]
    fn test_docs_url_absent() {
        assert!(get_docs_url("D-2-1").is_none());
    }
}
