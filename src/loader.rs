//! Loading raw data and validator definitions from files and strings.

use std::path::Path;

use serde_json::Value;

use crate::definition::Definitions;
use crate::error::LoadError;

/// Load raw JSON data from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_data(path: &Path) -> Result<Value, LoadError> {
    let content = read_file(path)?;
    load_data_str(&content)
}

/// Load raw JSON data from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_data_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load validator definitions from a file path.
///
/// The definitions are parsed but not built; call [`Definitions::build`].
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` or `LoadError::ReadError` for IO
/// failures, `LoadError::InvalidJson` for malformed JSON, or
/// `LoadError::InvalidDefinition` if the JSON is not a definitions document.
pub fn load_definitions(path: &Path) -> Result<Definitions, LoadError> {
    let content = read_file(path)?;
    load_definitions_str(&content)
}

/// Load validator definitions from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` or `LoadError::InvalidDefinition`.
pub fn load_definitions_str(content: &str) -> Result<Definitions, LoadError> {
    // Parse first so syntax errors and structural errors are reported apart
    let value = load_data_str(content)?;
    serde_json::from_value(value).map_err(|source| LoadError::InvalidDefinition { source })
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}
