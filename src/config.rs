//! Build configuration for object emission.

use std::path::Path;

use serde::Deserialize;

use crate::diagnostics::CompileError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Target triple for cross emission; the host when absent.
    pub target: Option<String>,
    /// Cranelift optimization level: "none", "speed", or "speed_and_size".
    pub opt_level: String,
    /// Run the IR verifier while compiling.
    pub verify: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            target: None,
            opt_level: "none".to_string(),
            verify: true,
        }
    }
}

impl BuildConfig {
    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CompileError::config(format!("failed to read config: {e}"), path.to_path_buf())
        })?;
        toml::from_str(&text)
            .map_err(|e| CompileError::config(format!("invalid config: {e}"), path.to_path_buf()))
    }
}
