//! Configuration loading
//!
//! Every section is optional; missing sections and fields fall back to
//! defaults. Kind declarations are only parsed here. Whether each one names
//! a registered behavior is checked by [`crate::catalog::Catalog::validate`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::KindDecl;
use crate::errors::Result;
use crate::logging_facility::Profile;
use crate::model::Combinator;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    pub logging: LoggingConfig,
    pub tree: TreeConfig,
    /// Predicate kinds the catalog should offer
    pub kinds: Vec<KindDecl>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub profile: Profile,
}

/// Defaults for freshly created trees and groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub default_name: String,
    pub default_combinator: Combinator,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            default_name: "Untitled".to_string(),
            default_combinator: Combinator::All,
        }
    }
}

impl SiftConfig {
    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns `Config` if the text is not valid TOML for this layout.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML configuration file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `Config` if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            kinds = config.kinds.len(),
            "loaded configuration"
        );
        Ok(config)
    }
}
