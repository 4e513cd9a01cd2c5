//! Configuration types for zeroapi.
//!
//! All types implement [`serde::Deserialize`] and fall back to defaults for
//! missing sections and keys, so an empty file is a valid configuration.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`GenConfig`] - Code generation conventions, such as the [`NamingStyle`].
//! - [`CheckConfig`] - How strict `check` runs are.
//!
//! # Example
//!
//! ```
//! # use zeroapi::{NamingStyle, config::AppConfig};
//! let config = AppConfig::default();
//! assert_eq!(config.gen_config().style(), NamingStyle::Lower);
//! assert!(!config.check().deny_warnings());
//! ```

use serde::Deserialize;

use crate::NamingStyle;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Code generation section, `[gen]`.
    #[serde(default, rename = "gen")]
    gen_config: GenConfig,

    /// Check section, `[check]`.
    #[serde(default)]
    check: CheckConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    pub fn new(gen_config: GenConfig, check: CheckConfig) -> Self {
        Self { gen_config, check }
    }

    /// Returns the code generation configuration.
    pub fn gen_config(&self) -> &GenConfig {
        &self.gen_config
    }

    /// Returns the check configuration.
    pub fn check(&self) -> &CheckConfig {
        &self.check
    }
}

/// Code generation conventions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenConfig {
    /// File naming style of generated logic files.
    #[serde(default)]
    style: NamingStyle,
}

impl GenConfig {
    pub fn new(style: NamingStyle) -> Self {
        Self { style }
    }

    /// Returns the [`NamingStyle`] of generated files.
    pub fn style(&self) -> NamingStyle {
        self.style
    }
}

/// Strictness of `check`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckConfig {
    /// Fail on warnings as well as errors.
    #[serde(default)]
    deny_warnings: bool,
}

impl CheckConfig {
    pub fn new(deny_warnings: bool) -> Self {
        Self { deny_warnings }
    }

    pub fn deny_warnings(&self) -> bool {
        self.deny_warnings
    }
}
