//! Generator limits and production-weight overrides.
//!
//! A config is usually loaded from one of the embedded profiles or from a
//! TOML file; fields omitted from the TOML keep the `Default` values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grammar::{Nonterminal, Production};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Past this expression depth recursive productions are replaced by
    /// variable references or literals.
    pub max_expr_depth: usize,
    /// Past this block depth compound instructions become assignments.
    pub max_block_depth: usize,
    pub max_decls: usize,
    pub max_instructions: usize,
    pub max_block_instructions: usize,
    /// Multiplier applied per depth level to recursive productions.
    pub depth_decay: f64,
    pub weights: Vec<WeightOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightOverride {
    pub nonterminal: Nonterminal,
    pub production: Production,
    pub weight: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            max_expr_depth: 6,
            max_block_depth: 3,
            max_decls: 6,
            max_instructions: 8,
            max_block_instructions: 3,
            depth_decay: 0.6,
            weights: vec![],
        }
    }
}

static PROFILES: &[(&str, &str)] = &[
    ("default", include_str!("../profiles/default.toml")),
    ("minimal", include_str!("../profiles/minimal.toml")),
    ("deep-nesting", include_str!("../profiles/deep-nesting.toml")),
];

pub fn available_profiles() -> Vec<&'static str> {
    PROFILES.iter().map(|(name, _)| *name).collect()
}

impl GeneratorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn profile(name: &str) -> Result<Self, ConfigError> {
        let (_, content) = PROFILES
            .iter()
            .find(|(n, _)| *n == name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;
        Self::from_toml_str(content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.depth_decay > 0.0 && self.depth_decay <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "depth_decay must be in (0, 1], got {}",
                self.depth_decay
            )));
        }
        for o in &self.weights {
            if !o.nonterminal.accepts(o.production) {
                return Err(ConfigError::Invalid(format!(
                    "{:?} is not a production of {:?}",
                    o.production, o.nonterminal
                )));
            }
        }
        Ok(())
    }
}
