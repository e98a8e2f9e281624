use std::path::PathBuf;

use thiserror::Error;

use crate::grammar::{Nonterminal, Production};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("oracle answered {production:?} for nonterminal {nonterminal:?}")]
    UnexpectedProduction {
        nonterminal: Nonterminal,
        production: Production,
    },
    #[error("no variable in scope to assign to")]
    NoAssignableVariable,
    #[error("variable `{0}` has no recorded type")]
    UnknownVariable(String),
}

pub type Result<T> = std::result::Result<T, GenerationError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unknown profile `{0}`")]
    UnknownProfile(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}
