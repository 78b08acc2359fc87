use thiserror::Error;

use crate::validate::IntegrityViolation;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("TOML parse error in {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unrecognized registry document: {0}")]
    UnknownDocument(String),

    #[error("Duplicate {kind} id: {id}")]
    Duplicate { kind: &'static str, id: String },

    #[error("No configuration for building type '{building_type}' (subtype {subtype:?})")]
    ConfigNotFound {
        building_type: String,
        subtype: Option<String>,
    },

    #[error("Registry integrity check failed with {} violation(s)", .0.len())]
    Integrity(Vec<IntegrityViolation>),
}
