//! Error types for Tally

use thiserror::Error;

use crate::models::CanonicalField;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: missing required field mappings: {}", join_fields(.0))]
    MissingRequiredFields(Vec<CanonicalField>),

    #[error("Cannot {action} while import is in the {stage} stage")]
    InvalidTransition {
        stage: &'static str,
        action: &'static str,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// True for errors caused by caller input that blocks a transition
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::MissingRequiredFields(_))
    }
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
