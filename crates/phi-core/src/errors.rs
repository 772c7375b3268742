//! Structured error types shared across the phi-modulation crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code, message and offending values carried by a [`PhiError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Kebab-case identifier such as `k-range` or `provider-offline`.
    pub code: String,
    /// What went wrong, in prose.
    pub message: String,
    /// Offending parameter values, recorded verbatim.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Suggested remedy, when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with no recorded values and no remedy.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records one offending value under `key`; a repeated key overwrites.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Attaches a remedy shown after the values.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | values: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

/// Canonical error type for the forecasting engine.
///
/// Numerical degeneracies (vanishing mode counts, amplitudes or total errors)
/// are not represented here: they are floored in place, see [`crate::floors`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", content = "detail")]
pub enum PhiError {
    /// Malformed array shapes or lengths, non-positive pivot or volume parameters.
    #[error("invalid input: {0}")]
    InvalidInput(ErrorInfo),
    /// Malformed numeric ranges such as `k_min >= k_max` or too few grid points.
    #[error("invalid range: {0}")]
    InvalidRange(ErrorInfo),
    /// The baseline spectrum provider could not produce a spectrum.
    #[error("data unavailable: {0}")]
    DataUnavailable(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl PhiError {
    /// Payload shared by every variant.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            PhiError::InvalidInput(info)
            | PhiError::InvalidRange(info)
            | PhiError::DataUnavailable(info)
            | PhiError::Serde(info) => info,
        }
    }

    /// Short stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PhiError::InvalidInput(_) => "InvalidInput",
            PhiError::InvalidRange(_) => "InvalidRange",
            PhiError::DataUnavailable(_) => "DataUnavailable",
            PhiError::Serde(_) => "Serde",
        }
    }

    /// Shorthand for an [`PhiError::InvalidInput`] without context.
    pub fn invalid_input(code: &str, message: impl Into<String>) -> Self {
        PhiError::InvalidInput(ErrorInfo::new(code, message))
    }

    /// Shorthand for an [`PhiError::InvalidRange`] without context.
    pub fn invalid_range(code: &str, message: impl Into<String>) -> Self {
        PhiError::InvalidRange(ErrorInfo::new(code, message))
    }

    /// Shorthand for an [`PhiError::DataUnavailable`] without context.
    pub fn data_unavailable(code: &str, message: impl Into<String>) -> Self {
        PhiError::DataUnavailable(ErrorInfo::new(code, message))
    }
}

/// Fails with [`PhiError::InvalidInput`] unless the two arrays share a length.
pub fn ensure_same_len(
    code: &str,
    left_name: &str,
    left: usize,
    right_name: &str,
    right: usize,
) -> Result<(), PhiError> {
    if left == right {
        return Ok(());
    }
    Err(PhiError::InvalidInput(
        ErrorInfo::new(code, format!("{left_name} and {right_name} lengths differ"))
            .with_context(format!("{left_name}_len"), left)
            .with_context(format!("{right_name}_len"), right),
    ))
}
