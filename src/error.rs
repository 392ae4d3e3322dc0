//! Rich diagnostic error types for kg-summarizer.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Structural extraction failures abort the
//! requested result as a whole; publication lookups never surface here.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::paths::PathError;
use crate::pubmed::PubmedError;
use crate::query::QueryError;
use crate::summarize::LlmError;

/// Top-level error type for kg-summarizer.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum KgError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pubmed(#[from] PubmedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),
}

pub type KgResult<T> = std::result::Result<T, KgError>;

// ---------------------------------------------------------------------------
// Extraction errors
// ---------------------------------------------------------------------------

/// Structural failures while turning a TRAPI response into an evidence graph.
///
/// Any of these aborts extraction of the requested result; no partial graph
/// is ever returned alongside them.
#[derive(Debug, Error, Diagnostic)]
pub enum ExtractError {
    #[error("malformed response: {message}")]
    #[diagnostic(
        code(kg::extract::malformed_response),
        help(
            "The reasoning service returned a response that is missing expected keys \
             (results, analyses, knowledge-graph entries or auxiliary graphs). \
             This result cannot be displayed; try another result index or re-run the query."
        )
    )]
    MalformedResponse { message: String },

    #[error("result index {index} out of range (response has {len} results)")]
    #[diagnostic(
        code(kg::extract::index_out_of_range),
        help("Pick an index in 0..{len}. List results with `kg-summarizer results`.")
    )]
    IndexOutOfRange { index: usize, len: usize },

    #[error("identifier could not be normalized: {curie}")]
    #[diagnostic(
        code(kg::extract::unresolved_identifier),
        help(
            "The node normalization service has no entry for this curie, so the \
             evidence for this result cannot be labelled. This result cannot be displayed."
        )
    )]
    UnresolvedIdentifier { curie: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Normalization(#[from] NormalizeError),
}

impl ExtractError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }
}

pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

// ---------------------------------------------------------------------------
// Normalization errors
// ---------------------------------------------------------------------------

/// Failures talking to the identifier normalization service.
#[derive(Debug, Error, Diagnostic)]
pub enum NormalizeError {
    #[error("normalization request to {url} failed: {message}")]
    #[diagnostic(
        code(kg::normalize::transport),
        help(
            "The node normalization service could not be reached (timeout or connection \
             failure). Check your network connection or set `node_norm_url` in the config."
        )
    )]
    Transport { url: String, message: String },

    #[error("normalization service at {url} returned HTTP {code}")]
    #[diagnostic(
        code(kg::normalize::status),
        help("The service rejected the batch. Retry later; the core does not retry on its own.")
    )]
    Status { url: String, code: u16 },

    #[error("failed to decode normalization response: {message}")]
    #[diagnostic(
        code(kg::normalize::decode),
        help("The service replied with an unexpected body. Check that `node_norm_url` points at a get_normalized_nodes endpoint.")
    )]
    Decode { message: String },
}

pub type NormalizeResult<T> = std::result::Result<T, NormalizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_error_wraps_transparently() {
        let err: ExtractError = NormalizeError::Status {
            url: "http://norm".into(),
            code: 503,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "normalization service at http://norm returned HTTP 503"
        );

        let top: KgError = err.into();
        assert!(matches!(
            top,
            KgError::Extract(ExtractError::Normalization(_))
        ));
    }

    #[test]
    fn out_of_range_message_names_bounds() {
        let err = ExtractError::IndexOutOfRange { index: 7, len: 3 };
        assert_eq!(
            err.to_string(),
            "result index 7 out of range (response has 3 results)"
        );
    }
}
