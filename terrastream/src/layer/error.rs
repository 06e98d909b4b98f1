//! Layer errors.

use crate::provider::TemplateError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerError {
    #[error("Invalid URL template for layer '{layer}': {source}")]
    Template {
        layer: String,
        #[source]
        source: TemplateError,
    },

    #[error("Layer '{layer}' has invalid levels {min_level}..={max_level}")]
    InvalidLevels {
        layer: String,
        min_level: u8,
        max_level: u8,
    },

    #[error("Layer '{layer}' decodes {actual} but is configured for {expected}")]
    KindMismatch {
        layer: String,
        expected: crate::decode::ResourceKind,
        actual: crate::decode::ResourceKind,
    },

    /// The owning daemon has shut down
    #[error("Layer daemon is no longer running")]
    DaemonGone,
}
