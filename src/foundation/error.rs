/// Convenience result type used across the bridge.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Top-level error taxonomy used by decoder, executor, canvas and bridge APIs.
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    /// Malformed command: unknown opcode, buffer-count mismatch, bad or missing argument.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An image or pattern source could not be resolved or decoded.
    #[error("resource error: {0}")]
    Resource(String),

    /// Forwarding an input event to the remote receiver failed.
    #[error("bridge delivery error: {0}")]
    Delivery(String),

    /// A pattern source could not be classified.
    #[error("unsupported pattern source: {0}")]
    UnsupportedPatternSource(String),

    /// Invalid caller-provided data (sizes, colours, replay files).
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BridgeError {
    /// Build a [`BridgeError::Protocol`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Build a [`BridgeError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build a [`BridgeError::Delivery`] value.
    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    /// Build a [`BridgeError::UnsupportedPatternSource`] value.
    pub fn unsupported_pattern_source(msg: impl Into<String>) -> Self {
        Self::UnsupportedPatternSource(msg.into())
    }

    /// Build a [`BridgeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`BridgeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for errors that only fail the current command.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
