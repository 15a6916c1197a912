use crate::foundation::core::ImageRole;

/// Convenience result type used across brandmark.
pub type CompositeResult<T> = Result<T, CompositeError>;

/// Top-level error taxonomy returned by compositing APIs.
#[derive(thiserror::Error, Debug)]
pub enum CompositeError {
    /// No 2D drawing surface could be obtained for the requested size.
    #[error("canvas unavailable: {0}")]
    CanvasUnavailable(String),

    /// An input image reference could not be loaded or decoded.
    #[error("decode error ({role} image): {source:#}")]
    Decode {
        /// Which input failed.
        role: ImageRole,
        /// Underlying loader or decoder failure.
        source: anyhow::Error,
    },

    /// Serializing the finished canvas failed.
    #[error("encode error: {0:#}")]
    Encode(anyhow::Error),

    /// Invalid policy values or degenerate geometry.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Discriminant of [`CompositeError`], for callers that branch on the failure class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositeErrorKind {
    /// See [`CompositeError::CanvasUnavailable`].
    CanvasUnavailable,
    /// See [`CompositeError::Decode`].
    Decode,
    /// See [`CompositeError::Encode`].
    Encode,
    /// See [`CompositeError::Validation`].
    Validation,
    /// See [`CompositeError::Other`].
    Other,
}

impl CompositeError {
    /// Build a [`CompositeError::CanvasUnavailable`] value.
    pub fn canvas_unavailable(msg: impl Into<String>) -> Self {
        Self::CanvasUnavailable(msg.into())
    }

    /// Build a [`CompositeError::Decode`] value for `role`.
    pub fn decode(role: ImageRole, source: impl Into<anyhow::Error>) -> Self {
        Self::Decode {
            role,
            source: source.into(),
        }
    }

    /// Build a [`CompositeError::Encode`] value.
    pub fn encode(source: impl Into<anyhow::Error>) -> Self {
        Self::Encode(source.into())
    }

    /// Build a [`CompositeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Failure class of this error.
    pub fn kind(&self) -> CompositeErrorKind {
        match self {
            Self::CanvasUnavailable(_) => CompositeErrorKind::CanvasUnavailable,
            Self::Decode { .. } => CompositeErrorKind::Decode,
            Self::Encode(_) => CompositeErrorKind::Encode,
            Self::Validation(_) => CompositeErrorKind::Validation,
            Self::Other(_) => CompositeErrorKind::Other,
        }
    }

    /// The input image the error is attributed to, if any.
    pub fn role(&self) -> Option<ImageRole> {
        match self {
            Self::Decode { role, .. } => Some(*role),
            _ => None,
        }
    }

    /// Whether repeating the same call could succeed.
    ///
    /// Always `false`: every failure is caused by the inputs or the environment, and repeating a
    /// call with the same inputs reproduces it.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
