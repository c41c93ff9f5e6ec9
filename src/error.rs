//! Render graph error types.

use thiserror::Error;

use crate::backend::BackendError;
use crate::pool::TextureKey;

/// Errors surfaced by graph execution and the frame driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RdgError {
    /// The backend failed to create or submit something.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
    /// A texture view was requested for a texture the pool does not own.
    #[error("texture {0:?} is not owned by the pool")]
    UnknownTexture(TextureKey),
}

/// Result alias for render graph operations.
pub type RdgResult<T> = Result<T, RdgError>;
