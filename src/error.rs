//! Error types shared by the resolver, the scriptlet loader and handlers

use hyper::StatusCode;
use std::io;
use thiserror::Error;

/// Failure to find or load a handler for a request path
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No code root or static root satisfies the path
    #[error("{message}")]
    NotFound { message: String },

    /// A scriptlet exists at `path` but could not be loaded
    #[error("failed to load scriptlet {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: LoadError,
    },
}

impl ResolveError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Load { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure while reading a scriptlet manifest and binding its handler
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    #[error("invalid manifest: {0}")]
    Manifest(#[from] toml::de::Error),

    #[error("no handler registered under '{0}'")]
    UnknownHandler(String),

    #[error("invalid params for '{handler}': {reason}")]
    InvalidParams { handler: String, reason: String },
}

/// Failure raised by a handler, either on invocation or while streaming
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The resource the handler serves has disappeared
    #[error("{0}")]
    NotFound(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Io(_) | Self::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
