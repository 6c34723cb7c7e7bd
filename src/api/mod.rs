//! Boundary to the remote recommendation service.
//!
//! The repository only ever talks to the remote side through [`Api`], and only
//! ever turns remote errors into its own [`Cause`] through an [`ApiErrorConverter`].

use async_trait::async_trait;
use thiserror::Error;

use crate::{response::Cause, types::ItemId};

/// In-process reference implementation of [`Api`].
pub mod memory;

/// Status codes the repository interprets.
pub mod status {
    /// Request succeeded.
    pub const OK: u16 = 200;
    /// Request was malformed.
    pub const BAD_REQUEST: u16 = 400;
    /// Item is not in the remote set; idempotent success for removals.
    pub const NOT_FOUND: u16 = 404;
    /// Item is already in the remote set; idempotent success for additions.
    pub const CONFLICT: u16 = 409;
}

/// The call never produced an [`ApiResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("transport failure: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Creates a transport error with a diagnostic message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Diagnostic message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error representation used by the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ApiError {
    /// Error body attached to a non-successful [`ApiResponse`].
    #[error("status {code}: {message}")]
    Status {
        /// Status code of the response.
        code: u16,
        /// Error body text.
        message: String,
    },
    /// A transport failure wrapped so it can flow through the converter.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Completed remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    code: u16,
    successful: bool,
    cause: Option<ApiError>,
}

impl ApiResponse {
    /// `200 OK` with no error body.
    pub fn successful() -> Self {
        Self {
            code: status::OK,
            successful: true,
            cause: None,
        }
    }

    /// A non-successful status carrying its error body.
    pub fn failed(code: u16, cause: ApiError) -> Self {
        Self {
            code,
            successful: false,
            cause: Some(cause),
        }
    }

    /// Status code.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// True when the remote side reports success.
    pub fn is_successful(&self) -> bool {
        self.successful
    }

    /// Error body, present for failed responses.
    pub fn cause(&self) -> Option<&ApiError> {
        self.cause.as_ref()
    }
}

/// Anything the catalog endpoint returns that exposes an [`ItemId`].
pub trait Item: Send + Sync + 'static {
    /// Identity of the item.
    fn id(&self) -> &ItemId;
}

impl Item for ItemId {
    fn id(&self) -> &ItemId {
        self
    }
}

/// Remote recommendation service.
///
/// Each method may fail outright with a [`TransportError`] instead of
/// returning an [`ApiResponse`]. Timeouts, retries and latency are entirely the
/// implementation's business.
#[async_trait]
pub trait Api: Send + Sync + 'static {
    /// Catalog entry type.
    type Item: Item;

    /// Fetches the full set of currently recommended items.
    async fn get_item_list(&self) -> Result<Vec<Self::Item>, TransportError>;

    /// Adds `id` to the remote set.
    async fn add_item(&self, id: &ItemId) -> Result<ApiResponse, TransportError>;

    /// Removes `id` from the remote set.
    async fn remove_item(&self, id: &ItemId) -> Result<ApiResponse, TransportError>;
}

/// Pure, total mapping from remote errors to repository causes.
pub trait ApiErrorConverter: Send + Sync + 'static {
    /// Converts one remote error. Must accept [`ApiError::Transport`].
    fn convert_api_error(&self, error: &ApiError) -> Cause;
}

impl<F> ApiErrorConverter for F
where
    F: Fn(&ApiError) -> Cause + Send + Sync + 'static,
{
    fn convert_api_error(&self, error: &ApiError) -> Cause {
        self(error)
    }
}

/// Structural conversion: statuses become [`Cause::Rejected`], transport
/// failures become [`Cause::Unreachable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorConverter;

impl ApiErrorConverter for DefaultErrorConverter {
    fn convert_api_error(&self, error: &ApiError) -> Cause {
        match error {
            ApiError::Status { code, message } => Cause::Rejected {
                code: *code,
                reason: message.clone(),
            },
            ApiError::Transport(err) => Cause::Unreachable {
                reason: err.message().to_string(),
            },
        }
    }
}
