//! Outcome delivered to every caller of `add_item` / `remove_item`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a single request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// The requested end state is confirmed remotely.
    Successful,
    /// The request executed and did not reach its end state.
    Failed,
    /// The request was superseded or folded; nothing ran on its behalf.
    Skipped,
}

/// Repository-level failure reason, produced by an
/// [`ApiErrorConverter`](crate::api::ApiErrorConverter).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cause {
    /// The remote side answered with a non-idempotent failure status.
    Rejected {
        /// Status code reported by the remote side.
        code: u16,
        /// Human readable reason.
        reason: String,
    },
    /// The remote side could not be reached or the call broke mid-flight.
    Unreachable {
        /// Human readable reason.
        reason: String,
    },
    /// Converter-specific cause with no structured mapping.
    Other(String),
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { code, reason } => write!(f, "rejected with {code}: {reason}"),
            Self::Unreachable { reason } => write!(f, "unreachable: {reason}"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

/// Final outcome of one request.
///
/// `Failed` always carries a [`Cause`]; `Successful` and `Skipped` never do.
/// The constructors are the only way to build one, which keeps that pairing intact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Response {
    status: Status,
    cause: Option<Cause>,
}

impl Response {
    /// A confirmed outcome.
    pub fn successful() -> Self {
        Self {
            status: Status::Successful,
            cause: None,
        }
    }

    /// A failed outcome with its converted cause.
    pub fn failed(cause: Cause) -> Self {
        Self {
            status: Status::Failed,
            cause: Some(cause),
        }
    }

    /// An outcome for a request that never ran on its own behalf.
    pub fn skipped() -> Self {
        Self {
            status: Status::Skipped,
            cause: None,
        }
    }

    /// Outcome status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Failure cause, present only for [`Status::Failed`].
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// True for [`Status::Successful`].
    pub fn is_successful(&self) -> bool {
        self.status == Status::Successful
    }

    /// True for [`Status::Failed`].
    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed
    }

    /// True for [`Status::Skipped`].
    pub fn is_skipped(&self) -> bool {
        self.status == Status::Skipped
    }
}
