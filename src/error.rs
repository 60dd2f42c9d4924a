//! User-facing diagnostics raised by resource and data-source operations.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::api::ApiError;
use crate::id::IdError;
use crate::poll::PollError;

/// Lifecycle operation that produced a diagnostic.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Operation {
    /// Resource creation.
    Create,
    /// Resource or data-source read.
    Read,
    /// In-place update.
    Update,
    /// Resource deletion.
    Delete,
    /// Existence check.
    Exists,
}

impl Operation {
    /// Returns the lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Exists => "exists",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by provider operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProviderError {
    /// The remote client could not be constructed.
    #[error("{resource} {operation}: failed to initialise client: {message}")]
    ClientInit {
        /// Resource or data-source type name.
        resource: &'static str,
        /// Operation being performed.
        operation: Operation,
        /// Underlying failure.
        message: String,
    },
    /// A remote call failed for a reason other than the object being absent.
    #[error("{resource} {operation}: {call} failed: {message}")]
    Remote {
        /// Resource or data-source type name.
        resource: &'static str,
        /// Operation being performed.
        operation: Operation,
        /// Remote call that failed.
        call: &'static str,
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// Message returned by the API.
        message: String,
    },
    /// Input was rejected before any remote call.
    #[error("{resource} {operation}: {message}")]
    Validation {
        /// Resource or data-source type name.
        resource: &'static str,
        /// Operation being performed.
        operation: Operation,
        /// Explanation of the rejected input.
        message: String,
    },
    /// A status wait ran out of time.
    #[error(
        "{resource} {operation}: timed out after {waited:?} waiting for {target}; last status {}",
        .last_status.as_deref().unwrap_or("<none>")
    )]
    Timeout {
        /// Resource or data-source type name.
        resource: &'static str,
        /// Operation being performed.
        operation: Operation,
        /// Identifier of the object being waited on.
        target: String,
        /// Time spent waiting.
        waited: Duration,
        /// Last observed status.
        last_status: Option<String>,
    },
    /// A status wait was cancelled by the host.
    #[error(
        "{resource} {operation}: wait for {target} cancelled; last status {}",
        .last_status.as_deref().unwrap_or("<none>")
    )]
    Cancelled {
        /// Resource or data-source type name.
        resource: &'static str,
        /// Operation being performed.
        operation: Operation,
        /// Identifier of the object being waited on.
        target: String,
        /// Last status observed before cancellation.
        last_status: Option<String>,
    },
    /// A status wait observed a status it does not recognise.
    #[error("{resource} {operation}: {target} entered unexpected status '{status}'")]
    UnexpectedState {
        /// Resource or data-source type name.
        resource: &'static str,
        /// Operation being performed.
        operation: Operation,
        /// Identifier of the object being waited on.
        target: String,
        /// Observed status label.
        status: String,
    },
}

/// Resource name and operation attached to every error raised inside one
/// operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Scope {
    /// Resource or data-source type name.
    pub resource: &'static str,
    /// Operation being performed.
    pub operation: Operation,
}

impl Scope {
    /// Creates a scope.
    #[must_use]
    pub const fn new(resource: &'static str, operation: Operation) -> Self {
        Self {
            resource,
            operation,
        }
    }

    /// Wraps a client construction failure.
    #[must_use]
    pub fn client_init(self, message: impl Into<String>) -> ProviderError {
        ProviderError::ClientInit {
            resource: self.resource,
            operation: self.operation,
            message: message.into(),
        }
    }

    /// Wraps a failed remote call.
    #[must_use]
    pub fn remote(self, call: &'static str, err: ApiError) -> ProviderError {
        ProviderError::Remote {
            resource: self.resource,
            operation: self.operation,
            call,
            status: err.status,
            message: err.message,
        }
    }

    /// Wraps rejected input.
    #[must_use]
    pub fn validation(self, message: impl Into<String>) -> ProviderError {
        ProviderError::Validation {
            resource: self.resource,
            operation: self.operation,
            message: message.into(),
        }
    }

    /// Wraps a malformed composite identifier.
    #[must_use]
    pub fn invalid_id(self, err: &IdError) -> ProviderError {
        self.validation(err.to_string())
    }

    /// Maps a status wait failure on `target`. `observed` is the wait's
    /// last-status sink and is reported when the wait was cancelled.
    #[must_use]
    pub fn poll(
        self,
        call: &'static str,
        target: &str,
        observed: Option<String>,
        err: PollError<ApiError>,
    ) -> ProviderError {
        match err {
            PollError::Timeout {
                waited,
                last_status,
            } => ProviderError::Timeout {
                resource: self.resource,
                operation: self.operation,
                target: target.to_owned(),
                waited,
                last_status,
            },
            PollError::Fetch(api) => self.remote(call, api),
            PollError::UnexpectedState(status) => ProviderError::UnexpectedState {
                resource: self.resource,
                operation: self.operation,
                target: target.to_owned(),
                status,
            },
            PollError::Vanished => self.remote(
                call,
                ApiError::not_found(format!("{target} disappeared while waiting")),
            ),
            PollError::Cancelled => ProviderError::Cancelled {
                resource: self.resource,
                operation: self.operation,
                target: target.to_owned(),
                last_status: observed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOPE: Scope = Scope::new("ibm_is_network_acl", Operation::Create);

    #[test]
    fn remote_errors_name_the_call() {
        let err = SCOPE.remote("create_network_acl", ApiError::status(500, "boom"));
        assert_eq!(
            err.to_string(),
            "ibm_is_network_acl create: create_network_acl failed: boom"
        );
    }

    #[test]
    fn timeouts_stay_distinct_from_remote_failures() {
        let err = SCOPE.poll(
            "get_floating_ip",
            "s/n/f",
            None,
            PollError::Timeout {
                waited: Duration::from_secs(600),
                last_status: Some(String::from("pending")),
            },
        );
        assert!(matches!(err, ProviderError::Timeout { .. }));
        assert!(err.to_string().contains("last status pending"));
    }

    #[test]
    fn fetch_failures_become_remote_errors() {
        let err = SCOPE.poll(
            "get_floating_ip",
            "s/n/f",
            None,
            PollError::Fetch(ApiError::status(502, "bad gateway")),
        );
        assert!(matches!(
            err,
            ProviderError::Remote {
                status: Some(502),
                ..
            }
        ));
    }

    #[test]
    fn cancellation_is_reported() {
        let err = SCOPE.poll(
            "get_floating_ip",
            "s/n/f",
            Some(String::from("pending")),
            PollError::Cancelled,
        );
        assert_eq!(
            err.to_string(),
            "ibm_is_network_acl create: wait for s/n/f cancelled; last status pending"
        );
        assert_eq!(
            err,
            ProviderError::Cancelled {
                resource: "ibm_is_network_acl",
                operation: Operation::Create,
                target: String::from("s/n/f"),
                last_status: Some(String::from("pending")),
            }
        );
    }
}
