//! Failure-cause taxonomy carried opaquely over reply and notify ports.

use thiserror::Error;

/// Reason a registration, invocation submission, or invocation run failed.
///
/// Never thrown across actor boundaries — always a value, returned
/// synchronously on a reply port or delivered asynchronously as
/// `InvocationFailed { cause, .. }`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FailureCause {
    #[error("function not registered with this service")]
    FunctionNotRegistered,

    #[error("function already registered")]
    FunctionAlreadyRegistered,

    #[error("not enough resources to satisfy request")]
    NotEnoughResources,

    #[error("not enough space for per-invocation scratch storage")]
    NotEnoughSpace,

    #[error("execution exceeded its time limit")]
    TimedOut,

    #[error("service stopped while the invocation was in flight")]
    ServiceDown,

    #[error("underlying host is down or degraded")]
    HostError,
}
