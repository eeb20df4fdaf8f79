//! DecompError: Unified error type for pencil-decomp public APIs
//!
//! Every public operation validates its arguments before it acquires any
//! resource and reports failures through this type. Each variant names the
//! operation (`op`, e.g. `"transpose.construct"`) and, where there is one,
//! the offending argument.

use std::fmt;
use thiserror::Error;

/// Unified error type for decomposition and transpose operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecompError {
    /// An argument is out of range, an enumerated tag is illegal for the
    /// context, or a combination of arguments is inconsistent.
    #[error("[{op}] invalid argument `{arg}`: {reason}")]
    InvalidArgument {
        op: &'static str,
        arg: &'static str,
        reason: String,
    },
    /// A global extent or a derived product does not fit the index width.
    #[error("[{op}] `{arg}` overflows: {reason}")]
    Overflow {
        op: &'static str,
        arg: &'static str,
        reason: String,
    },
    /// The requested split cannot give every process at least one element.
    #[error("[{op}] infeasible decomposition: {reason}")]
    Infeasible { op: &'static str, reason: String },
    /// Allocation of a descriptor table or message buffer failed.
    #[error("[{op}] allocation of {what} failed")]
    OutOfMemory {
        op: &'static str,
        what: &'static str,
    },
    /// The messaging substrate reported an unrecoverable condition.
    #[error("[{op}] fatal communication failure with rank {peer}: {reason}")]
    Fatal {
        op: &'static str,
        peer: usize,
        reason: String,
    },
}

/// Fieldless discriminant of [`DecompError`], convenient for matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    Overflow,
    Infeasible,
    OutOfMemory,
    Fatal,
}

impl DecompError {
    pub fn invalid(op: &'static str, arg: &'static str, reason: impl Into<String>) -> Self {
        DecompError::InvalidArgument {
            op,
            arg,
            reason: reason.into(),
        }
    }

    pub fn overflow(op: &'static str, arg: &'static str, reason: impl Into<String>) -> Self {
        DecompError::Overflow {
            op,
            arg,
            reason: reason.into(),
        }
    }

    pub fn infeasible(op: &'static str, reason: impl Into<String>) -> Self {
        DecompError::Infeasible {
            op,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DecompError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            DecompError::Overflow { .. } => ErrorKind::Overflow,
            DecompError::Infeasible { .. } => ErrorKind::Infeasible,
            DecompError::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            DecompError::Fatal { .. } => ErrorKind::Fatal,
        }
    }

    /// Label of the operation that failed.
    pub fn op(&self) -> &'static str {
        match self {
            DecompError::InvalidArgument { op, .. }
            | DecompError::Overflow { op, .. }
            | DecompError::Infeasible { op, .. }
            | DecompError::OutOfMemory { op, .. }
            | DecompError::Fatal { op, .. } => *op,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Overflow => "overflow",
            ErrorKind::Infeasible => "infeasible",
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::Fatal => "fatal",
        };
        f.write_str(name)
    }
}
