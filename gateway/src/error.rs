// Copyright (c) Token Gateway Contributors
// SPDX-License-Identifier: Apache-2.0

use ethers::types::TxHash;

/// Error taxonomy of the gateway core.
///
/// The variants are deliberately few and map one-to-one onto what a caller
/// may safely do next:
///
/// - [`LockTimeout`](GatewayError::LockTimeout): transient; no nonce was
///   consumed, the whole operation may be retried later.
/// - [`Revert`](GatewayError::Revert): deterministic; never retry the same
///   inputs. The message is surfaced verbatim to the end user.
/// - [`Transport`](GatewayError::Transport): network-level; the nonce is
///   presumed consumed, do not resubmit blindly.
/// - [`InclusionTimeout`](GatewayError::InclusionTimeout): ambiguous; the
///   transaction may still land. Callers must reconcile against chain state
///   before deciding to retry.
/// - [`Authorization`](GatewayError::Authorization) /
///   [`NotFound`](GatewayError::NotFound): caller-fixable precondition
///   failures from the settlement workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    // Sender lease could not be acquired within the bounded retry window
    LockTimeout(String),
    // Deterministic on-chain rejection, with the mapped domain message
    Revert { code: u64, message: String },
    // Network-level failure talking to the ledger node
    Transport(String),
    // Inclusion wait exceeded its bound; outcome unknown
    InclusionTimeout(TxHash),
    // Requester is not allowed to perform the operation
    Authorization(String),
    // Referenced record does not exist
    NotFound(String),
    // Relational store failure
    Storage(String),
    // Uncategorized error
    Generic(String),
}

impl GatewayError {
    /// Returns a short string identifying the error type for metrics labels
    pub fn error_type(&self) -> &'static str {
        match self {
            GatewayError::LockTimeout(_) => "lock_timeout",
            GatewayError::Revert { .. } => "revert",
            GatewayError::Transport(_) => "transport",
            GatewayError::InclusionTimeout(_) => "inclusion_timeout",
            GatewayError::Authorization(_) => "authorization",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::Storage(_) => "storage",
            GatewayError::Generic(_) => "generic",
        }
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::LockTimeout(sender) => {
                write!(f, "could not acquire sender lock for {}", sender)
            }
            GatewayError::Revert { code, message } => {
                write!(f, "execution reverted ({}): {}", code, message)
            }
            GatewayError::Transport(msg) => write!(f, "transport error: {}", msg),
            GatewayError::InclusionTimeout(tx_hash) => {
                write!(f, "timed out waiting for inclusion of {:?}", tx_hash)
            }
            GatewayError::Authorization(msg) => write!(f, "not authorized: {}", msg),
            GatewayError::NotFound(what) => write!(f, "{} not found", what),
            GatewayError::Storage(msg) => write!(f, "storage error: {}", msg),
            GatewayError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for GatewayError {}

pub type GatewayResult<T> = Result<T, GatewayError>;
