//! Error types for the crosslock ledgers.
//!
//! All errors use the `CL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Input validation
//! - 2xx: Authorization
//! - 3xx: Order state machine
//! - 4xx: External call execution
//! - 5xx: Message bus
//! - 6xx: Assets, allowances and permits
//! - 8xx: Safety invariants
//! - 9xx: General / internal errors
//!
//! Only 1xx-3xx and 5xx-6xx ever reject a ledger entry point. External call
//! failures (4xx) are caught by the adapter and recorded; claim anomalies are
//! events, not errors.

use thiserror::Error;

use crate::{Amount, ChainId, SubmissionId};

/// Central error enum for all crosslock operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrosslockError {
    // =================================================================
    // Input Validation (1xx)
    // =================================================================
    /// An address does not have the byte length its chain's engine expects.
    #[error("CL_ERR_100: Wrong address length for {field}: expected {expected}, got {actual}")]
    WrongAddressLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Attached native value is not the fixed fee (non-native give asset).
    #[error("CL_ERR_101: Wrong fixed fee: got {actual}, expected {expected}")]
    WrongFixedFee { actual: Amount, expected: Amount },

    /// Attached native value does not match fixed fee plus give amount.
    #[error("CL_ERR_102: Native value does not match give amount")]
    MismatchNativeGiveAmount,

    /// Attached native value does not match the native take amount.
    #[error("CL_ERR_103: Native value does not match take amount")]
    MismatchNativeTakeAmount,

    /// Zero amounts, out-of-range patches, bad fee parameters.
    #[error("CL_ERR_104: Wrong argument: {reason}")]
    WrongArgument { reason: String },

    /// Percent fee plus affiliate fee would exceed the give amount.
    #[error("CL_ERR_105: Fees {fees} exceed amount {amount}")]
    FeeExceedsAmount { fees: Amount, amount: Amount },

    /// Attached value or order amount does not cover the fees and rewards.
    #[error("CL_ERR_106: Transfer amount does not cover fees")]
    TransferAmountNotCoverFees,

    /// Batch is empty or larger than the configured maximum.
    #[error("CL_ERR_107: Unexpected batch size {size} (max {max})")]
    UnexpectedBatchSize { size: usize, max: usize },

    /// The supplied order id does not match the id derived from the order.
    #[error("CL_ERR_108: Order id does not match order fields")]
    MismatchedOrderId,

    /// The external call envelope could not be decoded.
    #[error("CL_ERR_109: Invalid external call: {reason}")]
    InvalidExternalCall { reason: String },

    /// An affiliate, permit or instruction envelope could not be decoded.
    #[error("CL_ERR_110: Malformed envelope: {reason}")]
    MalformedEnvelope { reason: String },

    // =================================================================
    // Authorization (2xx)
    // =================================================================
    /// Caller is not the authority this operation requires.
    #[error("CL_ERR_200: Unauthorized")]
    Unauthorized,

    /// Caller is not the administrator.
    #[error("CL_ERR_201: Admin role required")]
    AdminBadRole,

    /// Forwarded call did not come through the bus call proxy.
    #[error("CL_ERR_202: Call proxy role required")]
    CallProxyBadRole,

    /// Forwarded call did not originate from the registered peer ledger.
    #[error("CL_ERR_203: Native sender is not the registered peer")]
    NativeSenderBadRole,

    /// Adapter entry point called by someone other than the take-side ledger.
    #[error("CL_ERR_204: Take-side ledger role required")]
    DlnBadRole,

    /// Caller is not the call authority or delegated executor.
    #[error("CL_ERR_205: Bad role")]
    BadRole,

    // =================================================================
    // Order State Machine (3xx)
    // =================================================================
    /// The order is not in the status the transition requires.
    #[error("CL_ERR_300: Incorrect order status")]
    IncorrectOrderStatus,

    /// The external call is not in the Created status.
    #[error("CL_ERR_301: Invalid external call state")]
    InvalidState,

    /// The order does not belong to this chain, or a batch mixes chains.
    #[error("CL_ERR_302: Wrong chain")]
    WrongChain,

    /// An account-model batch mixes give assets.
    #[error("CL_ERR_303: Wrong token")]
    WrongToken,

    /// No take-side ledger is registered for the chain.
    #[error("CL_ERR_304: Destination chain not supported: {0}")]
    NotSupportedDstChain(ChainId),

    /// No give-side ledger is registered for the chain.
    #[error("CL_ERR_305: Source chain not supported: {0}")]
    NotSupportedSrcChain(ChainId),

    // =================================================================
    // External Call Execution (4xx)
    // =================================================================
    /// Call data begins with a blocklisted selector.
    #[error("CL_ERR_400: Prohibited selector 0x{selector}")]
    ProhibitedSelector { selector: String },

    /// Call data is shorter than a selector.
    #[error("CL_ERR_401: Call data too short: {len} bytes")]
    CallDataTooShort { len: usize },

    /// No call target is registered at the payload's address.
    #[error("CL_ERR_402: No call target at {0}")]
    TargetNotRegistered(String),

    /// The call target rejected the call.
    #[error("CL_ERR_403: Call reverted: {reason}")]
    CallReverted { reason: String },

    /// A delayed call that must succeed did not.
    #[error("CL_ERR_404: External call failed")]
    ExternalCallFailed,

    // =================================================================
    // Message Bus (5xx)
    // =================================================================
    /// The submission has already been claimed.
    #[error("CL_ERR_500: Submission already used: {0}")]
    SubmissionUsed(SubmissionId),

    /// The bus has no record of the submission.
    #[error("CL_ERR_501: Unknown submission: {0}")]
    SubmissionNotFound(SubmissionId),

    /// Oracle signatures did not reach the confirmation threshold.
    #[error("CL_ERR_502: Not enough valid confirmations: {valid} of {required}")]
    NotConfirmed { valid: usize, required: usize },

    // =================================================================
    // Assets (6xx)
    // =================================================================
    /// Holder balance too low for the transfer.
    #[error("CL_ERR_600: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: Amount, available: Amount },

    /// Spender allowance too low for the pull.
    #[error("CL_ERR_601: Insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: Amount, available: Amount },

    /// The permit deadline has passed.
    #[error("CL_ERR_602: Permit expired")]
    PermitExpired,

    /// The permit signature did not verify.
    #[error("CL_ERR_603: Permit signature invalid")]
    PermitSignatureInvalid,

    // =================================================================
    // Safety Invariants (8xx)
    // =================================================================
    /// Supply conservation invariant violated.
    #[error("CL_ERR_800: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("CL_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Amount arithmetic overflowed.
    #[error("CL_ERR_901: Arithmetic overflow")]
    ArithmeticOverflow,
}

impl CrosslockError {
    /// Shorthand for [`CrosslockError::WrongArgument`].
    pub fn wrong_argument(reason: impl Into<String>) -> Self {
        Self::WrongArgument {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CrosslockError::MalformedEnvelope`].
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            reason: reason.into(),
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, CrosslockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = CrosslockError::IncorrectOrderStatus;
        let msg = format!("{err}");
        assert!(msg.starts_with("CL_ERR_300"), "Got: {msg}");
    }

    #[test]
    fn wrong_fixed_fee_display() {
        let err = CrosslockError::WrongFixedFee {
            actual: 5,
            expected: 1000,
        };
        let msg = format!("{err}");
        assert!(msg.contains("CL_ERR_101"));
        assert!(msg.contains("1000"));
        assert!(msg.contains('5'));
    }

    #[test]
    fn not_supported_chain_display() {
        let msg = format!("{}", CrosslockError::NotSupportedDstChain(ChainId(137)));
        assert!(msg.contains("CL_ERR_304"));
        assert!(msg.contains("chain:137"));
    }

    #[test]
    fn all_errors_have_cl_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(CrosslockError::Unauthorized),
            Box::new(CrosslockError::WrongToken),
            Box::new(CrosslockError::TransferAmountNotCoverFees),
            Box::new(CrosslockError::SubmissionUsed(SubmissionId::default())),
            Box::new(CrosslockError::Internal("test".into())),
            Box::new(CrosslockError::wrong_argument("zero amount")),
            Box::new(CrosslockError::UnexpectedBatchSize { size: 0, max: 10 }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("CL_ERR_"),
                "Error missing CL_ERR_ prefix: {msg}"
            );
        }
    }
}
