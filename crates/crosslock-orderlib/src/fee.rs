//! Fee engine.
//!
//! ```text
//! percent_fee = floor(amount * bps / 10_000)
//! net         = raw - percent_fee - affiliate
//! ```
//!
//! The fixed native fee is charged separately, in the native asset, and
//! never touches these numbers.

use crosslock_types::{Amount, CrosslockError, Result, constants::BPS_DENOMINATOR};

/// Split of a raw give amount at order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationFee {
    pub percent_fee: Amount,
    pub net_give_amount: Amount,
}

/// Split of a give-amount increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchFee {
    pub percent_fee: Amount,
    pub net_added_amount: Amount,
}

/// `floor(amount * bps / 10_000)`.
pub fn percent_of(amount: Amount, bps: u64) -> Result<Amount> {
    amount
        .checked_mul(Amount::from(bps))
        .map(|scaled| scaled / BPS_DENOMINATOR)
        .ok_or(CrosslockError::ArithmeticOverflow)
}

/// Net a raw give amount through the percent fee and the affiliate fee.
///
/// # Errors
/// [`CrosslockError::FeeExceedsAmount`] when the two fees together exceed
/// `raw_give_amount`.
pub fn apply_creation_fee(
    raw_give_amount: Amount,
    affiliate_fee_amount: Amount,
    transfer_fee_bps: u64,
) -> Result<CreationFee> {
    let percent_fee = percent_of(raw_give_amount, transfer_fee_bps)?;
    let fees = percent_fee
        .checked_add(affiliate_fee_amount)
        .ok_or(CrosslockError::ArithmeticOverflow)?;
    if fees > raw_give_amount {
        return Err(CrosslockError::FeeExceedsAmount {
            fees,
            amount: raw_give_amount,
        });
    }
    Ok(CreationFee {
        percent_fee,
        net_give_amount: raw_give_amount - fees,
    })
}

/// Percent fee on a patch increment only.
///
/// # Errors
/// [`CrosslockError::FeeExceedsAmount`] when `transfer_fee_bps` is above
/// 10 000.
pub fn apply_patch_fee(added_amount: Amount, transfer_fee_bps: u64) -> Result<PatchFee> {
    let percent_fee = percent_of(added_amount, transfer_fee_bps)?;
    let net_added_amount =
        added_amount
            .checked_sub(percent_fee)
            .ok_or(CrosslockError::FeeExceedsAmount {
                fees: percent_fee,
                amount: added_amount,
            })?;
    Ok(PatchFee {
        percent_fee,
        net_added_amount,
    })
}

/// Check that an order's escrow can pay the rewards of an account-model
/// unlock.
///
/// From `amount` the bus takes its fixed fee, then its percent fee on what
/// is left, then the execution fee. The remainder must cover both rewards.
/// Rewards are in the same units as `amount`.
pub fn validate_solana_rewards(
    amount: Amount,
    execution_fee: Amount,
    fixed_fee: Amount,
    transfer_fee_bps: u64,
    reward1: u64,
    reward2: u64,
) -> Result<()> {
    let after_fixed = amount
        .checked_sub(fixed_fee)
        .ok_or(CrosslockError::TransferAmountNotCoverFees)?;
    let after_transfer = after_fixed
        .checked_sub(percent_of(after_fixed, transfer_fee_bps)?)
        .ok_or(CrosslockError::TransferAmountNotCoverFees)?;
    let available = after_transfer
        .checked_sub(execution_fee)
        .ok_or(CrosslockError::TransferAmountNotCoverFees)?;

    if available < Amount::from(reward1) + Amount::from(reward2) {
        return Err(CrosslockError::TransferAmountNotCoverFees);
    }
    Ok(())
}
