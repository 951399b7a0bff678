//! Asset book for one chain.
//!
//! Holds native and token balances per (holder, asset), token allowances,
//! and permit signer keys. Every movement of value goes through
//! [`AssetBook::transfer`] and is appended to a transfer log, so tests can
//! count exactly how many transfer calls an operation made.
//!
//! Ledger entry points wrap their asset movements in
//! [`AssetBook::atomically`]: if any step fails, balances, allowances and
//! the log are restored and the entry point returns the error.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use crosslock_orderlib::{PermitEnvelope, permit_digest};
use crosslock_types::{Address, Amount, CrosslockError, Result};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::supply::Issuance;

/// One executed transfer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub asset: Address,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, Default)]
struct Books {
    /// (holder, asset) -> balance
    balances: HashMap<(Address, Address), Amount>,
    /// (owner, spender, asset) -> allowance
    allowances: HashMap<(Address, Address, Address), Amount>,
    used_permits: HashSet<[u8; 32]>,
    transfers: Vec<TransferRecord>,
    issuance: Issuance,
}

/// Balances, allowances and permits of one chain.
#[derive(Debug)]
pub struct AssetBook {
    native: Address,
    books: Books,
    permit_signers: HashMap<Address, VerifyingKey>,
}

impl AssetBook {
    /// Empty book whose native asset is the zero address.
    #[must_use]
    pub fn new() -> Self {
        Self {
            native: Address::zero(),
            books: Books::default(),
            permit_signers: HashMap::new(),
        }
    }

    #[must_use]
    pub fn native_asset(&self) -> &Address {
        &self.native
    }

    #[must_use]
    pub fn is_native(&self, asset: &Address) -> bool {
        *asset == self.native
    }

    /// Create `amount` of `asset` out of thin air for `holder`.
    pub fn mint(&mut self, holder: &Address, asset: &Address, amount: Amount) {
        *self
            .books
            .balances
            .entry((holder.clone(), asset.clone()))
            .or_insert(0) += amount;
        self.books.issuance.record(asset, amount);
    }

    #[must_use]
    pub fn balance(&self, holder: &Address, asset: &Address) -> Amount {
        self.books
            .balances
            .get(&(holder.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Check that every asset's balances sum to what was minted.
    ///
    /// # Errors
    /// [`CrosslockError::SupplyInvariantViolation`] naming the first asset
    /// that drifted.
    pub fn verify_supply(&self) -> Result<()> {
        self.books.issuance.check(
            self.books
                .balances
                .iter()
                .map(|((_, asset), amount)| (asset, *amount)),
        )
    }

    // -----------------------------------------------------------------
    // Transfers
    // -----------------------------------------------------------------

    /// Move `amount` of `asset` from `from` to `to`. Zero amounts are a
    /// no-op and are not logged.
    ///
    /// # Errors
    /// Returns [`CrosslockError::InsufficientBalance`] if `from` holds less.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        asset: &Address,
        amount: Amount,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let available = self.balance(from, asset);
        if available < amount {
            return Err(CrosslockError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        self.books
            .balances
            .insert((from.clone(), asset.clone()), available - amount);
        *self
            .books
            .balances
            .entry((to.clone(), asset.clone()))
            .or_insert(0) += amount;

        tracing::debug!(asset = %asset, from = %from, to = %to, amount, "Transfer");
        self.books.transfers.push(TransferRecord {
            asset: asset.clone(),
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    /// Pull `amount` from `owner` to `to` using `spender`'s allowance.
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        owner: &Address,
        to: &Address,
        asset: &Address,
        amount: Amount,
    ) -> Result<()> {
        let key = (owner.clone(), spender.clone(), asset.clone());
        let allowed = self.books.allowances.get(&key).copied().unwrap_or(0);
        if allowed < amount {
            return Err(CrosslockError::InsufficientAllowance {
                needed: amount,
                available: allowed,
            });
        }
        self.transfer(owner, to, asset, amount)?;
        self.books.allowances.insert(key, allowed - amount);
        Ok(())
    }

    /// Every transfer executed so far, oldest first.
    #[must_use]
    pub fn transfers(&self) -> &[TransferRecord] {
        &self.books.transfers
    }

    /// Transfers executed after the log had `mark` entries.
    #[must_use]
    pub fn transfers_since(&self, mark: usize) -> &[TransferRecord] {
        &self.books.transfers[mark.min(self.books.transfers.len())..]
    }

    #[must_use]
    pub fn transfer_count(&self) -> usize {
        self.books.transfers.len()
    }

    // -----------------------------------------------------------------
    // Allowances and permits
    // -----------------------------------------------------------------

    pub fn approve(&mut self, owner: &Address, spender: &Address, asset: &Address, amount: Amount) {
        self.books
            .allowances
            .insert((owner.clone(), spender.clone(), asset.clone()), amount);
    }

    #[must_use]
    pub fn allowance(&self, owner: &Address, spender: &Address, asset: &Address) -> Amount {
        self.books
            .allowances
            .get(&(owner.clone(), spender.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Register the key `owner` signs permits with.
    pub fn register_permit_signer(&mut self, owner: &Address, key: VerifyingKey) {
        self.permit_signers.insert(owner.clone(), key);
    }

    /// Apply a signed permit: set `spender`'s allowance over `owner`'s
    /// `asset` to the permit amount.
    ///
    /// # Errors
    /// [`CrosslockError::PermitExpired`] past the deadline,
    /// [`CrosslockError::PermitSignatureInvalid`] for an unknown signer, a
    /// bad signature, or a permit that was already used.
    pub fn permit(
        &mut self,
        owner: &Address,
        spender: &Address,
        asset: &Address,
        permit: &PermitEnvelope,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if now.timestamp() > permit.deadline {
            return Err(CrosslockError::PermitExpired);
        }
        let digest = permit_digest(owner, spender, asset, permit.amount, permit.deadline);
        if self.books.used_permits.contains(&digest) {
            return Err(CrosslockError::PermitSignatureInvalid);
        }
        let key = self
            .permit_signers
            .get(owner)
            .ok_or(CrosslockError::PermitSignatureInvalid)?;
        let signature = Signature::from_slice(&permit.signature)
            .map_err(|_| CrosslockError::PermitSignatureInvalid)?;
        key.verify(&digest, &signature)
            .map_err(|_| CrosslockError::PermitSignatureInvalid)?;

        self.books.used_permits.insert(digest);
        self.approve(owner, spender, asset, permit.amount);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Atomicity
    // -----------------------------------------------------------------

    /// Run `f` against the book; if it fails, restore the book to what it
    /// was before `f` ran.
    pub fn atomically<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let snapshot = self.books.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.books = snapshot;
                Err(err)
            }
        }
    }
}

impl Default for AssetBook {
    fn default() -> Self {
        Self::new()
    }
}
