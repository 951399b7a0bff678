//! Selector blocklist applied before any external call runs.
//!
//! The executor holds allowances on behalf of fulfilled orders. A payload
//! whose call data starts with an asset-transfer selector could spend them,
//! so those prefixes are refused. The set is policy data: the adapter admin
//! can add or remove entries.

use std::collections::HashSet;

use crosslock_types::{CrosslockError, Result, constants};

/// Set of refused four-byte call data prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPolicy {
    prohibited: HashSet<[u8; 4]>,
}

impl SelectorPolicy {
    /// Policy with nothing blocked.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            prohibited: HashSet::new(),
        }
    }

    /// Returns `true` if the selector was newly added.
    pub fn prohibit(&mut self, selector: [u8; 4]) -> bool {
        self.prohibited.insert(selector)
    }

    /// Returns `true` if the selector was blocked before.
    pub fn allow(&mut self, selector: [u8; 4]) -> bool {
        self.prohibited.remove(&selector)
    }

    #[must_use]
    pub fn is_prohibited(&self, selector: &[u8; 4]) -> bool {
        self.prohibited.contains(selector)
    }

    /// Check call data against the blocklist.
    ///
    /// # Errors
    /// [`CrosslockError::CallDataTooShort`] below four bytes,
    /// [`CrosslockError::ProhibitedSelector`] on a blocked prefix.
    pub fn check(&self, call_data: &[u8]) -> Result<()> {
        let Some(prefix) = call_data.first_chunk::<4>() else {
            return Err(CrosslockError::CallDataTooShort {
                len: call_data.len(),
            });
        };
        if self.is_prohibited(prefix) {
            return Err(CrosslockError::ProhibitedSelector {
                selector: hex::encode(prefix),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.prohibited.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prohibited.is_empty()
    }
}

impl Default for SelectorPolicy {
    /// Blocks approve, transferFrom, transfer and increaseAllowance.
    fn default() -> Self {
        Self {
            prohibited: constants::DEFAULT_PROHIBITED_SELECTORS.into_iter().collect(),
        }
    }
}
