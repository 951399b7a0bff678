//! Submission replay guard.
//!
//! Each bus submission executes at most once. Claiming the same
//! [`SubmissionId`] again returns [`CrosslockError::SubmissionUsed`].
//! Claimed ids are never forgotten.

use std::collections::HashSet;

use crosslock_types::{CrosslockError, Result, SubmissionId};

/// Remembers claimed submissions.
#[derive(Debug, Default)]
pub struct SubmissionGuard {
    used: HashSet<SubmissionId>,
}

impl SubmissionGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail if the submission was already claimed.
    pub fn check(&self, id: &SubmissionId) -> Result<()> {
        if self.used.contains(id) {
            return Err(CrosslockError::SubmissionUsed(*id));
        }
        Ok(())
    }

    /// Mark a submission as claimed.
    ///
    /// # Errors
    /// Returns [`CrosslockError::SubmissionUsed`] if it already was.
    pub fn mark_used(&mut self, id: SubmissionId) -> Result<()> {
        if !self.used.insert(id) {
            return Err(CrosslockError::SubmissionUsed(id));
        }
        Ok(())
    }

    pub fn is_used(&self, id: &SubmissionId) -> bool {
        self.used.contains(id)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(n: u8) -> SubmissionId {
        SubmissionId::from_bytes([n; 32])
    }

    #[test]
    fn second_claim_rejected() {
        let mut guard = SubmissionGuard::new();
        guard.mark_used(sub(1)).unwrap();
        let err = guard.mark_used(sub(1)).unwrap_err();
        assert!(
            matches!(err, CrosslockError::SubmissionUsed(id) if id == sub(1)),
            "Expected SubmissionUsed, got: {err:?}"
        );
    }

    #[test]
    fn oldest_claim_stays_rejected() {
        let mut guard = SubmissionGuard::new();
        for n in 0..=255 {
            guard.mark_used(sub(n)).unwrap();
        }
        assert_eq!(guard.len(), 256);
        assert_eq!(guard.check(&sub(0)).unwrap_err(), CrosslockError::SubmissionUsed(sub(0)));
        assert!(guard.mark_used(sub(0)).is_err());
    }

    #[test]
    fn unclaimed_passes_check() {
        let guard = SubmissionGuard::new();
        assert!(guard.is_empty());
        assert!(guard.check(&sub(7)).is_ok());
    }
}
