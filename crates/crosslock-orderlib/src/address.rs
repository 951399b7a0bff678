//! Address length checks per chain engine.

use crosslock_types::{Address, ChainEngine, CrosslockError, Result};

/// Reject an address whose length does not fit `engine`.
pub fn validate_address(field: &'static str, address: &Address, engine: ChainEngine) -> Result<()> {
    let expected = engine.address_len();
    if address.len() != expected {
        return Err(CrosslockError::WrongAddressLength {
            field,
            expected,
            actual: address.len(),
        });
    }
    Ok(())
}

/// Same as [`validate_address`], skipping `None`.
pub fn validate_optional_address(
    field: &'static str,
    address: Option<&Address>,
    engine: ChainEngine,
) -> Result<()> {
    address.map_or(Ok(()), |a| validate_address(field, a, engine))
}
