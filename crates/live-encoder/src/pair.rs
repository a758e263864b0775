//! Pairing token minting
use livepair_common::PairToken;
use uuid::Uuid;

/// Mints the opaque token that links the two artifacts of a live image.
pub struct PairIdentifier;

impl PairIdentifier {
    /// Mint a fresh token. UUID v4, 122 bits of entropy.
    #[must_use]
    pub fn mint() -> PairToken {
        PairToken::new(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = PairIdentifier::mint();
        let b = PairIdentifier::mint();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_is_uuid_shaped() {
        let token = PairIdentifier::mint();
        assert_eq!(token.as_str().len(), 36);
        assert_eq!(token.as_str().matches('-').count(), 4);
    }
}
