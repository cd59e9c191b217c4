//! Heartbeat tokens exchanged in `^PING` / `^PONG` frames.

use std::fmt;

use pinpad_core::constants::{HEARTBEAT_TOKEN_ALPHABET, HEARTBEAT_TOKEN_FIRST, HEARTBEAT_TOKEN_LEN};
use pinpad_core::{Error, Result};
use rand::Rng;

/// Two printable characters identifying one liveness probe.
///
/// The terminal echoes the token of every `^PING` back in a `^PONG`, which
/// lets the engine tell an acknowledged probe from a lost one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeartbeatToken([u8; HEARTBEAT_TOKEN_LEN]);

impl HeartbeatToken {
    /// Create a token from raw bytes.
    ///
    /// Tokens received from the terminal are not restricted to the alphabet
    /// used by [`HeartbeatToken::random`]; any printable ASCII is accepted so
    /// that a corrupted echo can still be reported as a mismatch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToken`] if a byte is not printable ASCII.
    pub fn new(bytes: [u8; HEARTBEAT_TOKEN_LEN]) -> Result<Self> {
        if !bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            return Err(Error::InvalidToken(format!("{:?}", bytes)));
        }
        Ok(Self(bytes))
    }

    /// Draw a fresh token from the `'@'..='y'` alphabet.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinpad_protocol::HeartbeatToken;
    ///
    /// let token = HeartbeatToken::random(&mut rand::thread_rng());
    /// assert!(token.as_bytes().iter().all(|b| (b'@'..=b'y').contains(b)));
    /// ```
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; HEARTBEAT_TOKEN_LEN];
        for byte in &mut bytes {
            *byte = HEARTBEAT_TOKEN_FIRST + rng.gen_range(0..HEARTBEAT_TOKEN_ALPHABET);
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HEARTBEAT_TOKEN_LEN] {
        &self.0
    }

    /// Token as a string slice (always ASCII).
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl fmt::Display for HeartbeatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HeartbeatToken {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; HEARTBEAT_TOKEN_LEN] = s
            .as_bytes()
            .try_into()
            .map_err(|_| Error::InvalidToken(s.to_string()))?;
        Self::new(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_random_tokens_stay_in_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let token = HeartbeatToken::random(&mut rng);
            assert!(token.as_bytes().iter().all(|b| (b'@'..=b'y').contains(b)));
        }
    }

    #[test]
    fn test_parse_token() {
        let token: HeartbeatToken = "Ab".parse().unwrap();
        assert_eq!(token.as_str(), "Ab");
        assert_eq!(token.to_string(), "Ab");
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!("A".parse::<HeartbeatToken>().is_err());
        assert!("Abc".parse::<HeartbeatToken>().is_err());
    }

    #[test]
    fn test_new_rejects_control_bytes() {
        assert!(HeartbeatToken::new([b'A', 0x07]).is_err());
        assert!(HeartbeatToken::new([b'A', b'$']).is_ok());
    }
}
