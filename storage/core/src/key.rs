// Copyright (c) 2021-2026 RBB S.r.l
// opensource@mintlayer.org
// SPDX-License-Identifier: MIT
// Licensed under the MIT License;
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://github.com/mintlayer/mintlayer-core/blob/master/LICENSE
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Public keys identifying stores and feeds, and the discovery keys derived from them

use blake2::{digest::consts::U32, Blake2b, Digest};

const KEY_LEN: usize = 32;

// Keeps discovery keys distinct from any other digest of the same public key.
const DISCOVERY_KEY_TAG: &[u8] = b"hypercore";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyParseError {
    #[error("Key must be {expected} hex characters, got {actual}")]
    BadLength { expected: usize, actual: usize },
    #[error("Key is not valid hex: {0}")]
    BadHex(String),
}

/// Public key of a store or feed, printed as 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DbKey([u8; KEY_LEN]);

impl DbKey {
    pub const HEX_LEN: usize = KEY_LEN * 2;

    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn discovery_key(&self) -> DiscoveryKey {
        DiscoveryKey::from_key(self)
    }
}

impl std::fmt::Display for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for DbKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DbKey({})", self.to_hex())
    }
}

impl std::str::FromStr for DbKey {
    type Err = KeyParseError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::HEX_LEN {
            return Err(KeyParseError::BadLength {
                expected: Self::HEX_LEN,
                actual: s.len(),
            });
        }
        let mut bytes = [0u8; KEY_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| KeyParseError::BadHex(e.to_string()))?;
        Ok(Self(bytes))
    }
}

/// Topic under which a key is announced and looked up on the network. Knowing the discovery
/// key does not reveal the public key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiscoveryKey([u8; KEY_LEN]);

impl DiscoveryKey {
    pub fn from_key(key: &DbKey) -> Self {
        let digest = Blake2b::<U32>::new()
            .chain_update(DISCOVERY_KEY_TAG)
            .chain_update(key.as_bytes())
            .finalize();
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Display for DiscoveryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for DiscoveryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DiscoveryKey({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn hex_round_trip_is_case_insensitive() {
        let key = DbKey::from_bytes([0xab; 32]);
        let hex = key.to_string();
        assert_eq!(hex.len(), DbKey::HEX_LEN);
        assert_eq!(hex, "ab".repeat(32));
        assert_eq!(hex.parse::<DbKey>(), Ok(key));
        assert_eq!(hex.to_uppercase().parse::<DbKey>(), Ok(key));
    }

    #[rstest]
    #[case("", KeyParseError::BadLength { expected: 64, actual: 0 })]
    #[case("abcd", KeyParseError::BadLength { expected: 64, actual: 4 })]
    fn bad_length(#[case] input: &str, #[case] expected: KeyParseError) {
        assert_eq!(input.parse::<DbKey>(), Err(expected));
    }

    #[test]
    fn bad_hex() {
        let input = "zz".repeat(32);
        assert!(matches!(input.parse::<DbKey>(), Err(KeyParseError::BadHex(_))));
    }

    #[test]
    fn discovery_key_differs_from_key() {
        let key1 = DbKey::from_bytes([1; 32]);
        let key2 = DbKey::from_bytes([2; 32]);
        assert_ne!(key1.discovery_key().to_hex(), key1.to_hex());
        assert_ne!(key1.discovery_key(), key2.discovery_key());
        assert_eq!(key1.discovery_key(), DiscoveryKey::from_key(&key1));
    }
}
