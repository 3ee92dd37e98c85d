//! SLIP-0010 ed25519 derivation (hardened-only).
//!
//! Reference: https://github.com/satoshilabs/slips/blob/master/slip-0010.md

use super::Seed;
use crate::error::{WalletError, WalletResult};
use bitcoin::bip32::{ChildNumber, DerivationPath};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::str::FromStr;
use zeroize::Zeroizing;

type HmacSha512 = Hmac<Sha512>;

const ED25519_CURVE_KEY: &[u8] = b"ed25519 seed";

fn hmac_sha512(key: &[u8], parts: &[&[u8]]) -> WalletResult<Zeroizing<[u8; 64]>> {
    let mut mac = HmacSha512::new_from_slice(key).map_err(|e| WalletError::Derivation(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Derive a 32-byte ed25519 secret at `path`. Every level must be hardened.
pub fn derive_ed25519(seed: &Seed, path: &str) -> WalletResult<Zeroizing<[u8; 32]>> {
    derive_from_bytes(seed.as_bytes(), path)
}

fn derive_from_bytes(seed: &[u8], path: &str) -> WalletResult<Zeroizing<[u8; 32]>> {
    let path = DerivationPath::from_str(path).map_err(|e| WalletError::Derivation(format!("{}: {}", path, e)))?;

    let mut node = hmac_sha512(ED25519_CURVE_KEY, &[seed])?;
    for child in &path {
        let index = match child {
            ChildNumber::Hardened { .. } => u32::from(*child),
            ChildNumber::Normal { index } => {
                return Err(WalletError::Derivation(format!("ed25519 requires hardened path, got {}", index)));
            }
        };
        let (key, chain_code) = node.split_at(32);
        node = hmac_sha512(chain_code, &[&[0u8][..], key, &index.to_be_bytes()[..]])?;
    }

    let mut secret = Zeroizing::new([0u8; 32]);
    secret.copy_from_slice(&node[..32]);
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    // SLIP-0010 test vector 1 for ed25519
    const VECTOR_SEED: &str = "000102030405060708090a0b0c0d0e0f";

    #[test]
    fn test_vector_1() {
        let seed = hex::decode(VECTOR_SEED).unwrap();
        assert_eq!(
            hex::encode(*derive_from_bytes(&seed, "m").unwrap()),
            "2b4be7f19ee27bbf30c667b642d5f4aa69fd169872f8fc3059c08ebae2eb19e7"
        );
        assert_eq!(
            hex::encode(*derive_from_bytes(&seed, "m/0'").unwrap()),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
    }

    #[test]
    fn test_rejects_normal_child() {
        let seed = Seed::from_bytes([7u8; 64]);
        assert!(matches!(derive_ed25519(&seed, "m/44'/501'/0'/0"), Err(WalletError::Derivation(_))));
    }

    #[test]
    fn test_deterministic_and_path_sensitive() {
        let seed = Seed::from_bytes([7u8; 64]);
        let a = derive_ed25519(&seed, "m/44'/501'/0'/0'").unwrap();
        let b = derive_ed25519(&seed, "m/44'/501'/0'/0'").unwrap();
        let c = derive_ed25519(&seed, "m/44'/501'/1'/0'").unwrap();
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
    }
}
