//! Keys - mnemonic → seed → one keypair per chain. Pure, no I/O.
//!
//! ```text
//! Mnemonic (BIP39)
//!     │  to_seed("")
//!     ▼
//! Seed (64 bytes)
//!     ├── BIP32 m/86'/0'/0'/0/0 ─────→ Bitcoin (Taproot internal key)
//!     ├── BIP32 m/44'/5757'/0'/0/0 ──→ Stacks
//!     ├── BIP32 m/44'/60'/0'/0/0 ────→ Ethereum / HyperEVM
//!     └── SLIP10 m/44'/501'/0'/0' ───→ Solana (ed25519)
//! ```
//!
//! Paths are fixed: one account, one address index, no rotation.

mod slip10;

use crate::error::{WalletError, WalletResult};
use bip39::Mnemonic;
use bitcoin::bip32::{DerivationPath, Xpriv};
use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, Signing, XOnlyPublicKey};
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

pub use slip10::derive_ed25519;

pub const BITCOIN_TAPROOT_PATH: &str = "m/86'/0'/0'/0/0";
pub const SOLANA_PATH: &str = "m/44'/501'/0'/0'";
pub const STACKS_PATH: &str = "m/44'/5757'/0'/0/0";
pub const ETHEREUM_PATH: &str = "m/44'/60'/0'/0/0";

/// Parse and checksum-validate a BIP39 English mnemonic.
///
/// Whitespace and case are normalized first, so pasted phrases with
/// double spaces or capitals still parse.
pub fn parse_mnemonic(phrase: &str) -> WalletResult<Mnemonic> {
    let normalized = phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");
    Mnemonic::parse_normalized(&normalized).map_err(|e| WalletError::InvalidMnemonic(e.to_string()))
}

/// Fresh mnemonic from OS randomness (12 or 24 words).
pub fn generate_mnemonic(words: usize) -> WalletResult<Zeroizing<String>> {
    let entropy_len = match words {
        12 => 16,
        24 => 32,
        _ => return Err(WalletError::InvalidMnemonic(format!("unsupported word count {}", words))),
    };
    let mut entropy = Zeroizing::new([0u8; 32]);
    rand::rngs::OsRng.fill_bytes(&mut entropy[..entropy_len]);
    let mnemonic = Mnemonic::from_entropy(&entropy[..entropy_len])
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// 64-byte BIP39 seed, wiped on drop
pub struct Seed(Zeroizing<[u8; 64]>);

impl Seed {
    pub fn from_mnemonic(phrase: &str) -> WalletResult<Self> {
        let mnemonic = parse_mnemonic(phrase)?;
        Ok(Self(Zeroizing::new(mnemonic.to_seed(""))))
    }

    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}

/// secp256k1 private/public pair derived at a fixed path
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    pub fn from_secret_key<C: Signing>(secp: &Secp256k1<C>, secret: SecretKey) -> Self {
        Self { public: PublicKey::from_secret_key(secp, &secret), secret }
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// 32-byte x coordinate; the parity byte is dropped.
    pub fn x_only_public_key(&self) -> XOnlyPublicKey {
        self.public.x_only_public_key().0
    }

    /// Compressed encoding starts with 0x03 when y is odd.
    pub fn has_odd_y(&self) -> bool {
        self.public.serialize()[0] == 0x03
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("public", &self.public).finish_non_exhaustive()
    }
}

/// BIP32 derivation at `path` from the seed's master key.
pub fn derive_secp256k1<C: Signing>(secp: &Secp256k1<C>, seed: &Seed, path: &str) -> WalletResult<KeyPair> {
    let path = DerivationPath::from_str(path).map_err(|e| WalletError::Derivation(format!("{}: {}", path, e)))?;
    // Network kind only affects xpriv serialization, never the derived scalar
    let master = Xpriv::new_master(bitcoin::NetworkKind::Main, seed.as_bytes())
        .map_err(|e| WalletError::Derivation(e.to_string()))?;
    let child = master
        .derive_priv(secp, &path)
        .map_err(|e| WalletError::Derivation(e.to_string()))?;
    Ok(KeyPair::from_secret_key(secp, child.private_key))
}

pub fn derive_bitcoin_key<C: Signing>(secp: &Secp256k1<C>, seed: &Seed) -> WalletResult<KeyPair> {
    derive_secp256k1(secp, seed, BITCOIN_TAPROOT_PATH)
}

pub fn derive_stacks_key<C: Signing>(secp: &Secp256k1<C>, seed: &Seed) -> WalletResult<KeyPair> {
    derive_secp256k1(secp, seed, STACKS_PATH)
}

pub fn derive_ethereum_key<C: Signing>(secp: &Secp256k1<C>, seed: &Seed) -> WalletResult<KeyPair> {
    derive_secp256k1(secp, seed, ETHEREUM_PATH)
}

pub fn derive_solana_key(seed: &Seed) -> WalletResult<Zeroizing<[u8; 32]>> {
    derive_ed25519(seed, SOLANA_PATH)
}
