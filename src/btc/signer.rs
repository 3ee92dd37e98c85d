//! Taproot signer - BIP341 key-path tweak and two interchangeable signing backends.
//!
//! ```text
//! KeyPair (internal key P, secret d)
//!     │  d' = (odd(P) ? -d : d) + H_TapTweak(x(P))   mod n
//!     ▼
//! tweaked secret d'  ──┬── HardwareBackedSigner   (libsecp256k1 Keypair)
//!                      └── SoftwareSchnorrSigner  (pure Rust k256 scalar)
//!                                │
//!                                ▼
//!                 BIP340 signatures valid for output key Q = x(d'·G)
//! ```
//!
//! Both backends must verify against the same output key; the app picks one
//! based on what the platform supports.

use crate::config::Network;
use crate::error::{WalletError, WalletResult};
use crate::keys::KeyPair;
use bitcoin::hashes::Hash;
use bitcoin::key::TapTweak;
use bitcoin::secp256k1::{ecdsa, schnorr, All, Keypair, Message, Scalar, Secp256k1, SecretKey, Signing, Verification, XOnlyPublicKey};
use bitcoin::taproot::TapTweakHash;
use bitcoin::{Address, ScriptBuf};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use std::fmt;
use zeroize::Zeroizing;

/// Which signing backend to build the tweaked signer on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignerKind {
    /// Opaque keypair held by libsecp256k1
    #[default]
    HardwareBacked,
    /// Explicit scalar, pure-Rust curve arithmetic
    Software,
}

impl SignerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignerKind::HardwareBacked => "hardware",
            SignerKind::Software => "software",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hardware" | "native" | "secp256k1" => Some(SignerKind::HardwareBacked),
            "software" | "pure" | "k256" => Some(SignerKind::Software),
            _ => None,
        }
    }
}

/// Signing capability for a taproot output key.
pub trait Signer: Send + Sync {
    /// The tweaked x-only key signatures verify against.
    fn output_key(&self) -> XOnlyPublicKey;
    fn sign_schnorr(&self, digest: &[u8; 32]) -> WalletResult<schnorr::Signature>;
    fn sign_ecdsa(&self, digest: &[u8; 32]) -> WalletResult<ecdsa::Signature>;
}

/// BIP341 private-key tweak for a key-path-only output (no merkle root).
pub fn tweak_secret_key<C: Signing + Verification>(secp: &Secp256k1<C>, key: &KeyPair) -> WalletResult<SecretKey> {
    let internal = key.x_only_public_key();
    let secret = if key.has_odd_y() { key.secret_key().negate() } else { *key.secret_key() };

    let tweak_hash = TapTweakHash::from_key_and_tweak(internal, None);
    let tweak = Scalar::from_be_bytes(tweak_hash.to_byte_array())
        .map_err(|_| WalletError::InvalidTweak("tweak hash not below curve order".into()))?;
    let tweaked = secret
        .add_tweak(&tweak)
        .map_err(|e| WalletError::InvalidTweak(e.to_string()))?;

    // d'·G must land on the same x as the public-key tweak P + t·G
    let (expected, _) = internal.tap_tweak(secp, None);
    if tweaked.x_only_public_key(secp).0 != expected.to_x_only_public_key() {
        return Err(WalletError::InvalidTweak("tweaked secret does not match taproot output key".into()));
    }
    Ok(tweaked)
}

pub fn verify_schnorr<C: Verification>(
    secp: &Secp256k1<C>,
    signature: &schnorr::Signature,
    digest: &[u8; 32],
    output_key: &XOnlyPublicKey,
) -> bool {
    secp.verify_schnorr(signature, &Message::from_digest(*digest), output_key).is_ok()
}

pub struct HardwareBackedSigner {
    keypair: Keypair,
    secp: Secp256k1<All>,
}

impl HardwareBackedSigner {
    pub fn new(secp: Secp256k1<All>, tweaked: &SecretKey) -> Self {
        Self { keypair: Keypair::from_secret_key(&secp, tweaked), secp }
    }
}

impl Signer for HardwareBackedSigner {
    fn output_key(&self) -> XOnlyPublicKey {
        self.keypair.x_only_public_key().0
    }

    fn sign_schnorr(&self, digest: &[u8; 32]) -> WalletResult<schnorr::Signature> {
        Ok(self.secp.sign_schnorr_no_aux_rand(&Message::from_digest(*digest), &self.keypair))
    }

    fn sign_ecdsa(&self, digest: &[u8; 32]) -> WalletResult<ecdsa::Signature> {
        Ok(self.secp.sign_ecdsa(&Message::from_digest(*digest), &self.keypair.secret_key()))
    }
}

pub struct SoftwareSchnorrSigner {
    schnorr: k256::schnorr::SigningKey,
    ecdsa: k256::ecdsa::SigningKey,
    output_key: XOnlyPublicKey,
}

impl SoftwareSchnorrSigner {
    pub fn from_scalar(scalar: &[u8; 32]) -> WalletResult<Self> {
        let schnorr = k256::schnorr::SigningKey::from_bytes(scalar)
            .map_err(|_| WalletError::Signing("scalar is not a valid secp256k1 key".into()))?;
        let ecdsa = k256::ecdsa::SigningKey::from_slice(scalar)
            .map_err(|_| WalletError::Signing("scalar is not a valid secp256k1 key".into()))?;
        let output_key = XOnlyPublicKey::from_slice(&schnorr.verifying_key().to_bytes())
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        Ok(Self { schnorr, ecdsa, output_key })
    }
}

impl Signer for SoftwareSchnorrSigner {
    fn output_key(&self) -> XOnlyPublicKey {
        self.output_key
    }

    fn sign_schnorr(&self, digest: &[u8; 32]) -> WalletResult<schnorr::Signature> {
        let sig: k256::schnorr::Signature = self
            .schnorr
            .sign_prehash(digest)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        schnorr::Signature::from_slice(&sig.to_bytes()).map_err(|e| WalletError::Signing(e.to_string()))
    }

    fn sign_ecdsa(&self, digest: &[u8; 32]) -> WalletResult<ecdsa::Signature> {
        let sig: k256::ecdsa::Signature = self
            .ecdsa
            .sign_prehash(digest)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        let sig = sig.normalize_s().unwrap_or(sig);
        ecdsa::Signature::from_compact(&sig.to_bytes()).map_err(|e| WalletError::Signing(e.to_string()))
    }
}

impl fmt::Debug for SoftwareSchnorrSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoftwareSchnorrSigner").field("output_key", &self.output_key).finish_non_exhaustive()
    }
}

/// Signer for the wallet's own P2TR output on one network.
///
/// Rebuilt whenever the keypair changes (mnemonic regeneration, network switch).
pub struct TweakedSigner {
    internal_key: XOnlyPublicKey,
    network: Network,
    kind: SignerKind,
    inner: Box<dyn Signer>,
}

/// Tweak `key` for key-path spending and wrap it in the chosen backend.
pub fn tweak_signer(key: &KeyPair, network: Network, kind: SignerKind) -> WalletResult<TweakedSigner> {
    let secp = Secp256k1::new();
    let tweaked = tweak_secret_key(&secp, key)?;
    let internal_key = key.x_only_public_key();
    let (expected, _) = internal_key.tap_tweak(&secp, None);

    let inner: Box<dyn Signer> = match kind {
        SignerKind::HardwareBacked => Box::new(HardwareBackedSigner::new(secp, &tweaked)),
        SignerKind::Software => {
            let scalar = Zeroizing::new(tweaked.secret_bytes());
            Box::new(SoftwareSchnorrSigner::from_scalar(&scalar)?)
        }
    };

    if inner.output_key() != expected.to_x_only_public_key() {
        return Err(WalletError::Signing(format!("{} backend disagrees on output key", kind.as_str())));
    }

    Ok(TweakedSigner { internal_key, network, kind, inner })
}

impl TweakedSigner {
    pub fn internal_key(&self) -> XOnlyPublicKey {
        self.internal_key
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn kind(&self) -> SignerKind {
        self.kind
    }

    /// Own P2TR address; used for change.
    pub fn address(&self) -> Address {
        super::address::p2tr_address(&Secp256k1::verification_only(), self.internal_key, self.network)
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address().script_pubkey()
    }
}

impl Signer for TweakedSigner {
    fn output_key(&self) -> XOnlyPublicKey {
        self.inner.output_key()
    }

    fn sign_schnorr(&self, digest: &[u8; 32]) -> WalletResult<schnorr::Signature> {
        self.inner.sign_schnorr(digest)
    }

    fn sign_ecdsa(&self, digest: &[u8; 32]) -> WalletResult<ecdsa::Signature> {
        self.inner.sign_ecdsa(digest)
    }
}

impl fmt::Debug for TweakedSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweakedSigner")
            .field("internal_key", &self.internal_key)
            .field("output_key", &self.inner.output_key())
            .field("network", &self.network)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{derive_bitcoin_key, Seed};
    use proptest::prelude::*;

    const TEST_MNEMONIC: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn bip86_key() -> KeyPair {
        let secp = Secp256k1::new();
        derive_bitcoin_key(&secp, &Seed::from_mnemonic(TEST_MNEMONIC).unwrap()).unwrap()
    }

    #[test]
    fn test_tweak_matches_library_keypair_tweak() {
        let secp = Secp256k1::new();
        let key = bip86_key();
        // BIP86 vector key has odd y, so this exercises the negation branch
        assert!(key.has_odd_y());
        let ours = tweak_secret_key(&secp, &key).unwrap();
        let (lib, _) = Keypair::from_secret_key(&secp, key.secret_key()).tap_tweak(&secp, None).public_parts();
        assert_eq!(ours.x_only_public_key(&secp).0, lib.to_x_only_public_key());
    }

    #[test]
    fn test_output_key_matches_bip86_address() {
        let signer = tweak_signer(&bip86_key(), Network::Bitcoin, SignerKind::HardwareBacked).unwrap();
        assert_eq!(
            signer.address().to_string(),
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr"
        );
        // BIP86 vector output key
        assert_eq!(
            signer.output_key().to_string(),
            "a60869f0dbcf1dc659c9cecbaf8050135ea9e8cdc487053f1dc6880949dc684c"
        );
    }

    #[test]
    fn test_both_backends_share_output_key() {
        let key = bip86_key();
        let hw = tweak_signer(&key, Network::Regtest, SignerKind::HardwareBacked).unwrap();
        let sw = tweak_signer(&key, Network::Regtest, SignerKind::Software).unwrap();
        assert_eq!(hw.output_key(), sw.output_key());
        assert_eq!(hw.address(), sw.address());
    }

    #[test]
    fn test_ecdsa_interface() {
        let secp = Secp256k1::new();
        let digest = [0x5au8; 32];
        for kind in [SignerKind::HardwareBacked, SignerKind::Software] {
            let signer = tweak_signer(&bip86_key(), Network::Bitcoin, kind).unwrap();
            let sig = signer.sign_ecdsa(&digest).unwrap();
            let tweaked = tweak_secret_key(&secp, &bip86_key()).unwrap();
            let pk = tweaked.public_key(&secp);
            assert!(secp.verify_ecdsa(&Message::from_digest(digest), &sig, &pk).is_ok(), "{:?}", kind);
        }
    }

    #[test]
    fn test_signer_kind_parse() {
        assert_eq!(SignerKind::parse("Software"), Some(SignerKind::Software));
        assert_eq!(SignerKind::parse("native"), Some(SignerKind::HardwareBacked));
        assert_eq!(SignerKind::parse("ledger"), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_tweaked_signatures_verify(secret in any::<[u8; 32]>(), digest in any::<[u8; 32]>()) {
            let secp = Secp256k1::new();
            let Ok(sk) = SecretKey::from_slice(&secret) else { return Ok(()); };
            let key = KeyPair::from_secret_key(&secp, sk);
            let (output_key, _) = key.x_only_public_key().tap_tweak(&secp, None);

            for kind in [SignerKind::HardwareBacked, SignerKind::Software] {
                let signer = tweak_signer(&key, Network::Regtest, kind).unwrap();
                let sig = signer.sign_schnorr(&digest).unwrap();
                prop_assert!(verify_schnorr(&secp, &sig, &digest, &output_key.to_x_only_public_key()));
            }
        }
    }
}
