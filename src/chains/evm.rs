//! Ethereum-family wallet: one secp256k1 key, several chain ids.

use crate::error::{WalletError, WalletResult};
use crate::keys::KeyPair;
use bitcoin::secp256k1::{ecdsa::RecoverableSignature, Message, Secp256k1};
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvmChain {
    Ethereum,
    HyperEvm,
}

impl EvmChain {
    pub fn chain_id(&self) -> u64 {
        match self {
            EvmChain::Ethereum => 1,
            EvmChain::HyperEvm => 999,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvmChain::Ethereum => "ethereum",
            EvmChain::HyperEvm => "hyperevm",
        }
    }
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// EIP-55 mixed-case hex.
pub fn to_checksum_address(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// EIP-191 `personal_sign` digest.
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut buf = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    buf.extend_from_slice(message);
    keccak256(&buf)
}

#[derive(Clone)]
pub struct EvmWallet {
    key: KeyPair,
    chain: EvmChain,
}

impl EvmWallet {
    pub fn new(key: KeyPair, chain: EvmChain) -> Self {
        Self { key, chain }
    }

    pub fn chain(&self) -> EvmChain {
        self.chain
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id()
    }

    pub fn address_bytes(&self) -> [u8; 20] {
        let uncompressed = self.key.public_key().serialize_uncompressed();
        let hash = keccak256(&uncompressed[1..]);
        let mut out = [0u8; 20];
        out.copy_from_slice(&hash[12..]);
        out
    }

    pub fn address(&self) -> String {
        to_checksum_address(&self.address_bytes())
    }

    fn sign_digest(&self, digest: [u8; 32]) -> (u8, [u8; 64]) {
        let secp = Secp256k1::signing_only();
        let sig = secp.sign_ecdsa_recoverable(&Message::from_digest(digest), self.key.secret_key());
        let (recid, compact) = sig.serialize_compact();
        (recid.to_i32() as u8, compact)
    }

    /// `r || s || v` with `v` in {27, 28}.
    pub fn sign_message(&self, message: &[u8]) -> [u8; 65] {
        let (recid, compact) = self.sign_digest(personal_message_hash(message));
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&compact);
        out[64] = 27 + recid;
        out
    }

    /// Sign the keccak of an unsigned typed-transaction payload.
    /// Returns `r || s || y_parity`; the caller RLP-encodes the signed envelope.
    pub fn sign_transaction(&self, unsigned_payload: &[u8]) -> [u8; 65] {
        let (recid, compact) = self.sign_digest(keccak256(unsigned_payload));
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&compact);
        out[64] = recid;
        out
    }

    pub fn export_private_key(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.key.secret_key().secret_bytes())))
    }
}

/// Recover the signer address of a `personal_sign` signature.
pub fn recover_message_signer(message: &[u8], signature: &[u8; 65]) -> WalletResult<String> {
    use bitcoin::secp256k1::ecdsa::RecoveryId;

    let v = signature[64];
    let recid = RecoveryId::from_i32(i32::from(v.checked_sub(27).unwrap_or(v)))
        .map_err(|e| WalletError::Signing(e.to_string()))?;
    let sig = RecoverableSignature::from_compact(&signature[..64], recid).map_err(|e| WalletError::Signing(e.to_string()))?;
    let secp = Secp256k1::verification_only();
    let public = secp
        .recover_ecdsa(&Message::from_digest(personal_message_hash(message)), &sig)
        .map_err(|e| WalletError::Signing(e.to_string()))?;
    let hash = keccak256(&public.serialize_uncompressed()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    Ok(to_checksum_address(&address))
}

impl std::fmt::Debug for EvmWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmWallet").field("chain", &self.chain).field("address", &self.address()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{derive_ethereum_key, Seed};

    const TEST_MNEMONIC: &str = "test test test test test test test test test test test junk";

    fn wallet(chain: EvmChain) -> EvmWallet {
        let secp = Secp256k1::new();
        EvmWallet::new(derive_ethereum_key(&secp, &Seed::from_mnemonic(TEST_MNEMONIC).unwrap()).unwrap(), chain)
    }

    #[test]
    fn test_well_known_dev_account() {
        let w = wallet(EvmChain::Ethereum);
        assert_eq!(w.address(), "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert_eq!(
            *w.export_private_key(),
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
        );
    }

    #[test]
    fn test_hyperevm_shares_key() {
        let eth = wallet(EvmChain::Ethereum);
        let hype = wallet(EvmChain::HyperEvm);
        assert_eq!(eth.address(), hype.address());
        assert_eq!(hype.chain_id(), 999);
        assert_eq!(eth.chain_id(), 1);
    }

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_personal_message_hash() {
        assert_eq!(
            hex::encode(personal_message_hash(b"hello bitmeme")),
            "4a080304864ce3088b357c5fcf80641fb34fa805a70a56d0efa81d0a471c7cbc"
        );
    }

    #[test]
    fn test_sign_message_recovers() {
        let w = wallet(EvmChain::Ethereum);
        let sig = w.sign_message(b"hello bitmeme");
        assert!(sig[64] == 27 || sig[64] == 28);
        assert_eq!(recover_message_signer(b"hello bitmeme", &sig).unwrap(), w.address());
        assert_ne!(recover_message_signer(b"hello other", &sig).unwrap(), w.address());
    }

    #[test]
    fn test_transaction_signature_parity() {
        let sig = wallet(EvmChain::HyperEvm).sign_transaction(&[0x02, 0xc0]);
        assert!(sig[64] <= 1);
    }
}
