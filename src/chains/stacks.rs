//! Stacks wallet - c32check addresses and recoverable ECDSA.
//!
//! Address layout: `S` + c32(version) + c32(hash160(pubkey) || checksum),
//! checksum = sha256d(version || hash160)[..4].

use crate::config::Network;
use crate::keys::KeyPair;
use bitcoin::hashes::{hash160, sha256, sha256d, Hash};
use bitcoin::secp256k1::{Message, Secp256k1};
use zeroize::Zeroizing;

const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

pub const MAINNET_SINGLESIG: u8 = 22;
pub const TESTNET_SINGLESIG: u8 = 26;

const MESSAGE_PREFIX: &[u8] = b"\x17Stacks Signed Message:\n";

/// Crockford-style base32 over a big-endian number; one `0` per leading zero byte.
pub fn c32_encode(data: &[u8]) -> String {
    let mut out = Vec::with_capacity(data.len() * 8 / 5 + 1);
    let mut acc: u16 = 0;
    let mut bits = 0;
    for &byte in data.iter().rev() {
        acc |= (byte as u16) << bits;
        bits += 8;
        while bits >= 5 {
            out.push(C32_ALPHABET[(acc & 0x1f) as usize]);
            acc >>= 5;
            bits -= 5;
        }
    }
    if bits > 0 {
        out.push(C32_ALPHABET[(acc & 0x1f) as usize]);
    }
    while out.last() == Some(&b'0') {
        out.pop();
    }
    out.extend(data.iter().take_while(|b| **b == 0).map(|_| b'0'));
    out.reverse();
    // alphabet is ASCII
    out.into_iter().map(char::from).collect()
}

pub fn c32_address(version: u8, hash160: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(version);
    payload.extend_from_slice(hash160);
    let checksum = sha256d::Hash::hash(&payload).to_byte_array();

    let mut body = hash160.to_vec();
    body.extend_from_slice(&checksum[..4]);
    format!("S{}{}", C32_ALPHABET[(version & 0x1f) as usize] as char, c32_encode(&body))
}

/// Bitcoin-style compact-size length prefix.
fn encode_varint(n: usize, out: &mut Vec<u8>) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        _ => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
    }
}

pub fn message_hash(message: &[u8]) -> [u8; 32] {
    let mut buf = MESSAGE_PREFIX.to_vec();
    encode_varint(message.len(), &mut buf);
    buf.extend_from_slice(message);
    sha256::Hash::hash(&buf).to_byte_array()
}

#[derive(Clone)]
pub struct StacksWallet {
    key: KeyPair,
    network: Network,
}

impl StacksWallet {
    pub fn new(key: KeyPair, network: Network) -> Self {
        Self { key, network }
    }

    pub fn version(&self) -> u8 {
        if self.network.is_mainnet() { MAINNET_SINGLESIG } else { TESTNET_SINGLESIG }
    }

    pub fn address(&self) -> String {
        let hash = hash160::Hash::hash(&self.key.public_key().serialize());
        c32_address(self.version(), &hash.to_byte_array())
    }

    fn sign_digest(&self, digest: [u8; 32]) -> (u8, [u8; 64]) {
        let secp = Secp256k1::signing_only();
        let sig = secp.sign_ecdsa_recoverable(&Message::from_digest(digest), self.key.secret_key());
        let (recid, compact) = sig.serialize_compact();
        (recid.to_i32() as u8, compact)
    }

    /// RSV-encoded signature over the prefixed message hash.
    pub fn sign_message(&self, message: &[u8]) -> [u8; 65] {
        let (recid, compact) = self.sign_digest(message_hash(message));
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&compact);
        out[64] = recid;
        out
    }

    /// VRS-encoded signature over a pre-computed transaction sighash, the
    /// layout single-sig spending conditions carry.
    pub fn sign_transaction(&self, sighash: &[u8; 32]) -> [u8; 65] {
        let (recid, compact) = self.sign_digest(*sighash);
        let mut out = [0u8; 65];
        out[0] = recid;
        out[1..].copy_from_slice(&compact);
        out
    }

    /// Hex secret with the `01` compressed-pubkey marker.
    pub fn export_private_key(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("{}01", hex::encode(self.key.secret_key().secret_bytes())))
    }
}

impl std::fmt::Debug for StacksWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StacksWallet").field("address", &self.address()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{derive_stacks_key, Seed};
    use bitcoin::secp256k1::ecdsa::{RecoverableSignature, RecoveryId};

    fn wallet(mnemonic: &str, network: Network) -> StacksWallet {
        let secp = Secp256k1::new();
        StacksWallet::new(derive_stacks_key(&secp, &Seed::from_mnemonic(mnemonic).unwrap()).unwrap(), network)
    }

    const ABANDON: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    const JUNK: &str = "test test test test test test test test test test test junk";

    #[test]
    fn test_c32_encode() {
        assert_eq!(c32_encode(&[]), "");
        assert_eq!(c32_encode(&[0x00]), "0");
        assert_eq!(c32_encode(&[0x00, 0x00, 0x01]), "001");
        assert_eq!(c32_encode(&[0xff]), "7Z");
        assert_eq!(c32_encode(&[0x01, 0x00]), "80");
    }

    #[test]
    fn test_addresses() {
        assert_eq!(wallet(ABANDON, Network::Bitcoin).address(), "SPC5KHM41H6WHAST7MWWDD807YSPRQKJ69FSH54J");
        assert_eq!(wallet(ABANDON, Network::Testnet).address(), "STC5KHM41H6WHAST7MWWDD807YSPRQKJ68T330BQ");
        assert_eq!(wallet(JUNK, Network::Bitcoin).address(), "SP3N7D4F8TDBNPAN7W6CJ5RGF5DAW5MGHNCM7KHP3");
        assert_eq!(wallet(JUNK, Network::Regtest).address(), "ST3N7D4F8TDBNPAN7W6CJ5RGF5DAW5MGHNEGTCR6R");
    }

    #[test]
    fn test_message_signature_recovers_pubkey() {
        let w = wallet(JUNK, Network::Testnet);
        let sig = w.sign_message(b"gm");
        let recid = RecoveryId::from_i32(sig[64] as i32).unwrap();
        let rec = RecoverableSignature::from_compact(&sig[..64], recid).unwrap();
        let secp = Secp256k1::verification_only();
        let pk = secp.recover_ecdsa(&Message::from_digest(message_hash(b"gm")), &rec).unwrap();
        assert_eq!(pk, w.key.public_key());
    }

    #[test]
    fn test_transaction_signature_is_vrs() {
        let w = wallet(JUNK, Network::Testnet);
        let sighash = [9u8; 32];
        let vrs = w.sign_transaction(&sighash);
        let rec = RecoverableSignature::from_compact(&vrs[1..], RecoveryId::from_i32(vrs[0] as i32).unwrap()).unwrap();
        let secp = Secp256k1::verification_only();
        assert_eq!(secp.recover_ecdsa(&Message::from_digest(sighash), &rec).unwrap(), w.key.public_key());
    }

    #[test]
    fn test_export_has_compression_suffix() {
        let key = wallet(JUNK, Network::Bitcoin).export_private_key();
        assert_eq!(key.len(), 66);
        assert!(key.ends_with("01"));
    }

    #[test]
    fn test_message_hash_prefix() {
        let expected = b"\x17Stacks Signed Message:\n\x02gm";
        assert_eq!(message_hash(b"gm"), sha256::Hash::hash(expected).to_byte_array());
    }
}
