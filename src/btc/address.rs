//! Address utilities - one derived key, three address encodings.

use crate::config::Network;
use crate::error::{WalletError, WalletResult};
use crate::keys::KeyPair;
use bitcoin::key::CompressedPublicKey;
use bitcoin::secp256k1::{Secp256k1, Verification, XOnlyPublicKey};
use bitcoin::{Address, PublicKey};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitcoinAddresses {
    /// Legacy base58 (1.../m...)
    pub p2pkh: String,
    /// Native segwit v0 (bc1q...)
    pub p2wpkh: String,
    /// Key-path-only taproot (bc1p...)
    pub p2tr: String,
}

/// Drop the parity byte: the form taproot commits to.
pub fn x_only_public_key(key: &KeyPair) -> XOnlyPublicKey {
    key.x_only_public_key()
}

/// P2TR with no script tree. The output key is the BIP341 tweak of
/// `internal_key` with an empty merkle root, matching what the signer applies.
pub fn p2tr_address<C: Verification>(secp: &Secp256k1<C>, internal_key: XOnlyPublicKey, network: Network) -> Address {
    Address::p2tr(secp, internal_key, None, network.to_bitcoin())
}

pub fn derive_addresses<C: Verification>(secp: &Secp256k1<C>, key: &KeyPair, network: Network) -> BitcoinAddresses {
    let net = network.to_bitcoin();
    let compressed = CompressedPublicKey(key.public_key());
    BitcoinAddresses {
        p2pkh: Address::p2pkh(PublicKey::new(key.public_key()).pubkey_hash(), net).to_string(),
        p2wpkh: Address::p2wpkh(&compressed, net).to_string(),
        p2tr: p2tr_address(secp, key.x_only_public_key(), network).to_string(),
    }
}

/// Parse a destination and check it belongs to `network`.
pub fn parse_address(address: &str, network: Network) -> WalletResult<Address> {
    Address::from_str(address.trim())
        .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e)))?
        .require_network(network.to_bitcoin())
        .map_err(|e| WalletError::InvalidAddress(format!("{}: {}", address, e)))
}
