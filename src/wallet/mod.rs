//! Wallet - one mnemonic, one handle per chain.
//!
//! ```text
//! DerivedWalletBundle { network, wallets }
//!     ├── ChainWallet::Bitcoin(BitcoinWallet)   P2TR + tweaked signer
//!     ├── ChainWallet::Solana(SolanaWallet)
//!     ├── ChainWallet::Stacks(StacksWallet)
//!     ├── ChainWallet::Evm(EvmWallet{Ethereum})
//!     └── ChainWallet::Evm(EvmWallet{HyperEvm})
//! ```
//!
//! Bundles are built whole and never mutated. Regeneration or a network
//! switch builds a new bundle.

use crate::btc::address::{derive_addresses, BitcoinAddresses};
use crate::btc::psbt::sign_psbt;
use crate::btc::signer::{tweak_signer, Signer, SignerKind, TweakedSigner};
use crate::chains::{EvmChain, EvmWallet, SolanaWallet, StacksWallet};
use crate::config::Network;
use crate::error::{WalletError, WalletResult};
use crate::keys::{self, KeyPair, Seed};
use bitcoin::hashes::{sha256, Hash};
use bitcoin::psbt::Psbt;
use bitcoin::secp256k1::Secp256k1;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Chain {
    Bitcoin,
    Solana,
    Stacks,
    Ethereum,
    HyperEvm,
}

impl Chain {
    pub const ALL: [Chain; 5] = [Chain::Bitcoin, Chain::Solana, Chain::Stacks, Chain::Ethereum, Chain::HyperEvm];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "bitcoin",
            Chain::Solana => "solana",
            Chain::Stacks => "stacks",
            Chain::Ethereum => "ethereum",
            Chain::HyperEvm => "hyperevm",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "btc" => Some(Chain::Bitcoin),
            "solana" | "sol" => Some(Chain::Solana),
            "stacks" | "stx" => Some(Chain::Stacks),
            "ethereum" | "eth" => Some(Chain::Ethereum),
            "hyperevm" | "hype" => Some(Chain::HyperEvm),
            _ => None,
        }
    }
}

/// Bitcoin handle: addresses for the derived key plus the taproot signer for it.
#[derive(Clone)]
pub struct BitcoinWallet {
    key: KeyPair,
    network: Network,
    addresses: BitcoinAddresses,
    signer: Arc<TweakedSigner>,
}

impl BitcoinWallet {
    pub fn new(key: KeyPair, network: Network, signer_kind: SignerKind) -> WalletResult<Self> {
        let secp = Secp256k1::verification_only();
        let addresses = derive_addresses(&secp, &key, network);
        let signer = Arc::new(tweak_signer(&key, network, signer_kind)?);
        Ok(Self { key, network, addresses, signer })
    }

    /// Taproot receive address.
    pub fn address(&self) -> &str {
        &self.addresses.p2tr
    }

    pub fn addresses(&self) -> &BitcoinAddresses {
        &self.addresses
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn signer(&self) -> Arc<TweakedSigner> {
        self.signer.clone()
    }

    /// BIP340 signature over SHA256(message) with the taproot output key.
    pub fn sign_message(&self, message: &[u8]) -> WalletResult<[u8; 64]> {
        let digest = sha256::Hash::hash(message).to_byte_array();
        Ok(self.signer.sign_schnorr(&digest)?.serialize())
    }

    /// Sign and return a PSBT whose inputs spend our P2TR output.
    pub fn sign_transaction(&self, psbt_bytes: &[u8]) -> WalletResult<Vec<u8>> {
        let mut psbt = Psbt::deserialize(psbt_bytes).map_err(|e| WalletError::Transaction(e.to_string()))?;
        sign_psbt(&mut psbt, self.signer.as_ref())?;
        Ok(psbt.serialize())
    }

    /// WIF of the internal (untweaked) key; `tr(<wif>)` restores the same address.
    pub fn export_private_key(&self) -> Zeroizing<String> {
        let key = bitcoin::PrivateKey::new(*self.key.secret_key(), self.network.to_bitcoin());
        Zeroizing::new(key.to_wif())
    }
}

impl std::fmt::Debug for BitcoinWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitcoinWallet")
            .field("network", &self.network)
            .field("addresses", &self.addresses)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum ChainWallet {
    Bitcoin(BitcoinWallet),
    Solana(SolanaWallet),
    Stacks(StacksWallet),
    Evm(EvmWallet),
}

impl ChainWallet {
    pub fn chain(&self) -> Chain {
        match self {
            ChainWallet::Bitcoin(_) => Chain::Bitcoin,
            ChainWallet::Solana(_) => Chain::Solana,
            ChainWallet::Stacks(_) => Chain::Stacks,
            ChainWallet::Evm(w) => match w.chain() {
                EvmChain::Ethereum => Chain::Ethereum,
                EvmChain::HyperEvm => Chain::HyperEvm,
            },
        }
    }

    pub fn address(&self) -> String {
        match self {
            ChainWallet::Bitcoin(w) => w.address().to_string(),
            ChainWallet::Solana(w) => w.address(),
            ChainWallet::Stacks(w) => w.address(),
            ChainWallet::Evm(w) => w.address(),
        }
    }

    pub fn sign_message(&self, message: &[u8]) -> WalletResult<Vec<u8>> {
        Ok(match self {
            ChainWallet::Bitcoin(w) => w.sign_message(message)?.to_vec(),
            ChainWallet::Solana(w) => w.sign_message(message).to_vec(),
            ChainWallet::Stacks(w) => w.sign_message(message).to_vec(),
            ChainWallet::Evm(w) => w.sign_message(message).to_vec(),
        })
    }

    /// `payload` is chain-specific: PSBT bytes, a Solana message, a 32-byte
    /// Stacks sighash, or an unsigned EVM typed-transaction payload.
    pub fn sign_transaction(&self, payload: &[u8]) -> WalletResult<Vec<u8>> {
        match self {
            ChainWallet::Bitcoin(w) => w.sign_transaction(payload),
            ChainWallet::Solana(w) => Ok(w.sign_transaction(payload).to_vec()),
            ChainWallet::Stacks(w) => {
                let sighash: [u8; 32] = payload
                    .try_into()
                    .map_err(|_| WalletError::Transaction(format!("stacks sighash must be 32 bytes, got {}", payload.len())))?;
                Ok(w.sign_transaction(&sighash).to_vec())
            }
            ChainWallet::Evm(w) => Ok(w.sign_transaction(payload).to_vec()),
        }
    }

    pub fn export_private_key(&self) -> Zeroizing<String> {
        match self {
            ChainWallet::Bitcoin(w) => w.export_private_key(),
            ChainWallet::Solana(w) => w.export_private_key(),
            ChainWallet::Stacks(w) => w.export_private_key(),
            ChainWallet::Evm(w) => w.export_private_key(),
        }
    }
}

/// All chain handles derived from one mnemonic on one network.
#[derive(Debug, Clone)]
pub struct DerivedWalletBundle {
    network: Network,
    wallets: Vec<ChainWallet>,
}

impl DerivedWalletBundle {
    /// Derive every chain in `chains`. Any failure aborts the whole bundle.
    pub fn derive(mnemonic: &str, network: Network, signer: SignerKind, chains: &[Chain]) -> WalletResult<Self> {
        let secp = Secp256k1::new();
        let seed = Seed::from_mnemonic(mnemonic)?;

        let mut wallets = Vec::with_capacity(chains.len());
        let mut seen = Vec::with_capacity(chains.len());
        for &chain in chains {
            if seen.contains(&chain) {
                continue;
            }
            seen.push(chain);
            wallets.push(derive_chain(&secp, &seed, chain, network, signer)?);
        }
        debug!(network = network.as_str(), chains = wallets.len(), "wallet bundle derived");
        Ok(Self { network, wallets })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn wallets(&self) -> &[ChainWallet] {
        &self.wallets
    }

    pub fn get(&self, chain: Chain) -> Option<&ChainWallet> {
        self.wallets.iter().find(|w| w.chain() == chain)
    }

    pub fn bitcoin(&self) -> Option<&BitcoinWallet> {
        self.wallets.iter().find_map(|w| match w {
            ChainWallet::Bitcoin(b) => Some(b),
            _ => None,
        })
    }

    /// `chain name → address`, for display.
    pub fn addresses(&self) -> BTreeMap<&'static str, String> {
        self.wallets.iter().map(|w| (w.chain().as_str(), w.address())).collect()
    }
}

fn derive_chain(
    secp: &Secp256k1<bitcoin::secp256k1::All>,
    seed: &Seed,
    chain: Chain,
    network: Network,
    signer: SignerKind,
) -> WalletResult<ChainWallet> {
    Ok(match chain {
        Chain::Bitcoin => ChainWallet::Bitcoin(BitcoinWallet::new(keys::derive_bitcoin_key(secp, seed)?, network, signer)?),
        Chain::Solana => {
            let secret = keys::derive_solana_key(seed)?;
            ChainWallet::Solana(SolanaWallet::from_secret(&secret))
        }
        Chain::Stacks => ChainWallet::Stacks(StacksWallet::new(keys::derive_stacks_key(secp, seed)?, network)),
        Chain::Ethereum => ChainWallet::Evm(EvmWallet::new(keys::derive_ethereum_key(secp, seed)?, EvmChain::Ethereum)),
        Chain::HyperEvm => ChainWallet::Evm(EvmWallet::new(keys::derive_ethereum_key(secp, seed)?, EvmChain::HyperEvm)),
    })
}
