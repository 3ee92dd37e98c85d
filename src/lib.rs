//! BitMeme wallet core: one mnemonic, per-chain keys, hand-built Taproot sends.
//!
//! # Architecture
//!
//! ```text
//! WalletSession (explicit owner, no ambient state)
//!   │
//!   ├── DerivedWalletBundle (rebuilt whole on regenerate / network switch)
//!   │     ├── Bitcoin   m/86'/0'/0'/0/0    P2TR / P2WPKH / P2PKH, TweakedSigner
//!   │     ├── Solana    m/44'/501'/0'/0'   SLIP-0010 ed25519
//!   │     ├── Stacks    m/44'/5757'/0'/0/0 c32check
//!   │     └── Ethereum / HyperEVM  m/44'/60'/0'/0/0
//!   │
//!   └── BitcoinSender
//!         fee rate → utxos → select → PSBT → sign → finalize → broadcast
//!                         │                                     │
//!                         └──────── ChainBackend (esplora) ─────┘
//! ```
//!
//! # Features
//!
//! - `http` (default) - reqwest-based [`btc::esplora::HttpBackend`] and the CLI
//!
//! # Usage
//!
//! ```ignore
//! use bitmeme_wallet::{SessionConfig, WalletSession, Chain};
//!
//! let session = WalletSession::open("test test ... junk", SessionConfig::testnet())?;
//! let bundle = session.bundle();
//! println!("{}", bundle.get(Chain::Bitcoin).unwrap().address());
//!
//! let outcome = session.send_bitcoin("tb1p...", 10_000, None).await?;
//! println!("{} (fee {} sat)", outcome.txid, outcome.fee_sat);
//! ```

pub mod btc;
pub mod chains;
pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod session;
pub mod wallet;

// =============================================================================
// Re-exports
// =============================================================================
pub use btc::{
    BitcoinAddresses, BitcoinSender, ChainBackend, ChangeOutcome, FundingPlan, SendOutcome, Signer, SignerKind,
    TweakedSigner, Utxo, DUST_THRESHOLD_SAT,
};
#[cfg(feature = "http")]
pub use btc::HttpBackend;
pub use config::{Endpoints, Network, RelayConfig, RelayFormat, RpcConfig, SessionConfig, DEFAULT_FEE_RATE};
pub use error::{SendStage, WalletError, WalletResult};
pub use keys::{generate_mnemonic, parse_mnemonic, KeyPair, Seed};
pub use session::WalletSession;
pub use wallet::{BitcoinWallet, Chain, ChainWallet, DerivedWalletBundle};
