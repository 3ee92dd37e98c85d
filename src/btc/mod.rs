//! Bitcoin - addresses, taproot signing, coin selection, PSBT, send.
//!
//! ```text
//! address ──→ signer ──→ psbt ──→ send
//!                          ▲        │
//!             coin_select ─┘        ▼
//!                               backend (esplora)
//! ```

pub mod address;
pub mod backend;
pub mod coin_select;
pub mod esplora;
pub mod psbt;
pub mod send;
pub mod signer;

pub use address::{derive_addresses, p2tr_address, parse_address, x_only_public_key, BitcoinAddresses};
pub use backend::{estimate_fee_rate, ChainBackend};
pub use coin_select::{select_utxos, FundingPlan, Utxo, DUST_THRESHOLD_SAT};
#[cfg(feature = "http")]
pub use esplora::HttpBackend;
pub use psbt::{ChangeOutcome, SignedTransaction};
pub use send::{BitcoinSender, SendOutcome};
pub use signer::{tweak_signer, HardwareBackedSigner, Signer, SignerKind, SoftwareSchnorrSigner, TweakedSigner};
