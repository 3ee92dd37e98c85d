//! Non-Bitcoin chain handles. Address + sign + export only; no transaction building.

pub mod evm;
pub mod solana;
pub mod stacks;

pub use evm::{EvmChain, EvmWallet};
pub use solana::SolanaWallet;
pub use stacks::StacksWallet;
