//! Error taxonomy for derivation, signing and sending.
//!
//! Variants map one-to-one onto what the caller has to do about them:
//! fix the input, top up, check connectivity, or wait and retry.

use std::fmt;
use thiserror::Error;

/// Which I/O step of a send a transport failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStage {
    FeeEstimate,
    UtxoFetch,
    Broadcast,
}

impl SendStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendStage::FeeEstimate => "fee-estimate",
            SendStage::UtxoFetch => "utxo-fetch",
            SendStage::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Key derivation failed: {0}")]
    Derivation(String),

    /// Tweaked scalar was zero or the tweak hash was not below the curve order.
    #[error("Invalid taproot tweak: {0}")]
    InvalidTweak(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Output of {amount} sat is below the {threshold} sat dust threshold")]
    DustOutput { amount: u64, threshold: u64 },

    #[error("Insufficient funds: need {needed} sat plus fee, have {available} sat")]
    InsufficientFunds { needed: u64, available: u64 },

    #[error("UTXO source returned {status}: {body}")]
    UtxoFetch { status: u16, body: String },

    #[error("Relay rejected transaction ({status}): {body}")]
    Broadcast { status: u16, body: String },

    /// Endpoint could not be reached or answered with something unparseable.
    #[error("Network error during {stage}: {message}")]
    Network { stage: SendStage, message: String },

    #[error("A send is already in flight for this wallet")]
    ConcurrentSend,

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transaction construction failed: {0}")]
    Transaction(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WalletError {
    pub fn network(stage: SendStage, message: impl fmt::Display) -> Self {
        WalletError::Network { stage, message: message.to_string() }
    }

    /// True for failures the user can fix by retrying the whole send later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::Network { .. }
                | WalletError::UtxoFetch { .. }
                | WalletError::Broadcast { .. }
                | WalletError::ConcurrentSend
        )
    }
}

pub type WalletResult<T> = Result<T, WalletError>;
