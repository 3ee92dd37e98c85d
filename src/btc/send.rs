//! BitcoinSender - one send at a time, strictly ordered steps.
//!
//! ```text
//! amount >= dust? ── no ──→ DustOutput            (no network)
//! parse destination                                (no network)
//! acquire in-flight flag ── busy ──→ ConcurrentSend
//!   fee rate   (oracle, default on failure)
//!   utxos      (own P2TR address)
//!   select     ── empty ──→ InsufficientFunds
//!   build → sign → finalize → extract
//!   broadcast  → txid
//! release flag (Drop, on every exit path)
//! ```

use super::backend::{estimate_fee_rate, ChainBackend};
use super::coin_select::{checked_total, select_utxos, DEFAULT_OUTPUT_COUNT, DUST_THRESHOLD_SAT};
use super::psbt::{build_signed_transaction, ChangeOutcome};
use super::signer::TweakedSigner;
use crate::error::{WalletError, WalletResult};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a broadcast send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendOutcome {
    pub txid: String,
    pub fee_sat: u64,
    pub fee_rate: f64,
    pub inputs: usize,
    pub change: ChangeOutcome,
}

impl SendOutcome {
    /// Sub-dust change that went to miners; zero when none.
    pub fn dust_donated_sat(&self) -> u64 {
        self.change.donated_sat()
    }
}

/// Holds the in-flight flag; clears it when dropped.
struct SendGuard<'a>(&'a AtomicBool);

impl<'a> SendGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> WalletResult<Self> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| WalletError::ConcurrentSend)?;
        Ok(Self(flag))
    }
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct BitcoinSender {
    signer: Arc<TweakedSigner>,
    backend: Arc<dyn ChainBackend>,
    default_fee_rate: f64,
    in_flight: Arc<AtomicBool>,
}

impl BitcoinSender {
    pub fn new(signer: Arc<TweakedSigner>, backend: Arc<dyn ChainBackend>, default_fee_rate: f64) -> Self {
        Self { signer, backend, default_fee_rate, in_flight: Arc::new(AtomicBool::new(false)) }
    }

    /// Share the in-flight flag with another sender for the same wallet.
    pub fn with_in_flight(mut self, flag: Arc<AtomicBool>) -> Self {
        self.in_flight = flag;
        self
    }

    pub fn is_sending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn address(&self) -> String {
        self.signer.address().to_string()
    }

    /// Sum of currently unspent outputs. Display estimate only.
    pub async fn balance(&self) -> WalletResult<u64> {
        let utxos = self.backend.utxos(&self.address()).await?;
        checked_total(&utxos)
    }

    pub async fn send(&self, to: &str, amount: u64, fee_rate: Option<f64>) -> WalletResult<SendOutcome> {
        if amount < DUST_THRESHOLD_SAT {
            return Err(WalletError::DustOutput { amount, threshold: DUST_THRESHOLD_SAT });
        }
        let destination = super::address::parse_address(to, self.signer.network())?;

        let _guard = SendGuard::acquire(&self.in_flight)?;

        let fee_rate = match fee_rate {
            Some(rate) if rate.is_finite() && rate > 0.0 => rate,
            Some(rate) => return Err(WalletError::Transaction(format!("fee rate must be positive, got {}", rate))),
            None => estimate_fee_rate(self.backend.as_ref(), self.default_fee_rate).await,
        };

        let own = self.signer.address();
        let utxos = self.backend.utxos(&own.to_string()).await?;
        let available = checked_total(&utxos)?;
        let plan = select_utxos(&utxos, amount, fee_rate, DEFAULT_OUTPUT_COUNT);
        if plan.is_empty() {
            return Err(WalletError::InsufficientFunds { needed: amount, available });
        }

        let signed = build_signed_transaction(
            &plan,
            self.signer.as_ref(),
            self.signer.internal_key(),
            &own.script_pubkey(),
            &destination,
            amount,
        )?;

        let txid = self.backend.broadcast(&signed.raw_hex).await?;
        if txid != signed.txid.to_string() {
            warn!(relay_txid = %txid, local_txid = %signed.txid, "relay reported a different txid");
        }
        info!(
            %txid,
            amount,
            fee_sat = signed.fee_sat,
            fee_rate,
            inputs = plan.selected.len(),
            network = self.signer.network().as_str(),
            "bitcoin sent"
        );

        Ok(SendOutcome { txid, fee_sat: signed.fee_sat, fee_rate, inputs: plan.selected.len(), change: signed.change })
    }
}
