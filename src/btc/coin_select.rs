//! Greedy, fee-aware coin selection.
//!
//! Inputs are taken in the caller's order until
//! `accumulated >= amount + ceil(rate * vsize)`, with the size estimate
//! recomputed after every input. No I/O here; see `backend` for the oracle.

use crate::error::{SendStage, WalletError, WalletResult};
use bitcoin::Amount;
use serde::{Deserialize, Serialize};

/// Minimum P2TR output value (sat).
pub const DUST_THRESHOLD_SAT: u64 = 330;

/// Destination + change.
pub const DEFAULT_OUTPUT_COUNT: usize = 2;

const INPUT_VBYTES: u64 = 58;
const OUTPUT_VBYTES: u64 = 43;
const OVERHEAD_VBYTES: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub transaction_id: String,
    pub output_index: u32,
    pub satoshis: u64,
}

impl Utxo {
    pub fn new(transaction_id: impl Into<String>, output_index: u32, satoshis: u64) -> Self {
        Self { transaction_id: transaction_id.into(), output_index, satoshis }
    }
}

/// Result of selection. Empty `selected` means the set could not cover the amount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FundingPlan {
    pub selected: Vec<Utxo>,
    pub fee_sat: u64,
}

impl FundingPlan {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// `None` if the selected values do not fit in a u64.
    pub fn input_sum(&self) -> Option<u64> {
        total_sat(&self.selected)
    }
}

pub fn total_sat(utxos: &[Utxo]) -> Option<u64> {
    utxos.iter().try_fold(0u64, |acc, u| acc.checked_add(u.satoshis))
}

/// Total of a UTXO set from an indexer. Values above the 21M BTC supply, or a
/// total that overflows, mean the source is broken.
pub fn checked_total(utxos: &[Utxo]) -> WalletResult<u64> {
    let max = Amount::MAX_MONEY.to_sat();
    if let Some(bad) = utxos.iter().find(|u| u.satoshis > max) {
        return Err(WalletError::network(
            SendStage::UtxoFetch,
            format!("utxo {}:{} claims {} sat", bad.transaction_id, bad.output_index, bad.satoshis),
        ));
    }
    total_sat(utxos).ok_or_else(|| WalletError::network(SendStage::UtxoFetch, "utxo total overflows"))
}

pub fn estimate_vsize(inputs: usize, outputs: usize) -> u64 {
    inputs as u64 * INPUT_VBYTES + outputs as u64 * OUTPUT_VBYTES + OVERHEAD_VBYTES
}

pub fn fee_for(fee_rate: f64, inputs: usize, outputs: usize) -> u64 {
    (fee_rate * estimate_vsize(inputs, outputs) as f64).ceil() as u64
}

/// Take UTXOs in order until `amount + fee` is covered.
///
/// `fee_sat` is the fee at the point of the last input considered, so a failed
/// selection still reports what the whole set would have cost.
pub fn select_utxos(utxos: &[Utxo], amount: u64, fee_rate: f64, output_count: usize) -> FundingPlan {
    let mut selected = Vec::new();
    let mut accumulated = 0u64;
    let mut fee = 0u64;

    for utxo in utxos {
        selected.push(utxo.clone());
        accumulated = accumulated.saturating_add(utxo.satoshis);
        fee = fee_for(fee_rate, selected.len(), output_count);
        if accumulated >= amount.saturating_add(fee) {
            return FundingPlan { selected, fee_sat: fee };
        }
    }

    FundingPlan { selected: Vec::new(), fee_sat: fee }
}
