//! PSBT pipeline for key-path P2TR spends.
//!
//! ```text
//! FundingPlan + destination
//!     │ build_psbt      inputs commit witness_utxo + tap_internal_key
//!     ▼                 outputs: destination, change if >= dust
//! Psbt (unsigned)
//!     │ sign_psbt       BIP341 sighash (SIGHASH_DEFAULT) per input, Schnorr via TweakedSigner
//!     │ finalize_psbt   witness = [sig]
//!     │ extract_tx      the only serialization path
//!     ▼
//! SignedTransaction { raw_hex, txid, fee_sat, change }
//! ```

use super::coin_select::{FundingPlan, DUST_THRESHOLD_SAT};
use super::signer::Signer;
use crate::error::{WalletError, WalletResult};
use bitcoin::consensus::encode::serialize_hex;
use bitcoin::hashes::Hash;
use bitcoin::key::TweakedPublicKey;
use bitcoin::psbt::{self, Psbt};
use bitcoin::secp256k1::{Message, Secp256k1, XOnlyPublicKey};
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::{
    absolute, taproot, transaction, Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness,
};
use serde::Serialize;
use std::str::FromStr;
use tracing::{debug, warn};

/// What happened to `inputs - amount - fee`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "sat", rename_all = "snake_case")]
pub enum ChangeOutcome {
    /// Exact spend.
    None,
    /// Paid back to our own P2TR address.
    Output(u64),
    /// Below dust; folded into the fee.
    Donated(u64),
}

impl ChangeOutcome {
    pub fn from_remainder(change: u64) -> Self {
        match change {
            0 => ChangeOutcome::None,
            c if c >= DUST_THRESHOLD_SAT => ChangeOutcome::Output(c),
            c => ChangeOutcome::Donated(c),
        }
    }

    pub fn output_sat(&self) -> u64 {
        match self {
            ChangeOutcome::Output(c) => *c,
            _ => 0,
        }
    }

    pub fn donated_sat(&self) -> u64 {
        match self {
            ChangeOutcome::Donated(c) => *c,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnsignedSpend {
    pub psbt: Psbt,
    /// Fee actually paid, including any donated change.
    pub fee_sat: u64,
    pub change: ChangeOutcome,
}

#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub raw_hex: String,
    pub txid: Txid,
    pub fee_sat: u64,
    pub change: ChangeOutcome,
}

/// Assemble the unsigned PSBT spending `plan` from our own P2TR output.
pub fn build_psbt(
    plan: &FundingPlan,
    internal_key: XOnlyPublicKey,
    own_script: &ScriptBuf,
    to: &Address,
    amount: u64,
) -> WalletResult<UnsignedSpend> {
    if plan.is_empty() {
        return Err(WalletError::Transaction("funding plan has no inputs".into()));
    }
    let input_sum = plan
        .input_sum()
        .ok_or_else(|| WalletError::Transaction("selected input values overflow".into()))?;
    let remainder = input_sum
        .checked_sub(amount)
        .and_then(|r| r.checked_sub(plan.fee_sat))
        .ok_or_else(|| {
            WalletError::Transaction(format!(
                "inputs {} do not cover amount {} + fee {}",
                input_sum, amount, plan.fee_sat
            ))
        })?;
    let change = ChangeOutcome::from_remainder(remainder);

    let input = plan
        .selected
        .iter()
        .map(|utxo| {
            let txid = Txid::from_str(&utxo.transaction_id)
                .map_err(|e| WalletError::Transaction(format!("bad txid {}: {}", utxo.transaction_id, e)))?;
            Ok(TxIn {
                previous_output: OutPoint::new(txid, utxo.output_index),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
                witness: Witness::new(),
            })
        })
        .collect::<WalletResult<Vec<_>>>()?;

    let mut output = vec![TxOut { value: Amount::from_sat(amount), script_pubkey: to.script_pubkey() }];
    if let ChangeOutcome::Output(sat) = change {
        output.push(TxOut { value: Amount::from_sat(sat), script_pubkey: own_script.clone() });
    }

    let unsigned_tx = Transaction {
        version: transaction::Version::TWO,
        lock_time: absolute::LockTime::ZERO,
        input,
        output,
    };
    let mut psbt = Psbt::from_unsigned_tx(unsigned_tx).map_err(|e| WalletError::Transaction(e.to_string()))?;

    for (psbt_input, utxo) in psbt.inputs.iter_mut().zip(&plan.selected) {
        *psbt_input = psbt::Input {
            witness_utxo: Some(TxOut { value: Amount::from_sat(utxo.satoshis), script_pubkey: own_script.clone() }),
            tap_internal_key: Some(internal_key),
            ..Default::default()
        };
    }

    let fee_sat = input_sum - amount - change.output_sat();
    if let ChangeOutcome::Donated(sat) = change {
        warn!(change_sat = sat, fee_sat, threshold = DUST_THRESHOLD_SAT, "change below dust, adding it to the fee");
    }
    Ok(UnsignedSpend { psbt, fee_sat, change })
}

/// Key-path sign every input. Each input must be locked to the signer's output key.
pub fn sign_psbt(psbt: &mut Psbt, signer: &dyn Signer) -> WalletResult<()> {
    let secp = Secp256k1::verification_only();
    let output_key = signer.output_key();
    let expected_script = ScriptBuf::new_p2tr_tweaked(TweakedPublicKey::dangerous_assume_tweaked(output_key));

    let prevouts = psbt
        .inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let utxo = input
                .witness_utxo
                .clone()
                .ok_or_else(|| WalletError::Signing(format!("input {} has no witness_utxo", i)))?;
            if utxo.script_pubkey != expected_script {
                return Err(WalletError::Signing(format!("input {} is not locked to our output key", i)));
            }
            Ok(utxo)
        })
        .collect::<WalletResult<Vec<TxOut>>>()?;

    let mut cache = SighashCache::new(&psbt.unsigned_tx);
    for (i, input) in psbt.inputs.iter_mut().enumerate() {
        let sighash = cache
            .taproot_key_spend_signature_hash(i, &Prevouts::All(&prevouts), TapSighashType::Default)
            .map_err(|e| WalletError::Signing(e.to_string()))?;
        let digest = sighash.to_byte_array();
        let signature = signer.sign_schnorr(&digest)?;
        secp.verify_schnorr(&signature, &Message::from_digest(digest), &output_key)
            .map_err(|e| WalletError::Signing(format!("input {} signature does not verify: {}", i, e)))?;
        input.tap_key_sig = Some(taproot::Signature { signature, sighash_type: TapSighashType::Default });
    }
    debug!(inputs = psbt.inputs.len(), "psbt signed");
    Ok(())
}

/// Move each key-path signature into the final witness and drop the signing metadata.
pub fn finalize_psbt(psbt: &mut Psbt) -> WalletResult<()> {
    for (i, input) in psbt.inputs.iter_mut().enumerate() {
        let sig = input
            .tap_key_sig
            .take()
            .ok_or_else(|| WalletError::Transaction(format!("input {} is not signed", i)))?;
        input.final_script_witness = Some(Witness::p2tr_key_spend(&sig));
        input.tap_internal_key = None;
        input.tap_merkle_root = None;
        input.tap_key_origins.clear();
    }
    Ok(())
}

pub fn extract_tx(psbt: Psbt) -> WalletResult<Transaction> {
    psbt.extract_tx().map_err(|e| WalletError::Transaction(e.to_string()))
}

/// build → sign → finalize → extract.
pub fn build_signed_transaction(
    plan: &FundingPlan,
    signer: &dyn Signer,
    internal_key: XOnlyPublicKey,
    own_script: &ScriptBuf,
    to: &Address,
    amount: u64,
) -> WalletResult<SignedTransaction> {
    let UnsignedSpend { mut psbt, fee_sat, change } = build_psbt(plan, internal_key, own_script, to, amount)?;
    sign_psbt(&mut psbt, signer)?;
    finalize_psbt(&mut psbt)?;
    let tx = extract_tx(psbt)?;
    Ok(SignedTransaction { raw_hex: serialize_hex(&tx), txid: tx.compute_txid(), tx, fee_sat, change })
}
