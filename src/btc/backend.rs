//! ChainBackend - the three network calls a send needs.
//!
//! The HTTP implementation lives in `esplora`; tests plug in an in-memory one.

use super::coin_select::Utxo;
use crate::error::WalletResult;
use async_trait::async_trait;
use tracing::{debug, warn};

#[async_trait]
pub trait ChainBackend: Send + Sync {
    /// Current fee-rate estimate in sat/vB.
    async fn fee_rate(&self) -> WalletResult<f64>;

    /// Unspent outputs locked to `address`.
    async fn utxos(&self, address: &str) -> WalletResult<Vec<Utxo>>;

    /// Submit raw transaction hex; returns the txid the relay reports.
    async fn broadcast(&self, raw_tx_hex: &str) -> WalletResult<String>;
}

/// Ask the oracle, falling back to `default_rate` on any failure.
pub async fn estimate_fee_rate(backend: &dyn ChainBackend, default_rate: f64) -> f64 {
    match backend.fee_rate().await {
        Ok(rate) if rate.is_finite() && rate > 0.0 => {
            debug!(rate, "fee rate from oracle");
            rate
        }
        Ok(rate) => {
            warn!(rate, default_rate, "oracle returned unusable fee rate, using default");
            default_rate
        }
        Err(e) => {
            warn!(error = %e, default_rate, "fee estimation failed, using default");
            default_rate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SendStage, WalletError};

    /// `None` simulates an unreachable oracle.
    struct FixedRate(Option<f64>);

    #[async_trait]
    impl ChainBackend for FixedRate {
        async fn fee_rate(&self) -> WalletResult<f64> {
            self.0.ok_or_else(|| WalletError::network(SendStage::FeeEstimate, "connection refused"))
        }
        async fn utxos(&self, _address: &str) -> WalletResult<Vec<Utxo>> {
            Ok(Vec::new())
        }
        async fn broadcast(&self, _raw_tx_hex: &str) -> WalletResult<String> {
            Err(WalletError::Broadcast { status: 400, body: "unused".into() })
        }
    }

    #[tokio::test]
    async fn test_oracle_rate_used() {
        assert_eq!(estimate_fee_rate(&FixedRate(Some(7.25)), 2.0).await, 7.25);
    }

    #[tokio::test]
    async fn test_falls_back_on_error() {
        assert_eq!(estimate_fee_rate(&FixedRate(None), 2.0).await, 2.0);
    }

    #[tokio::test]
    async fn test_falls_back_on_nonsense_rate() {
        assert_eq!(estimate_fee_rate(&FixedRate(Some(0.0)), 2.0).await, 2.0);
        assert_eq!(estimate_fee_rate(&FixedRate(Some(f64::NAN)), 3.0).await, 3.0);
    }
}
