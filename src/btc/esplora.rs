//! HTTP backend: Esplora-style indexer for UTXOs, relay for broadcast,
//! bitcoind `estimatesmartfee` (or Esplora `/fee-estimates`) for fees.
//!
//! ```text
//! GET  {esplora}/address/{addr}/utxo   → [{txid, vout, value, status}]
//! POST {rpc}  estimatesmartfee [6]     → {result: {feerate: BTC/kvB}}
//! GET  {esplora}/fee-estimates         → {"6": sat/vB, ...}   (no RPC configured)
//! POST {relay} raw hex | {"tx": hex}   → txid | {"txid": ..}
//! ```

use super::coin_select::{checked_total, Utxo};
use crate::config::RelayFormat;
use crate::error::{SendStage, WalletError, WalletResult};
use bitcoin::consensus::encode::deserialize_hex;
use bitcoin::Transaction;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

/// Confirmation target asked of the fee oracle (blocks).
pub const CONF_TARGET: u16 = 6;

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
}

pub fn parse_utxos(body: &str) -> WalletResult<Vec<Utxo>> {
    let raw: Vec<EsploraUtxo> =
        serde_json::from_str(body).map_err(|e| WalletError::network(SendStage::UtxoFetch, format!("bad UTXO JSON: {}", e)))?;
    let utxos: Vec<Utxo> = raw.into_iter().map(|u| Utxo::new(u.txid, u.vout, u.value)).collect();
    checked_total(&utxos)?;
    Ok(utxos)
}

/// BTC/kvB → sat/vB.
pub fn btc_per_kvb_to_sat_per_vb(feerate: f64) -> f64 {
    feerate * 100_000.0
}

pub fn parse_estimatesmartfee(response: &Value) -> WalletResult<f64> {
    if let Some(err) = response.get("error").filter(|e| !e.is_null()) {
        return Err(WalletError::network(SendStage::FeeEstimate, format!("rpc error: {}", err)));
    }
    let result = &response["result"];
    match result.get("feerate").and_then(Value::as_f64) {
        Some(feerate) => Ok(btc_per_kvb_to_sat_per_vb(feerate)),
        None => {
            let reason = result.get("errors").map(|e| e.to_string()).unwrap_or_else(|| "no feerate".into());
            Err(WalletError::network(SendStage::FeeEstimate, reason))
        }
    }
}

pub fn parse_fee_estimates(response: &Value) -> WalletResult<f64> {
    response
        .get(CONF_TARGET.to_string())
        .and_then(Value::as_f64)
        .ok_or_else(|| WalletError::network(SendStage::FeeEstimate, format!("no estimate for {} blocks", CONF_TARGET)))
}

pub fn relay_body(raw_tx_hex: &str, format: RelayFormat) -> String {
    match format {
        RelayFormat::RawHex => raw_tx_hex.to_string(),
        RelayFormat::Json => json!({ "tx": raw_tx_hex }).to_string(),
    }
}

/// Successful relay bodies are either the bare txid or a small JSON object.
pub fn parse_relay_response(body: &str) -> WalletResult<String> {
    let body = body.trim();
    let txid = if body.starts_with('{') {
        let value: Value =
            serde_json::from_str(body).map_err(|e| WalletError::network(SendStage::Broadcast, e))?;
        value
            .get("txid")
            .or_else(|| value.get("result"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| WalletError::network(SendStage::Broadcast, format!("no txid in relay response: {}", body)))?
    } else {
        body.trim_matches('"').to_string()
    };

    if txid.len() != 64 || !txid.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WalletError::network(SendStage::Broadcast, format!("relay returned non-txid body: {}", body)));
    }
    Ok(txid)
}

/// Txid for a transaction the relay accepted (2xx). Relays that answer with
/// something other than a txid still took the transaction, so the local txid stands in.
pub fn accepted_txid(body: &str, raw_tx_hex: &str) -> WalletResult<String> {
    match parse_relay_response(body) {
        Ok(txid) => Ok(txid),
        Err(e) => {
            let tx: Transaction = deserialize_hex(raw_tx_hex).map_err(|e| WalletError::Transaction(e.to_string()))?;
            let txid = tx.compute_txid().to_string();
            warn!(error = %e, %txid, "relay accepted transaction without a txid, using local txid");
            Ok(txid)
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpBackend;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::btc::backend::ChainBackend;
    use crate::config::Endpoints;
    use async_trait::async_trait;
    use std::time::Duration;
    use tracing::{debug, info};

    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    pub struct HttpBackend {
        client: reqwest::Client,
        endpoints: Endpoints,
    }

    impl HttpBackend {
        pub fn new(endpoints: Endpoints) -> WalletResult<Self> {
            let client = reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .connect_timeout(CONNECT_TIMEOUT)
                .user_agent(concat!("bitmeme-wallet/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| WalletError::Config(format!("http client: {}", e)))?;
            Ok(Self { client, endpoints })
        }

        pub fn endpoints(&self) -> &Endpoints {
            &self.endpoints
        }

        async fn rpc_fee_rate(&self, rpc: &crate::config::RpcConfig) -> WalletResult<f64> {
            let body = json!({
                "jsonrpc": "1.0",
                "id": "bitmeme",
                "method": "estimatesmartfee",
                "params": [CONF_TARGET],
            });
            let mut req = self.client.post(&rpc.url).json(&body);
            if !rpc.user.is_empty() {
                req = req.basic_auth(&rpc.user, Some(&rpc.pass));
            }
            // bitcoind answers RPC-level errors with 500 and a JSON body, so read it either way
            let resp = req.send().await.map_err(|e| WalletError::network(SendStage::FeeEstimate, e))?;
            let value: Value = resp.json().await.map_err(|e| WalletError::network(SendStage::FeeEstimate, e))?;
            parse_estimatesmartfee(&value)
        }

        async fn esplora_fee_rate(&self) -> WalletResult<f64> {
            let url = format!("{}/fee-estimates", self.endpoints.esplora_url.trim_end_matches('/'));
            let resp = self.client.get(&url).send().await.map_err(|e| WalletError::network(SendStage::FeeEstimate, e))?;
            if !resp.status().is_success() {
                return Err(WalletError::network(SendStage::FeeEstimate, format!("{} returned {}", url, resp.status())));
            }
            let value: Value = resp.json().await.map_err(|e| WalletError::network(SendStage::FeeEstimate, e))?;
            parse_fee_estimates(&value)
        }
    }

    #[async_trait]
    impl ChainBackend for HttpBackend {
        async fn fee_rate(&self) -> WalletResult<f64> {
            match &self.endpoints.rpc {
                Some(rpc) => self.rpc_fee_rate(rpc).await,
                None => self.esplora_fee_rate().await,
            }
        }

        async fn utxos(&self, address: &str) -> WalletResult<Vec<Utxo>> {
            let url = self.endpoints.utxo_url(address);
            debug!(%url, "fetching utxos");
            let resp = self.client.get(&url).send().await.map_err(|e| WalletError::network(SendStage::UtxoFetch, e))?;
            let status = resp.status();
            let body = resp.text().await.map_err(|e| WalletError::network(SendStage::UtxoFetch, e))?;
            if !status.is_success() {
                return Err(WalletError::UtxoFetch { status: status.as_u16(), body });
            }
            parse_utxos(&body)
        }

        async fn broadcast(&self, raw_tx_hex: &str) -> WalletResult<String> {
            let relay = &self.endpoints.relay;
            let content_type = match relay.format {
                RelayFormat::RawHex => "text/plain",
                RelayFormat::Json => "application/json",
            };
            let resp = self
                .client
                .post(&relay.url)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(relay_body(raw_tx_hex, relay.format))
                .send()
                .await
                .map_err(|e| WalletError::network(SendStage::Broadcast, e))?;
            let status = resp.status();
            let body = resp.text().await.map_err(|e| WalletError::network(SendStage::Broadcast, e))?;
            if !status.is_success() {
                return Err(WalletError::Broadcast { status: status.as_u16(), body });
            }
            let txid = accepted_txid(&body, raw_tx_hex)?;
            info!(%txid, relay = %relay.url, "relay accepted transaction");
            Ok(txid)
        }
    }
}
