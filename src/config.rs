//! Session configuration - passed in by the app layer, optionally overlaid from env

use crate::btc::signer::SignerKind;
use crate::error::{WalletError, WalletResult};
use crate::wallet::Chain;

/// Fallback when the fee oracle is unreachable (sat/vB).
pub const DEFAULT_FEE_RATE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    Bitcoin,
    Testnet,
    Signet,
    Regtest,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Bitcoin => "bitcoin",
            Network::Testnet => "testnet",
            Network::Signet => "signet",
            Network::Regtest => "regtest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" | "main" => Some(Network::Bitcoin),
            "testnet" | "testnet4" | "test" => Some(Network::Testnet),
            "signet" => Some(Network::Signet),
            "regtest" => Some(Network::Regtest),
            _ => None,
        }
    }

    pub fn to_bitcoin(&self) -> bitcoin::Network {
        match self {
            Network::Bitcoin => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
            Network::Signet => bitcoin::Network::Signet,
            Network::Regtest => bitcoin::Network::Regtest,
        }
    }

    pub fn is_mainnet(&self) -> bool {
        *self == Network::Bitcoin
    }
}

/// How the relay expects the raw transaction in the POST body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayFormat {
    /// `text/plain` body of raw hex (mempool.space, blockstream.info)
    #[default]
    RawHex,
    /// `{"tx": "<hex>"}`
    Json,
}

impl RelayFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "raw" | "hex" | "rawhex" | "text" => Some(RelayFormat::RawHex),
            "json" => Some(RelayFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub url: String,
    pub format: RelayFormat,
}

/// Bitcoin Core RPC used as the `estimatesmartfee` oracle
#[derive(Clone, PartialEq, Eq)]
pub struct RpcConfig {
    pub url: String,
    pub user: String,
    pub pass: String,
}

impl std::fmt::Debug for RpcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcConfig").field("url", &self.url).field("user", &self.user).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Esplora-style API base, e.g. `https://mempool.space/testnet4/api`
    pub esplora_url: String,
    pub relay: RelayConfig,
    pub rpc: Option<RpcConfig>,
}

impl Endpoints {
    pub fn for_network(network: Network) -> Self {
        let (esplora_url, relay_url) = match network {
            Network::Bitcoin => ("https://mempool.space/api", "https://blockstream.info/api/tx"),
            Network::Testnet => ("https://mempool.space/testnet4/api", "https://mempool.space/testnet4/api/tx"),
            Network::Signet => ("https://mempool.space/signet/api", "https://mempool.space/signet/api/tx"),
            Network::Regtest => ("http://127.0.0.1:3002/api", "http://127.0.0.1:3002/api/tx"),
        };
        Self {
            esplora_url: esplora_url.into(),
            relay: RelayConfig { url: relay_url.into(), format: RelayFormat::RawHex },
            rpc: None,
        }
    }

    pub fn utxo_url(&self, address: &str) -> String {
        format!("{}/address/{}/utxo", self.esplora_url.trim_end_matches('/'), address)
    }
}

/// Wallet session configuration. The app layer constructs this.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub network: Network,
    pub endpoints: Endpoints,
    pub signer: SignerKind,
    pub default_fee_rate: f64,
    pub chains: Vec<Chain>,
}

impl Default for SessionConfig {
    fn default() -> Self { Self::new(Network::default()) }
}

impl SessionConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            endpoints: Endpoints::for_network(network),
            signer: SignerKind::default(),
            default_fee_rate: DEFAULT_FEE_RATE,
            chains: Chain::ALL.to_vec(),
        }
    }

    pub fn mainnet() -> Self { Self::new(Network::Bitcoin) }
    pub fn testnet() -> Self { Self::new(Network::Testnet) }
    pub fn regtest() -> Self { Self::new(Network::Regtest) }

    /// Switch network and reset endpoints to that network's defaults.
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self.endpoints = Endpoints::for_network(network);
        self
    }
    pub fn with_esplora(mut self, url: impl Into<String>) -> Self { self.endpoints.esplora_url = url.into(); self }
    pub fn with_relay(mut self, url: impl Into<String>, format: RelayFormat) -> Self {
        self.endpoints.relay = RelayConfig { url: url.into(), format };
        self
    }
    pub fn with_rpc(mut self, url: impl Into<String>, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.endpoints.rpc = Some(RpcConfig { url: url.into(), user: user.into(), pass: pass.into() });
        self
    }
    pub fn with_signer(mut self, kind: SignerKind) -> Self { self.signer = kind; self }
    pub fn with_default_fee_rate(mut self, rate: f64) -> Self { self.default_fee_rate = rate; self }
    pub fn with_chains(mut self, chains: Vec<Chain>) -> Self { self.chains = chains; self }

    /// Overlay `BITMEME_*` environment variables on top of `self`.
    pub fn from_env(self) -> WalletResult<Self> {
        self.overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, var: impl Fn(&str) -> Option<String>) -> WalletResult<Self> {
        if let Some(value) = var("BITMEME_NETWORK") {
            let network = Network::parse(&value)
                .ok_or_else(|| WalletError::Config(format!("unknown network '{}'", value)))?;
            self = self.with_network(network);
        }
        if let Some(url) = var("BITMEME_ESPLORA_URL") {
            self.endpoints.esplora_url = url;
        }
        if let Some(url) = var("BITMEME_RELAY_URL") {
            self.endpoints.relay.url = url;
        }
        if let Some(value) = var("BITMEME_RELAY_FORMAT") {
            self.endpoints.relay.format = RelayFormat::parse(&value)
                .ok_or_else(|| WalletError::Config(format!("unknown relay format '{}'", value)))?;
        }
        if let Some(url) = var("BITMEME_RPC_URL") {
            self.endpoints.rpc = Some(RpcConfig {
                url,
                user: var("BITMEME_RPC_USER").unwrap_or_default(),
                pass: var("BITMEME_RPC_PASS").unwrap_or_default(),
            });
        }
        if let Some(value) = var("BITMEME_SIGNER") {
            self.signer = SignerKind::parse(&value)
                .ok_or_else(|| WalletError::Config(format!("unknown signer '{}'", value)))?;
        }
        if let Some(value) = var("BITMEME_FEE_RATE") {
            let rate: f64 = value
                .parse()
                .map_err(|_| WalletError::Config(format!("bad fee rate '{}'", value)))?;
            if !(rate.is_finite() && rate > 0.0) {
                return Err(WalletError::Config(format!("fee rate must be positive, got {}", rate)));
            }
            self.default_fee_rate = rate;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_network_parse() {
        assert_eq!(Network::parse("mainnet"), Some(Network::Bitcoin));
        assert_eq!(Network::parse(" Testnet4 "), Some(Network::Testnet));
        assert_eq!(Network::parse("regtest"), Some(Network::Regtest));
        assert_eq!(Network::parse("litecoin"), None);
    }

    #[test]
    fn test_default_endpoints() {
        let e = Endpoints::for_network(Network::Testnet);
        assert_eq!(e.utxo_url("tb1pabc"), "https://mempool.space/testnet4/api/address/tb1pabc/utxo");
        assert_eq!(e.relay.url, "https://mempool.space/testnet4/api/tx");
        assert_eq!(Endpoints::for_network(Network::Bitcoin).relay.url, "https://blockstream.info/api/tx");
    }

    #[test]
    fn test_env_overlay() {
        let config = SessionConfig::default()
            .overlay(env(&[
                ("BITMEME_NETWORK", "regtest"),
                ("BITMEME_RELAY_URL", "http://relay.local/tx"),
                ("BITMEME_RELAY_FORMAT", "json"),
                ("BITMEME_RPC_URL", "http://127.0.0.1:18443"),
                ("BITMEME_RPC_USER", "polaruser"),
                ("BITMEME_SIGNER", "software"),
                ("BITMEME_FEE_RATE", "5.5"),
            ]))
            .unwrap();
        assert_eq!(config.network, Network::Regtest);
        assert_eq!(config.endpoints.esplora_url, "http://127.0.0.1:3002/api");
        assert_eq!(config.endpoints.relay, RelayConfig { url: "http://relay.local/tx".into(), format: RelayFormat::Json });
        let rpc = config.endpoints.rpc.unwrap();
        assert_eq!(rpc.user, "polaruser");
        assert_eq!(rpc.pass, "");
        assert_eq!(config.signer, SignerKind::Software);
        assert_eq!(config.default_fee_rate, 5.5);
    }

    #[test]
    fn test_env_overlay_rejects_garbage() {
        assert!(SessionConfig::default().overlay(env(&[("BITMEME_NETWORK", "dogecoin")])).is_err());
        assert!(SessionConfig::default().overlay(env(&[("BITMEME_FEE_RATE", "-1")])).is_err());
        assert!(SessionConfig::default().overlay(env(&[("BITMEME_SIGNER", "yubikey")])).is_err());
    }

    #[test]
    fn test_rpc_debug_hides_password() {
        let rpc = RpcConfig { url: "http://x".into(), user: "u".into(), pass: "hunter2".into() };
        assert!(!format!("{:?}", rpc).contains("hunter2"));
    }
}
