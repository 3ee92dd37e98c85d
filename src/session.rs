//! WalletSession - the explicit owner of mnemonic, config and derived bundle.
//!
//! ```text
//! WalletSession
//!   ├── state: RwLock<Arc<SessionState>>   swapped whole on regenerate / switch_network
//!   │      ├── mnemonic (zeroized)
//!   │      ├── config
//!   │      ├── bundle: Arc<DerivedWalletBundle>
//!   │      └── backend: Arc<dyn ChainBackend>
//!   └── in_flight: Arc<AtomicBool>         shared by every sender this session hands out
//! ```
//!
//! Readers clone the `Arc` and never observe a half-built bundle.

use crate::btc::backend::{estimate_fee_rate, ChainBackend};
use crate::btc::coin_select::Utxo;
use crate::btc::send::{BitcoinSender, SendOutcome};
use crate::config::{Network, SessionConfig};
use crate::error::{WalletError, WalletResult};
use crate::keys::generate_mnemonic;
use crate::wallet::DerivedWalletBundle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};
use tracing::info;
use zeroize::Zeroizing;

#[derive(Clone)]
enum BackendSource {
    /// Rebuilt from `config.endpoints` whenever the config changes.
    #[cfg(feature = "http")]
    Http,
    Custom(Arc<dyn ChainBackend>),
}

impl BackendSource {
    #[cfg_attr(not(feature = "http"), allow(unused_variables))]
    fn build(&self, config: &SessionConfig) -> WalletResult<Arc<dyn ChainBackend>> {
        match self {
            #[cfg(feature = "http")]
            BackendSource::Http => Ok(Arc::new(crate::btc::esplora::HttpBackend::new(config.endpoints.clone())?)),
            BackendSource::Custom(backend) => Ok(backend.clone()),
        }
    }
}

struct SessionState {
    mnemonic: Zeroizing<String>,
    config: SessionConfig,
    bundle: Arc<DerivedWalletBundle>,
    backend: Arc<dyn ChainBackend>,
}

impl SessionState {
    fn build(mnemonic: Zeroizing<String>, config: SessionConfig, source: &BackendSource) -> WalletResult<Self> {
        let bundle = DerivedWalletBundle::derive(&mnemonic, config.network, config.signer, &config.chains)?;
        let backend = source.build(&config)?;
        Ok(Self { mnemonic, config, bundle: Arc::new(bundle), backend })
    }
}

pub struct WalletSession {
    state: RwLock<Arc<SessionState>>,
    source: BackendSource,
    in_flight: Arc<AtomicBool>,
}

impl WalletSession {
    /// Open against the HTTP endpoints in `config`.
    #[cfg(feature = "http")]
    pub fn open(mnemonic: &str, config: SessionConfig) -> WalletResult<Self> {
        Self::from_source(mnemonic, config, BackendSource::Http)
    }

    /// Open with a caller-supplied backend (tests, alternative indexers).
    pub fn with_backend(mnemonic: &str, config: SessionConfig, backend: Arc<dyn ChainBackend>) -> WalletResult<Self> {
        Self::from_source(mnemonic, config, BackendSource::Custom(backend))
    }

    fn from_source(mnemonic: &str, config: SessionConfig, source: BackendSource) -> WalletResult<Self> {
        let state = SessionState::build(Zeroizing::new(mnemonic.trim().to_string()), config, &source)?;
        info!(network = state.config.network.as_str(), chains = state.bundle.wallets().len(), "wallet session opened");
        Ok(Self { state: RwLock::new(Arc::new(state)), source, in_flight: Arc::new(AtomicBool::new(false)) })
    }

    fn current(&self) -> Arc<SessionState> {
        // A poisoned lock still holds a complete state: writers only swap the Arc.
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn replace(&self, next: SessionState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(next);
    }

    pub fn bundle(&self) -> Arc<DerivedWalletBundle> {
        self.current().bundle.clone()
    }

    pub fn config(&self) -> SessionConfig {
        self.current().config.clone()
    }

    pub fn network(&self) -> Network {
        self.current().config.network
    }

    /// For the app layer to persist in secure storage.
    pub fn mnemonic(&self) -> Zeroizing<String> {
        self.current().mnemonic.clone()
    }

    /// Replace the mnemonic with a fresh one. Funds on the old keys are not moved.
    pub fn regenerate(&self, words: usize) -> WalletResult<Zeroizing<String>> {
        let mnemonic = generate_mnemonic(words)?;
        self.replace_mnemonic(&mnemonic)?;
        Ok(mnemonic)
    }

    pub fn replace_mnemonic(&self, mnemonic: &str) -> WalletResult<()> {
        let config = self.current().config.clone();
        let next = SessionState::build(Zeroizing::new(mnemonic.trim().to_string()), config, &self.source)?;
        self.replace(next);
        info!("wallet bundle regenerated");
        Ok(())
    }

    /// Rebuild every handle for `network`, with that network's default endpoints.
    pub fn switch_network(&self, network: Network) -> WalletResult<()> {
        let current = self.current();
        let config = current.config.clone().with_network(network);
        let next = SessionState::build(current.mnemonic.clone(), config, &self.source)?;
        self.replace(next);
        info!(network = network.as_str(), "network switched");
        Ok(())
    }

    /// Sender bound to the current bundle, sharing this session's in-flight flag.
    pub fn bitcoin_sender(&self) -> WalletResult<BitcoinSender> {
        let state = self.current();
        let bitcoin = state.bundle.bitcoin().ok_or_else(bitcoin_disabled)?;
        Ok(BitcoinSender::new(bitcoin.signer(), state.backend.clone(), state.config.default_fee_rate)
            .with_in_flight(self.in_flight.clone()))
    }

    pub async fn send_bitcoin(&self, to: &str, amount: u64, fee_rate: Option<f64>) -> WalletResult<SendOutcome> {
        self.bitcoin_sender()?.send(to, amount, fee_rate).await
    }

    pub async fn bitcoin_balance(&self) -> WalletResult<u64> {
        self.bitcoin_sender()?.balance().await
    }

    pub async fn bitcoin_utxos(&self) -> WalletResult<Vec<Utxo>> {
        let state = self.current();
        let bitcoin = state.bundle.bitcoin().ok_or_else(bitcoin_disabled)?;
        state.backend.utxos(bitcoin.address()).await
    }

    /// Oracle estimate, or the configured default if the oracle fails.
    pub async fn fee_rate(&self) -> f64 {
        let state = self.current();
        estimate_fee_rate(state.backend.as_ref(), state.config.default_fee_rate).await
    }
}

fn bitcoin_disabled() -> WalletError {
    WalletError::Config("bitcoin is not enabled for this session".into())
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.current();
        f.debug_struct("WalletSession")
            .field("network", &state.config.network)
            .field("bundle", &state.bundle)
            .finish_non_exhaustive()
    }
}
