//! Derivation and session tests - golden values across every chain
//!
//! These tests verify:
//! 1. Well-known mnemonics derive the addresses other wallets derive
//! 2. Derivation is deterministic for any valid mnemonic
//! 3. Network switch and regeneration replace the whole bundle
//! 4. Invalid input never leaves a partial bundle behind

use async_trait::async_trait;
use bitmeme_wallet::{
    Chain, ChainBackend, ChainWallet, DerivedWalletBundle, Network, SessionConfig, SignerKind, Utxo,
    WalletError, WalletResult, WalletSession,
};
use once_cell::sync::Lazy;
use proptest::prelude::*;
use std::sync::Arc;

const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const JUNK: &str = "test test test test test test test test test test test junk";

static JUNK_REGTEST: Lazy<DerivedWalletBundle> =
    Lazy::new(|| DerivedWalletBundle::derive(JUNK, Network::Regtest, SignerKind::default(), &Chain::ALL).unwrap());

/// Backend that is never reached by these tests.
struct Offline;

#[async_trait]
impl ChainBackend for Offline {
    async fn fee_rate(&self) -> WalletResult<f64> {
        Err(WalletError::Config("offline".into()))
    }
    async fn utxos(&self, _address: &str) -> WalletResult<Vec<Utxo>> {
        Err(WalletError::Config("offline".into()))
    }
    async fn broadcast(&self, _raw_tx_hex: &str) -> WalletResult<String> {
        Err(WalletError::Config("offline".into()))
    }
}

fn session(mnemonic: &str, config: SessionConfig) -> WalletSession {
    WalletSession::with_backend(mnemonic, config, Arc::new(Offline)).unwrap()
}

/// Test: "test ... junk" on regtest - the fixed regression address
#[test]
fn junk_regtest_golden_addresses() {
    let addrs = JUNK_REGTEST.addresses();
    assert_eq!(addrs["bitcoin"], "bcrt1pfzhx49qe6s5exppe5hqljg3n6587xk0w75xqr70pgdt7ygnfkssqu3wy22");
    assert_eq!(addrs["ethereum"], "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    assert_eq!(addrs["hyperevm"], "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    assert_eq!(addrs["solana"], "oeYf6KAJkLYhBuR8CiGc6L4D4Xtfepr85fuDgA9kq96");
    assert_eq!(addrs["stacks"], "ST3N7D4F8TDBNPAN7W6CJ5RGF5DAW5MGHNEGTCR6R");

    let btc = JUNK_REGTEST.bitcoin().unwrap().addresses();
    assert_eq!(btc.p2wpkh, "bcrt1qnwf4z957qm4jhj20aeclafakvn40kpgj9xyc9j");
    assert_eq!(btc.p2pkh, "muhZWXzDMDvoy8XuKyx6CRMp8p7VnCPpNr");
}

/// Test: BIP86 vector and the other mainnet encodings for "abandon ... about"
#[test]
fn abandon_mainnet_golden_addresses() {
    let bundle = DerivedWalletBundle::derive(ABANDON, Network::Bitcoin, SignerKind::Software, &Chain::ALL).unwrap();
    let addrs = bundle.addresses();
    assert_eq!(addrs["bitcoin"], "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr");
    assert_eq!(addrs["ethereum"], "0x9858EfFD232B4033E47d90003D41EC34EcaEda94");
    assert_eq!(addrs["solana"], "HAgk14JpMQLgt6rVgv7cBQFJWFto5Dqxi472uT3DKpqk");
    assert_eq!(addrs["stacks"], "SPC5KHM41H6WHAST7MWWDD807YSPRQKJ69FSH54J");
    assert_eq!(bundle.bitcoin().unwrap().addresses().p2pkh, "1NsJS4DAHLcegD63trZurmkLm23TRAujXd");
}

/// Test: HyperEVM is its own handle with its own chain id
#[test]
fn hyperevm_handle() {
    match JUNK_REGTEST.get(Chain::HyperEvm) {
        Some(ChainWallet::Evm(w)) => assert_eq!(w.chain_id(), 999),
        other => panic!("expected EVM handle, got {:?}", other),
    }
}

/// Test: each handle signs messages with its own scheme
#[test]
fn message_signature_shapes() {
    let sizes: Vec<(Chain, usize)> = JUNK_REGTEST
        .wallets()
        .iter()
        .map(|w| (w.chain(), w.sign_message(b"gm").unwrap().len()))
        .collect();
    assert_eq!(
        sizes,
        vec![
            (Chain::Bitcoin, 64),
            (Chain::Solana, 64),
            (Chain::Stacks, 65),
            (Chain::Ethereum, 65),
            (Chain::HyperEvm, 65),
        ]
    );
}

/// Test: network switch rebuilds addresses; derivation paths are the same on every network
#[test]
fn switch_network_rebuilds_bundle() {
    let s = session(JUNK, SessionConfig::regtest());
    let before = s.bundle();
    s.switch_network(Network::Bitcoin).unwrap();
    let after = s.bundle();

    assert_eq!(s.network(), Network::Bitcoin);
    assert_eq!(after.network(), Network::Bitcoin);
    assert_eq!(after.bitcoin().unwrap().address(), "bc1pfzhx49qe6s5exppe5hqljg3n6587xk0w75xqr70pgdt7ygnfkssqxqjd9l");
    assert_eq!(after.get(Chain::Stacks).unwrap().address(), "SP3N7D4F8TDBNPAN7W6CJ5RGF5DAW5MGHNCM7KHP3");
    assert_eq!(s.config().endpoints.esplora_url, "https://mempool.space/api");

    // old handles stay intact for anyone still holding them
    assert_eq!(before.network(), Network::Regtest);
    assert_eq!(before.bitcoin().unwrap().address(), JUNK_REGTEST.bitcoin().unwrap().address());
}

/// Test: regeneration installs a new mnemonic and a completely new bundle
#[test]
fn regenerate_replaces_everything() {
    let s = session(JUNK, SessionConfig::regtest());
    let old = s.bundle().addresses();

    let phrase = s.regenerate(12).unwrap();
    assert_eq!(phrase.split_whitespace().count(), 12);
    assert_eq!(*s.mnemonic(), *phrase);

    let new = s.bundle().addresses();
    for chain in ["bitcoin", "solana", "stacks", "ethereum"] {
        assert_ne!(old[chain], new[chain], "{} address unchanged", chain);
    }
}

/// Test: an invalid replacement mnemonic is rejected and the current bundle survives
#[test]
fn invalid_replacement_keeps_current_bundle() {
    let s = session(JUNK, SessionConfig::regtest());
    let err = s.replace_mnemonic("abandon abandon abandon").unwrap_err();
    assert!(matches!(err, WalletError::InvalidMnemonic(_)));
    assert_eq!(s.bundle().addresses(), JUNK_REGTEST.addresses());
    assert_eq!(s.mnemonic().as_str(), JUNK);
}

/// Test: a session without bitcoin cannot send
#[test]
fn send_requires_bitcoin_chain() {
    let config = SessionConfig::regtest().with_chains(vec![Chain::Solana]);
    let s = session(JUNK, config);
    assert!(matches!(s.bitcoin_sender(), Err(WalletError::Config(_))));
}

/// Test: opening with a bad mnemonic fails outright
#[test]
fn open_rejects_bad_mnemonic() {
    let err = WalletSession::with_backend("junk junk junk", SessionConfig::regtest(), Arc::new(Offline)).unwrap_err();
    assert!(matches!(err, WalletError::InvalidMnemonic(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Property: the same mnemonic always derives the same handles on every chain
    #[test]
    fn derivation_is_deterministic(entropy in any::<[u8; 16]>()) {
        let phrase = bip39::Mnemonic::from_entropy(&entropy).unwrap().to_string();
        let a = DerivedWalletBundle::derive(&phrase, Network::Testnet, SignerKind::HardwareBacked, &Chain::ALL).unwrap();
        let b = DerivedWalletBundle::derive(&phrase, Network::Testnet, SignerKind::Software, &Chain::ALL).unwrap();
        prop_assert_eq!(a.addresses(), b.addresses());
        let key_a = a.get(Chain::Ethereum).unwrap().export_private_key();
        let key_b = b.get(Chain::Ethereum).unwrap().export_private_key();
        prop_assert_eq!(key_a.as_str(), key_b.as_str());
    }
}
