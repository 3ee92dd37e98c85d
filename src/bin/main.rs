//! bitmeme-wallet CLI - JSON in, JSON out
//!
//!   bitmeme-wallet new-mnemonic [--words 12|24]
//!   bitmeme-wallet addresses                      → {"bitcoin": "bc1p...", "solana": ...}
//!   bitmeme-wallet fee-rate                       → {"sat_per_vb": 2.0}
//!   bitmeme-wallet utxos                          → [{"transaction_id", "output_index", "satoshis"}]
//!   bitmeme-wallet balance                        → {"address", "satoshis"}
//!   bitmeme-wallet send --to <addr> --amount <sat> [--fee-rate <sat/vB>]
//!
//! Mnemonic comes from --mnemonic or BITMEME_MNEMONIC; the rest of the
//! configuration from BITMEME_* (a .env file in the working directory is loaded first).
//! Errors go to stderr as {"error": ...} with exit code 1.

use anyhow::{anyhow, bail, Context};
use bitmeme_wallet::logging::init_logging;
use bitmeme_wallet::{generate_mnemonic, Network, SessionConfig, SignerKind, WalletSession};
use serde_json::{json, Value};
use std::env;
use std::io::IsTerminal;
use tracing::debug;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    let opts = match ParsedArgs::parse(&args) {
        Ok(opts) => opts,
        Err(e) => fail(&e.to_string(), false),
    };

    if opts.help {
        print_usage();
        return;
    }
    if opts.version {
        println!("bitmeme-wallet {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = match opts.command.as_deref() {
        Some("new-mnemonic") => cmd_new_mnemonic(&opts),
        Some("addresses") => cmd_addresses(&opts),
        Some("fee-rate") => cmd_fee_rate(&opts).await,
        Some("utxos") => cmd_utxos(&opts).await,
        Some("balance") => cmd_balance(&opts).await,
        Some("send") => cmd_send(&opts).await,
        Some(cmd) => Err(anyhow!("Unknown command: {}", cmd)),
        None => {
            print_usage();
            return;
        }
    };

    let pretty = opts.pretty || std::io::stdout().is_terminal();
    match result {
        Ok(output) => println!("{}", render(&output, pretty)),
        Err(e) => fail(&format!("{:#}", e), pretty),
    }
}

fn render(value: &Value, pretty: bool) -> String {
    let rendered = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    rendered.unwrap_or_else(|_| value.to_string())
}

fn fail(message: &str, pretty: bool) -> ! {
    eprintln!("{}", render(&json!({ "error": message }), pretty));
    std::process::exit(1);
}

#[derive(Debug, Default)]
struct ParsedArgs {
    command: Option<String>,
    mnemonic: Option<String>,
    network: Option<String>,
    signer: Option<String>,
    to: Option<String>,
    amount: Option<u64>,
    fee_rate: Option<f64>,
    words: Option<usize>,
    pretty: bool,
    help: bool,
    version: bool,
}

impl ParsedArgs {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut opts = ParsedArgs::default();
        let mut positional = Vec::new();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let mut value = |flag: &str| iter.next().cloned().ok_or_else(|| anyhow!("{} requires a value", flag));
            match arg.as_str() {
                "--help" | "-h" => opts.help = true,
                "--version" | "-V" => opts.version = true,
                "--pretty" => opts.pretty = true,
                "--mnemonic" | "-m" => opts.mnemonic = Some(value(arg)?),
                "--network" | "-n" => opts.network = Some(value(arg)?),
                "--signer" => opts.signer = Some(value(arg)?),
                "--to" => opts.to = Some(value(arg)?),
                "--amount" => {
                    let v = value(arg)?;
                    opts.amount = Some(v.parse().with_context(|| format!("--amount expects satoshis, got '{}'", v))?);
                }
                "--fee-rate" => {
                    let v = value(arg)?;
                    opts.fee_rate = Some(v.parse().with_context(|| format!("--fee-rate expects sat/vB, got '{}'", v))?);
                }
                "--words" => {
                    let v = value(arg)?;
                    opts.words = Some(v.parse().with_context(|| format!("--words expects 12 or 24, got '{}'", v))?);
                }
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                other => bail!("Unknown flag: {}", other),
            }
        }

        opts.command = positional.into_iter().next();
        if opts.mnemonic.is_none() {
            opts.mnemonic = env::var("BITMEME_MNEMONIC").ok().filter(|s| !s.trim().is_empty());
        }
        Ok(opts)
    }
}

fn print_usage() {
    println!(
        r#"bitmeme-wallet - multi-chain wallet core

USAGE:
    bitmeme-wallet <command> [options]

COMMANDS:
    new-mnemonic      Generate a fresh BIP39 mnemonic
    addresses         Derived address for every chain
    fee-rate          Current fee estimate (sat/vB), default on oracle failure
    utxos             Unspent outputs of the Taproot address
    balance           Sum of unspent outputs (display estimate)
    send              Build, sign and broadcast a Taproot spend

OPTIONS:
    -m, --mnemonic <words>    Mnemonic (or BITMEME_MNEMONIC)
    -n, --network <net>       bitcoin | testnet | signet | regtest (or BITMEME_NETWORK)
        --signer <kind>       hardware | software (or BITMEME_SIGNER)
        --to <address>        send: destination
        --amount <sat>        send: amount in satoshis (>= 330)
        --fee-rate <sat/vB>   send: skip the oracle
        --words <n>           new-mnemonic: 12 or 24
        --pretty              Pretty-print JSON
    -h, --help                Show this help
    -V, --version             Show version

ENVIRONMENT:
    BITMEME_ESPLORA_URL, BITMEME_RELAY_URL, BITMEME_RELAY_FORMAT (raw|json),
    BITMEME_RPC_URL, BITMEME_RPC_USER, BITMEME_RPC_PASS, BITMEME_FEE_RATE,
    BITMEME_LOG_JSON, RUST_LOG
"#
    );
}

fn session_config(opts: &ParsedArgs) -> anyhow::Result<SessionConfig> {
    let mut config = SessionConfig::default().from_env()?;
    if let Some(net) = &opts.network {
        let network = Network::parse(net).ok_or_else(|| anyhow!("Unknown network: {}", net))?;
        if network != config.network {
            config = config.with_network(network);
        }
    }
    if let Some(kind) = &opts.signer {
        config = config.with_signer(SignerKind::parse(kind).ok_or_else(|| anyhow!("Unknown signer: {}", kind))?);
    }
    Ok(config)
}

fn open_session(opts: &ParsedArgs) -> anyhow::Result<WalletSession> {
    let mnemonic = opts
        .mnemonic
        .as_deref()
        .ok_or_else(|| anyhow!("--mnemonic <words> or BITMEME_MNEMONIC is required"))?;
    let config = session_config(opts)?;
    debug!(network = config.network.as_str(), signer = config.signer.as_str(), "opening session");
    Ok(WalletSession::open(mnemonic, config)?)
}

fn cmd_new_mnemonic(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let mnemonic = generate_mnemonic(opts.words.unwrap_or(12))?;
    Ok(json!({ "mnemonic": mnemonic.as_str() }))
}

fn cmd_addresses(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let session = open_session(opts)?;
    let bundle = session.bundle();
    let mut out = serde_json::to_value(bundle.addresses())?;
    if let Some(btc) = bundle.bitcoin() {
        out["bitcoin_all"] = json!({
            "p2tr": btc.addresses().p2tr,
            "p2wpkh": btc.addresses().p2wpkh,
            "p2pkh": btc.addresses().p2pkh,
        });
    }
    out["network"] = json!(bundle.network().as_str());
    Ok(out)
}

async fn cmd_fee_rate(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let session = open_session(opts)?;
    Ok(json!({ "sat_per_vb": session.fee_rate().await }))
}

async fn cmd_utxos(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let session = open_session(opts)?;
    Ok(serde_json::to_value(session.bitcoin_utxos().await?)?)
}

async fn cmd_balance(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let session = open_session(opts)?;
    let sender = session.bitcoin_sender()?;
    Ok(json!({ "address": sender.address(), "satoshis": sender.balance().await? }))
}

async fn cmd_send(opts: &ParsedArgs) -> anyhow::Result<Value> {
    let to = opts.to.as_deref().ok_or_else(|| anyhow!("--to <address> is required"))?;
    let amount = opts.amount.ok_or_else(|| anyhow!("--amount <sat> is required"))?;
    let session = open_session(opts)?;
    let outcome = session.send_bitcoin(to, amount, opts.fee_rate).await?;
    let mut out = serde_json::to_value(&outcome)?;
    if outcome.dust_donated_sat() > 0 {
        out["warning"] = json!(format!("{} sat of sub-dust change was added to the fee", outcome.dust_donated_sat()));
    }
    Ok(out)
}
