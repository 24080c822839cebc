use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use caravel_common::{
    Address, AddressNetwork, Credential, DelegationPart,
    keys::{DerivationPath, KeyRole, XPrv, harden},
};
use caravel_module_tx_builder::{TxDraft, read_protocol_params};
use clap::{Parser, Subcommand};
use config::{Config, Environment, File};
use rand::Rng;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer as _, Registry, filter, fmt, layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};

fn default_config_path() -> PathBuf {
    PathBuf::from(option_env!("CARAVEL_TX_BUILDER_DEFAULT_CONFIG").unwrap_or("tx-builder.toml"))
}

#[derive(Parser)]
#[command(name = "caravel-tx", about = "Build, balance and sign Alonzo transactions")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the transaction drafted in the configuration file
    Build {
        /// Path to configuration.
        #[arg(long, default_value = default_config_path().into_os_string())]
        config: PathBuf,

        /// Write the raw transaction bytes here as well.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Create a root key and derive a payment key and address from it
    Keygen {
        /// Hex entropy; fresh random entropy when absent.
        #[arg(long)]
        entropy: Option<String>,

        #[arg(long, default_value = "")]
        passphrase: String,

        /// Account index.
        #[arg(long, default_value_t = 0)]
        account: u32,

        /// Address index within the account.
        #[arg(long, default_value_t = 0)]
        index: u32,

        #[arg(long)]
        testnet: bool,
    },

    /// Decode a bech32 address
    Address { address: String },
}

fn build(config_path: PathBuf, out: Option<PathBuf>) -> Result<()> {
    let config = Config::builder()
        .add_source(File::from(config_path.as_path()))
        .add_source(Environment::with_prefix("CARAVEL").separator("__").try_parsing(true))
        .build()
        .with_context(|| format!("Loading {}", config_path.display()))?;

    let params = read_protocol_params(&config)?;
    let draft = TxDraft::parse(&config)?;
    info!(
        inputs = draft.inputs.len(),
        outputs = draft.outputs.len(),
        "Building transaction from {}",
        config_path.display()
    );

    let (tx, change) = draft.build(&params)?;
    let bytes = tx.to_bytes()?;
    if let Some(path) = out {
        std::fs::write(&path, &bytes).with_context(|| format!("Writing {}", path.display()))?;
        info!("Wrote {} bytes to {}", bytes.len(), path.display());
    }

    let report = json!({
        "tx_hash": tx.hash().to_string(),
        "fee": tx.body().fee,
        "size": bytes.len(),
        "change": change.map(|outcome| format!("{outcome:?}")),
        "cbor": hex::encode(&bytes),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn keygen(
    entropy: Option<String>,
    passphrase: &str,
    account: u32,
    index: u32,
    testnet: bool,
) -> Result<()> {
    let entropy = match entropy {
        Some(text) => hex::decode(text).context("Entropy must be hex")?,
        None => {
            let mut bytes = vec![0u8; 32];
            rand::rng().fill(bytes.as_mut_slice());
            bytes
        }
    };
    if entropy.len() < 16 {
        bail!("Entropy must be at least 16 bytes, got {}", entropy.len());
    }

    let root = XPrv::from_entropy(&entropy, passphrase.as_bytes());
    let payment_path = DerivationPath::cip1852(account, 0, index);
    let payment = root.derive_path(&payment_path)?;
    let stake_path = DerivationPath::cip1852(account, 2, 0);
    let stake = root.derive_path(&stake_path)?;
    let account_key = root.derive_path(&DerivationPath::new(vec![
        harden(1852),
        harden(1815),
        harden(account),
    ]))?;

    let network = if testnet { AddressNetwork::Test } else { AddressNetwork::Main };
    let address = Address::base(
        network,
        Credential::from_public_key(&payment.public().public_key()),
        Credential::from_public_key(&stake.public().public_key()),
    );
    let enterprise = Address::enterprise(network, address.payment);

    let report = json!({
        "root_xsk": root.to_bech32(KeyRole::Root)?,
        "acct_xvk": account_key.public().to_bech32(KeyRole::Account)?,
        "payment_path": payment_path.to_string(),
        "addr_xsk": payment.to_bech32(KeyRole::Address)?,
        "addr_xvk": payment.public().to_bech32(KeyRole::Address)?,
        "stake_path": stake_path.to_string(),
        "stake_xvk": stake.public().to_bech32(KeyRole::Stake)?,
        "address": address.to_bech32()?,
        "enterprise_address": enterprise.to_bech32()?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn describe_credential(credential: &Credential) -> serde_json::Value {
    match credential {
        Credential::KeyHash(hash) => json!({ "key_hash": hash.to_string() }),
        Credential::ScriptHash(hash) => json!({ "script_hash": hash.to_string() }),
    }
}

fn address(text: &str) -> Result<()> {
    let address = Address::from_bech32(text)?;
    let delegation = match &address.delegation {
        DelegationPart::None => serde_json::Value::Null,
        DelegationPart::Stake(credential) => describe_credential(credential),
        DelegationPart::Pointer(pointer) => json!({
            "slot": pointer.slot,
            "tx_index": pointer.tx_index,
            "cert_index": pointer.cert_index,
        }),
    };

    let report = json!({
        "network": format!("{:?}", address.network),
        "kind": format!("{:?}", address.kind()),
        "type": address.type_id(),
        "payment": describe_credential(&address.payment),
        "delegation": delegation,
        "bytes": hex::encode(address.to_bytes()),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn main() -> Result<()> {
    let args = Args::try_parse()?;

    // Standard logging using RUST_LOG for log levels default to INFO for events only
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env().add_directive(filter::LevelFilter::INFO.into()))
        .with_filter(filter::filter_fn(|meta| meta.is_event()));
    Registry::default().with(fmt_layer).init();

    match args.command {
        Command::Build { config, out } => build(config, out),
        Command::Keygen {
            entropy,
            passphrase,
            account,
            index,
            testnet,
        } => keygen(entropy, &passphrase, account, index, testnet),
        Command::Address { address: text } => address(&text),
    }
}
