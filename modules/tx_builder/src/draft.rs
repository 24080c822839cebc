//! Transaction drafts and protocol parameters read from configuration

use crate::{ChangeOutcome, TxBuilder};
use anyhow::{Context, Result};
use caravel_codec::Tx;
use caravel_common::{
    Address, Lovelace, ProtocolParams, TxError, TxInput, TxOutput,
    protocol_params::DEFAULT_MAX_TX_SIZE,
};
use config::{Config, ConfigError};
use serde::Deserialize;
use tracing::info;

/// Read `[params]`. The fee and minimum output constants are required.
pub fn read_protocol_params(config: &Config) -> Result<ProtocolParams> {
    let min_fee_a = config.get("params.min-fee-a").context("params.min-fee-a")?;
    let min_fee_b = config.get("params.min-fee-b").context("params.min-fee-b")?;
    let coins_per_utxo_word =
        config.get("params.coins-per-utxo-word").context("params.coins-per-utxo-word")?;
    let max_tx_size = match config.get("params.max-tx-size") {
        Ok(size) => size,
        Err(ConfigError::NotFound(_)) => DEFAULT_MAX_TX_SIZE,
        Err(e) => return Err(e).context("params.max-tx-size"),
    };
    Ok(ProtocolParams::new(min_fee_a, min_fee_b, coins_per_utxo_word).with_max_tx_size(max_tx_size))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InputDraft {
    pub tx_hash: String,
    pub index: u32,
    pub amount: Lovelace,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputDraft {
    pub address: String,
    pub amount: i64,
}

/// Everything needed to build one transaction, as written in `[tx]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TxDraft {
    #[serde(default)]
    pub inputs: Vec<InputDraft>,

    #[serde(default)]
    pub outputs: Vec<OutputDraft>,

    pub ttl: Option<u64>,

    /// Explicit fee; ignored when a change address is given
    pub fee: Option<Lovelace>,

    pub change_address: Option<String>,

    /// Bech32 `*_xsk` or `*_sk` keys
    #[serde(default)]
    pub signing_keys: Vec<String>,
}

impl TxDraft {
    pub fn parse(config: &Config) -> Result<Self> {
        config.get("tx").context("Reading transaction draft from [tx]")
    }

    /// Run the draft through a fresh builder
    pub fn build(&self, params: &ProtocolParams) -> Result<(Tx, Option<ChangeOutcome>), TxError> {
        let inputs = self
            .inputs
            .iter()
            .map(|input| TxInput::from_hex(&input.tx_hash, input.index, input.amount))
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = self
            .outputs
            .iter()
            .map(|output| TxOutput::from_bech32(&output.address, output.amount))
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = TxBuilder::new(params);
        builder.add_inputs(inputs)?.add_outputs(outputs)?;
        if let Some(ttl) = self.ttl {
            builder.set_ttl(ttl)?;
        }
        for key in &self.signing_keys {
            builder.sign(key)?;
        }

        let outcome = match &self.change_address {
            Some(text) => {
                let change_address = Address::from_bech32(text)?;
                Some(builder.add_change_if_needed(&change_address)?)
            }
            None => {
                builder.set_fee(self.fee.unwrap_or_default())?;
                None
            }
        };
        if let Some(outcome) = &outcome {
            info!("Change resolution: {outcome:?}");
        }

        let tx = builder.build()?;
        Ok((tx, outcome))
    }
}
