//! Alonzo-era economic constants consumed by the transaction builder

use crate::Lovelace;

/// Default `maxTxSize` of the Alonzo ledger, in bytes
pub const DEFAULT_MAX_TX_SIZE: u32 = 16384;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolParams {
    /// Fee per byte of the encoded transaction
    #[serde(rename = "minFeeA")]
    pub min_fee_a: Lovelace,

    /// Constant fee per transaction
    #[serde(rename = "minFeeB")]
    pub min_fee_b: Lovelace,

    #[serde(rename = "coinsPerUTxOWord")]
    pub coins_per_utxo_word: Lovelace,

    #[serde(default = "default_max_tx_size")]
    pub max_tx_size: u32,
}

fn default_max_tx_size() -> u32 {
    DEFAULT_MAX_TX_SIZE
}

impl ProtocolParams {
    pub fn new(min_fee_a: Lovelace, min_fee_b: Lovelace, coins_per_utxo_word: Lovelace) -> Self {
        Self {
            min_fee_a,
            min_fee_b,
            coins_per_utxo_word,
            max_tx_size: DEFAULT_MAX_TX_SIZE,
        }
    }

    pub fn with_max_tx_size(mut self, max_tx_size: u32) -> Self {
        self.max_tx_size = max_tx_size;
        self
    }
}
