use caravel_common::{Lovelace, TxOutput, protocol_params::ProtocolParams};

// Alonzo UTxO entry sizes, in 8-byte words
const UTXO_ENTRY_SIZE_WITHOUT_VAL: u64 = 27;
const COIN_SIZE: u64 = 2;
const DATA_HASH_SIZE: u64 = 10;

/// Size of the UTxO entry an output creates, in words. Feeds the minimum output value.
pub type UtxoEntryWords = fn(&TxOutput) -> u64;

/// Alonzo rule: fixed entry overhead plus an ada-only value, plus the datum hash if present
pub fn alonzo_utxo_entry_words(output: &TxOutput) -> u64 {
    let data_hash = if output.datum_hash.is_some() { DATA_HASH_SIZE } else { 0 };
    UTXO_ENTRY_SIZE_WITHOUT_VAL + COIN_SIZE + data_hash
}

/// Linear fee for a transaction of `tx_size` encoded bytes
pub fn calculate_min_fee(params: &ProtocolParams, tx_size: usize) -> Lovelace {
    params.min_fee_a.saturating_mul(tx_size as u64).saturating_add(params.min_fee_b)
}

/// Smallest amount `output` may carry
pub fn calculate_min_utxo(
    params: &ProtocolParams,
    output: &TxOutput,
    utxo_entry_words: UtxoEntryWords,
) -> Lovelace {
    utxo_entry_words(output).saturating_mul(params.coins_per_utxo_word)
}
