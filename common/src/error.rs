//! Errors raised while constructing a transaction

use crate::{address::AddressError, keys::KeyError, Lovelace};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid output: {0}")]
    InvalidOutput(String),

    #[error("Invalid signing key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Insufficient input: {available} lovelace available, {required} required")]
    InsufficientInput {
        available: Lovelace,
        required: Lovelace,
    },

    #[error("Inputs exceed outputs plus fee by {leftover} lovelace")]
    ExcessInput { leftover: Lovelace },

    #[error("No signing key attached")]
    NoSigningKey,

    #[error("Output {index} carries {amount} lovelace, below the minimum of {minimum}")]
    OutputBelowMinimum {
        index: usize,
        amount: Lovelace,
        minimum: Lovelace,
    },

    #[error("Fee {fee} is below the minimum fee {minimum}")]
    FeeTooSmall { fee: Lovelace, minimum: Lovelace },

    #[error("Transaction is {size} bytes, above the maximum of {maximum}")]
    TxTooLarge { size: usize, maximum: usize },

    #[error("Transaction has already been built")]
    AlreadyBuilt,

    #[error("Encoding failed: {0}")]
    Encoding(String),
}
