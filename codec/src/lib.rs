mod tx;
mod witness;

pub use tx::*;
pub use witness::*;

use caravel_common::TxError;

/// Canonical CBOR bytes of `value`
pub fn encode_to_vec<T: minicbor::Encode<()>>(value: &T) -> Result<Vec<u8>, TxError> {
    minicbor::to_vec(value).map_err(|e| TxError::Encoding(e.to_string()))
}
