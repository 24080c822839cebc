//! Core transaction content types

use crate::{
    address::Address,
    error::TxError,
    hash::{DatumHash, TxHash},
};

/// Amount of lovelace
pub type Lovelace = u64;

/// Sum amounts, failing rather than wrapping
pub fn checked_sum<I>(amounts: I) -> Option<Lovelace>
where
    I: IntoIterator<Item = Lovelace>,
{
    amounts.into_iter().try_fold(0u64, |total, amount| total.checked_add(amount))
}

/// Reference to a spendable output of an earlier transaction, with the amount it holds
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TxInput {
    /// Id of the transaction that created the output
    pub tx_hash: TxHash,

    /// Index of the output within that transaction
    pub index: u32,

    /// Amount the output carries; never encoded
    pub amount: Lovelace,
}

impl TxInput {
    pub fn new(tx_hash: TxHash, index: u32, amount: Lovelace) -> Self {
        Self {
            tx_hash,
            index,
            amount,
        }
    }

    /// Parse the transaction id from hex
    pub fn from_hex(tx_hash: &str, index: u32, amount: Lovelace) -> Result<Self, TxError> {
        let tx_hash = tx_hash
            .parse()
            .map_err(|e| TxError::InvalidInput(format!("bad transaction hash '{tx_hash}': {e}")))?;
        Ok(Self::new(tx_hash, index, amount))
    }

    /// Whether both refer to the same previous output
    pub fn same_reference(&self, other: &TxInput) -> bool {
        self.tx_hash == other.tx_hash && self.index == other.index
    }
}

impl<C> minicbor::Encode<C> for TxInput {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        e.encode_with(&self.tx_hash, ctx)?;
        e.u32(self.index)?;
        Ok(())
    }
}

/// A destination and the lovelace it receives
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TxOutput {
    pub address: Address,

    pub amount: Lovelace,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datum_hash: Option<DatumHash>,
}

impl TxOutput {
    pub fn new(address: Address, amount: Lovelace) -> Self {
        Self {
            address,
            amount,
            datum_hash: None,
        }
    }

    pub fn with_datum_hash(mut self, datum_hash: DatumHash) -> Self {
        self.datum_hash = Some(datum_hash);
        self
    }

    /// Parse the destination from bech32. Negative amounts are rejected.
    pub fn from_bech32(address: &str, amount: i64) -> Result<Self, TxError> {
        let amount = Lovelace::try_from(amount)
            .map_err(|_| TxError::InvalidOutput(format!("negative amount {amount}")))?;
        let address = Address::from_bech32(address)
            .map_err(|e| TxError::InvalidOutput(format!("bad address '{address}': {e}")))?;
        Ok(Self::new(address, amount))
    }
}

impl<C> minicbor::Encode<C> for TxOutput {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match &self.datum_hash {
            Some(datum_hash) => {
                e.array(3)?;
                e.encode_with(&self.address, ctx)?;
                e.u64(self.amount)?;
                e.encode_with(datum_hash, ctx)?;
            }
            None => {
                e.array(2)?;
                e.encode_with(&self.address, ctx)?;
                e.u64(self.amount)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const HASH: &str = "7a040587157289e80e524710021fa9a61d22a597b70786f21a4a78b61dddee29";
    const ADDRESS: &str = "addr1qxn0t7jnv8lrdd5xa6mlcap6qf8ln08pc6k8qxa7un0new2pkrthnm4f5hn6eg3nju6jn6l3994ucy099cw42xu7rmjq8l960u";

    #[test]
    fn input_encodes_as_hash_and_index() {
        let input = TxInput::from_hex(HASH, 0, 100_000_000).unwrap();
        let bytes = minicbor::to_vec(&input).unwrap();
        assert_eq!(hex::encode(bytes), format!("825820{HASH}00"));
    }

    #[test_case("zz"; "not hex")]
    #[test_case("7a0405"; "too short")]
    fn input_rejects_bad_hash(hash: &str) {
        assert!(matches!(TxInput::from_hex(hash, 0, 1), Err(TxError::InvalidInput(_))));
    }

    #[test]
    fn same_reference_ignores_amount() {
        let a = TxInput::from_hex(HASH, 1, 5).unwrap();
        let b = TxInput::from_hex(HASH, 1, 7).unwrap();
        let c = TxInput::from_hex(HASH, 2, 5).unwrap();
        assert!(a.same_reference(&b));
        assert!(!a.same_reference(&c));
    }

    #[test]
    fn output_encodes_address_bytes_and_amount() {
        let output = TxOutput::from_bech32(ADDRESS, 99_000_000).unwrap();
        let bytes = minicbor::to_vec(&output).unwrap();
        assert_eq!(
            hex::encode(bytes),
            "82583901a6f5fa5361fe36b686eeb7fc743a024ff9bce1c6ac701bbee4df3cb941b0d779eea9a5e7aca233973529ebf1296bcc11e52e1d551b9e1ee41a05e69ec0"
        );
    }

    #[test]
    fn output_with_datum_hash_is_three_elements() {
        let output =
            TxOutput::from_bech32(ADDRESS, 1).unwrap().with_datum_hash(DatumHash::new([9; 32]));
        let bytes = minicbor::to_vec(&output).unwrap();
        assert_eq!(bytes[0], 0x83);
        assert_eq!(&bytes[bytes.len() - 34..bytes.len() - 32], &[0x58, 0x20]);
    }

    #[test]
    fn output_rejects_negative_amount() {
        assert!(matches!(TxOutput::from_bech32(ADDRESS, -1), Err(TxError::InvalidOutput(_))));
    }

    #[test]
    fn output_rejects_bad_address() {
        assert!(matches!(
            TxOutput::from_bech32("addr1notanaddress", 1),
            Err(TxError::InvalidOutput(_))
        ));
    }

    #[test]
    fn checked_sum_detects_overflow() {
        assert_eq!(checked_sum([1, 2, 3]), Some(6));
        assert_eq!(checked_sum([u64::MAX, 1]), None);
        assert_eq!(checked_sum(Vec::new()), Some(0));
    }
}
