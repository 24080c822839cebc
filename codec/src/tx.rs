use crate::{encode_to_vec, witness::WitnessSet};
use caravel_common::{Lovelace, TxError, TxHash, TxInput, TxOutput, crypto::hash_256};

/// Unsigned transaction content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxBody {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub fee: Lovelace,
    pub ttl: Option<u64>,
}

impl TxBody {
    pub fn to_bytes(&self) -> Result<Vec<u8>, TxError> {
        encode_to_vec(self)
    }

    /// Transaction id: Blake2b-256 of the encoded body
    pub fn hash(&self) -> Result<TxHash, TxError> {
        Ok(hash_256(&self.to_bytes()?))
    }
}

impl<C> minicbor::Encode<C> for TxBody {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.map(if self.ttl.is_some() { 4 } else { 3 })?;

        e.u8(0)?;
        e.array(self.inputs.len() as u64)?;
        for input in &self.inputs {
            e.encode_with(input, ctx)?;
        }

        e.u8(1)?;
        e.array(self.outputs.len() as u64)?;
        for output in &self.outputs {
            e.encode_with(output, ctx)?;
        }

        e.u8(2)?.u64(self.fee)?;

        if let Some(ttl) = self.ttl {
            e.u8(3)?.u64(ttl)?;
        }
        Ok(())
    }
}

/// Body, witnesses, validity flag and an empty auxiliary data slot
struct TxEnvelope<'a> {
    body: &'a TxBody,
    witness_set: &'a WitnessSet,
}

impl<C> minicbor::Encode<C> for TxEnvelope<'_> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(4)?;
        e.encode_with(self.body, ctx)?;
        e.encode_with(self.witness_set, ctx)?;
        e.bool(true)?;
        e.null()?;
        Ok(())
    }
}

/// Encode a complete transaction without building a [`Tx`]. Used for size estimates.
pub fn encode_transaction(body: &TxBody, witness_set: &WitnessSet) -> Result<Vec<u8>, TxError> {
    encode_to_vec(&TxEnvelope { body, witness_set })
}

/// A finalized transaction. Immutable; its id is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx {
    body: TxBody,
    witness_set: WitnessSet,
    id: TxHash,
}

impl Tx {
    pub fn new(body: TxBody, witness_set: WitnessSet) -> Result<Self, TxError> {
        let id = body.hash()?;
        Ok(Self {
            body,
            witness_set,
            id,
        })
    }

    pub fn body(&self) -> &TxBody {
        &self.body
    }

    pub fn witness_set(&self) -> &WitnessSet {
        &self.witness_set
    }

    pub fn hash(&self) -> TxHash {
        self.id
    }

    /// Wire bytes, as handed to a submitter
    pub fn to_bytes(&self) -> Result<Vec<u8>, TxError> {
        encode_transaction(&self.body, &self.witness_set)
    }

    pub fn to_hex(&self) -> Result<String, TxError> {
        Ok(hex::encode(self.to_bytes()?))
    }

    /// True if every witness signs this transaction's id
    pub fn verify_witnesses(&self) -> bool {
        self.witness_set.vkey_witnesses.iter().all(|witness| {
            let valid = witness.verify(&self.id);
            if !valid {
                tracing::warn!("Witness for {} does not sign tx {}", witness.vkey, self.id);
            }
            valid
        })
    }
}
