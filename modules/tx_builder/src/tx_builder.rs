//! Caravel transaction builder
//!
//! A [`TxBuilder`] is a single-use session: add inputs and outputs, attach signing keys,
//! let it resolve change, then [`TxBuilder::build`] the signed transaction. Every failing
//! call leaves the session exactly as it was.

mod change;
mod draft;

pub use change::ChangeOutcome;
pub use draft::{InputDraft, OutputDraft, TxDraft, read_protocol_params};

use caravel_cardano::transaction::{
    UtxoEntryWords, alonzo_utxo_entry_words, calculate_min_fee, calculate_min_utxo,
};
use caravel_codec::{Tx, TxBody, VKeyWitness, WitnessSet, encode_transaction};
use caravel_common::{
    KeyHash, Lovelace, ProtocolParams, TxError, TxInput, TxOutput, checked_sum,
    ed25519::PublicKey,
    keys::{PrivateKey, decode_signing_key},
};
use tracing::{debug, info};

/// Where a builder is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderState {
    /// No signing key yet
    Draft,

    /// At least one signing key attached; still mutable
    Signed,

    /// Transaction produced; the builder accepts no further changes
    Built,
}

/// A signing key with its verification key computed once
#[derive(Debug)]
struct Signer {
    public: PublicKey,
    key: PrivateKey,
}

#[derive(Debug)]
pub struct TxBuilder<'a> {
    params: &'a ProtocolParams,
    utxo_entry_words: UtxoEntryWords,
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
    fee: Lovelace,
    ttl: Option<u64>,
    signers: Vec<Signer>,
    built: bool,
}

impl<'a> TxBuilder<'a> {
    /// Start a session using the Alonzo minimum output rule
    pub fn new(params: &'a ProtocolParams) -> Self {
        Self::with_utxo_entry_words(params, alonzo_utxo_entry_words)
    }

    pub fn with_utxo_entry_words(
        params: &'a ProtocolParams,
        utxo_entry_words: UtxoEntryWords,
    ) -> Self {
        Self {
            params,
            utxo_entry_words,
            inputs: Vec::new(),
            outputs: Vec::new(),
            fee: 0,
            ttl: None,
            signers: Vec::new(),
            built: false,
        }
    }

    fn ensure_mutable(&self) -> Result<(), TxError> {
        if self.built {
            Err(TxError::AlreadyBuilt)
        } else {
            Ok(())
        }
    }

    /// Append inputs in order. A reference already present, or repeated in the batch,
    /// rejects the whole batch.
    pub fn add_inputs<I>(&mut self, inputs: I) -> Result<&mut Self, TxError>
    where
        I: IntoIterator<Item = TxInput>,
    {
        self.ensure_mutable()?;
        let inputs: Vec<TxInput> = inputs.into_iter().collect();
        for (index, input) in inputs.iter().enumerate() {
            let mut seen = self.inputs.iter().chain(&inputs[..index]);
            if seen.any(|earlier| earlier.same_reference(input)) {
                return Err(TxError::InvalidInput(format!(
                    "duplicate input {}#{}",
                    input.tx_hash, input.index
                )));
            }
        }
        self.inputs.extend(inputs);
        Ok(self)
    }

    /// Append outputs in order. Minimum values are checked at build time.
    pub fn add_outputs<I>(&mut self, outputs: I) -> Result<&mut Self, TxError>
    where
        I: IntoIterator<Item = TxOutput>,
    {
        self.ensure_mutable()?;
        self.outputs.extend(outputs);
        Ok(self)
    }

    pub fn set_fee(&mut self, fee: Lovelace) -> Result<&mut Self, TxError> {
        self.ensure_mutable()?;
        self.fee = fee;
        Ok(self)
    }

    /// Last slot in which the transaction is valid
    pub fn set_ttl(&mut self, slot: u64) -> Result<&mut Self, TxError> {
        self.ensure_mutable()?;
        self.ttl = Some(slot);
        Ok(self)
    }

    /// Attach a bech32 signing key (`*_xsk` or `*_sk`)
    pub fn sign(&mut self, encoded_key: &str) -> Result<&mut Self, TxError> {
        self.ensure_mutable()?;
        let key = decode_signing_key(encoded_key)?;
        self.add_signing_key(key)
    }

    /// Attach a signing key. Attaching the same key twice records it once.
    pub fn add_signing_key(&mut self, key: PrivateKey) -> Result<&mut Self, TxError> {
        self.ensure_mutable()?;
        let public = key.public();
        if self.signers.iter().any(|signer| signer.public == public) {
            debug!("Signing key {} already attached", public.hash());
        } else {
            debug!("Attached signing key {}", public.hash());
            self.signers.push(Signer { public, key });
        }
        Ok(self)
    }

    pub fn state(&self) -> BuilderState {
        if self.built {
            BuilderState::Built
        } else if self.signers.is_empty() {
            BuilderState::Draft
        } else {
            BuilderState::Signed
        }
    }

    pub fn inputs(&self) -> &[TxInput] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    pub fn fee(&self) -> Lovelace {
        self.fee
    }

    pub fn ttl(&self) -> Option<u64> {
        self.ttl
    }

    /// Credential hashes of the attached keys, in insertion order
    pub fn signer_hashes(&self) -> Vec<KeyHash> {
        self.signers.iter().map(|signer| signer.public.hash()).collect()
    }

    pub fn total_input(&self) -> Result<Lovelace, TxError> {
        checked_sum(self.inputs.iter().map(|input| input.amount))
            .ok_or_else(|| TxError::InvalidInput("input total overflows".to_string()))
    }

    pub fn total_output(&self) -> Result<Lovelace, TxError> {
        checked_sum(self.outputs.iter().map(|output| output.amount))
            .ok_or_else(|| TxError::InvalidOutput("output total overflows".to_string()))
    }

    /// Fee the draft needs as it stands, outputs unchanged
    pub fn min_fee(&self) -> Result<Lovelace, TxError> {
        self.solve_fee(&self.outputs)
    }

    /// Smallest amount `output` may carry under this builder's rule
    pub fn min_utxo(&self, output: &TxOutput) -> Lovelace {
        calculate_min_utxo(self.params, output, self.utxo_entry_words)
    }

    fn body(&self, outputs: &[TxOutput], fee: Lovelace) -> TxBody {
        TxBody {
            inputs: self.inputs.clone(),
            outputs: outputs.to_vec(),
            fee,
            ttl: self.ttl,
        }
    }

    /// Encoded size of the complete transaction, with one placeholder witness per key
    fn estimate_size(&self, body: &TxBody) -> Result<usize, TxError> {
        let placeholders = WitnessSet::new(
            self.signers.iter().map(|signer| VKeyWitness::placeholder(signer.public)).collect(),
        );
        Ok(encode_transaction(body, &placeholders)?.len())
    }

    /// Smallest fee that covers a body carrying that same fee. The fee's own encoded
    /// width is part of the size, so iterate until it stops growing.
    fn solve_fee(&self, outputs: &[TxOutput]) -> Result<Lovelace, TxError> {
        let mut body = self.body(outputs, 0);
        loop {
            let needed = calculate_min_fee(self.params, self.estimate_size(&body)?);
            if needed <= body.fee {
                return Ok(body.fee);
            }
            body.fee = needed;
        }
    }

    /// Validate, sign and finalize. On success the builder is spent and its keys dropped.
    pub fn build(&mut self) -> Result<Tx, TxError> {
        self.ensure_mutable()?;
        if self.inputs.is_empty() {
            return Err(TxError::InvalidInput("transaction has no inputs".to_string()));
        }
        if self.signers.is_empty() {
            return Err(TxError::NoSigningKey);
        }

        let total_in = self.total_input()?;
        let total_out = self.total_output()?;
        let required = total_out
            .checked_add(self.fee)
            .ok_or_else(|| TxError::InvalidOutput("output total overflows".to_string()))?;
        if total_in < required {
            return Err(TxError::InsufficientInput {
                available: total_in,
                required,
            });
        }
        if total_in > required {
            return Err(TxError::ExcessInput {
                leftover: total_in - required,
            });
        }

        for (index, output) in self.outputs.iter().enumerate() {
            let minimum = self.min_utxo(output);
            if output.amount < minimum {
                return Err(TxError::OutputBelowMinimum {
                    index,
                    amount: output.amount,
                    minimum,
                });
            }
        }

        let body = self.body(&self.outputs, self.fee);
        let tx_hash = body.hash()?;
        let witnesses = self
            .signers
            .iter()
            .map(|signer| VKeyWitness::new(signer.public, signer.key.sign(tx_hash)))
            .collect();
        let tx = Tx::new(body, WitnessSet::new(witnesses))?;

        let size = tx.to_bytes()?.len();
        let minimum = calculate_min_fee(self.params, size);
        if self.fee < minimum {
            return Err(TxError::FeeTooSmall {
                fee: self.fee,
                minimum,
            });
        }
        let maximum = self.params.max_tx_size as usize;
        if size > maximum {
            return Err(TxError::TxTooLarge { size, maximum });
        }

        self.built = true;
        self.signers.clear();
        info!(
            tx_hash = %tx.hash(),
            size,
            fee = self.fee,
            inputs = self.inputs.len(),
            outputs = self.outputs.len(),
            "Built transaction"
        );
        Ok(tx)
    }
}
