use caravel_common::{
    TxHash,
    ed25519::{PublicKey, Signature},
};

/// Verification key and its signature over a transaction id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VKeyWitness {
    pub vkey: PublicKey,
    pub signature: Signature,
}

impl VKeyWitness {
    pub fn new(vkey: PublicKey, signature: Signature) -> Self {
        Self { vkey, signature }
    }

    /// Same encoded size as a real witness for `vkey`, with an all-zero signature
    pub fn placeholder(vkey: PublicKey) -> Self {
        Self::new(vkey, Signature::placeholder())
    }

    pub fn verify(&self, tx_hash: &TxHash) -> bool {
        self.vkey.verify(tx_hash, &self.signature)
    }
}

impl<C> minicbor::Encode<C> for VKeyWitness {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(2)?;
        e.encode_with(&self.vkey, ctx)?;
        e.encode_with(&self.signature, ctx)?;
        Ok(())
    }
}

/// Transaction witnesses. Only verification key witnesses are produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WitnessSet {
    pub vkey_witnesses: Vec<VKeyWitness>,
}

impl WitnessSet {
    pub fn new(vkey_witnesses: Vec<VKeyWitness>) -> Self {
        Self { vkey_witnesses }
    }

    pub fn is_empty(&self) -> bool {
        self.vkey_witnesses.is_empty()
    }
}

impl<C> minicbor::Encode<C> for WitnessSet {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if self.is_empty() {
            e.map(0)?;
            return Ok(());
        }

        e.map(1)?;
        e.u8(0)?;
        e.array(self.vkey_witnesses.len() as u64)?;
        for witness in &self.vkey_witnesses {
            e.encode_with(witness, ctx)?;
        }
        Ok(())
    }
}
