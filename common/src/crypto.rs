//! Blake2b digests used for credentials and transaction ids

use crate::hash::{Hash, KeyHash, TxHash};
use blake2::{
    digest::consts::{U28, U32},
    Blake2b, Digest,
};

/// Blake2b-224 of a verification key, as committed to by address credentials
pub fn keyhash_224(key: &[u8]) -> KeyHash {
    let mut hasher = Blake2b::<U28>::new();
    hasher.update(key);
    Hash::new(hasher.finalize().into())
}

/// Blake2b-256, used for transaction ids
pub fn hash_256(data: &[u8]) -> TxHash {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    Hash::new(hasher.finalize().into())
}
