// Caravel common library - main library exports

pub mod address;
pub mod cip19;
pub mod crypto;
pub mod ed25519;
pub mod error;
pub mod hash;
pub mod keys;
pub mod protocol_params;
pub mod types;

// Flattened re-exports
pub use self::address::{
    Address, AddressError, AddressKind, AddressNetwork, Credential, DelegationPart, Pointer,
};
pub use self::error::TxError;
pub use self::hash::{DatumHash, KeyHash, ScriptHash, TxHash};
pub use self::keys::{KeyError, KeyRole};
pub use self::protocol_params::ProtocolParams;
pub use self::types::*;
