//! Shelley-era payment addresses (CIP-19)

use crate::cip19::{VarIntDecoder, VarIntEncoder};
use crate::ed25519::PublicKey;
use crate::hash::{KeyHash, ScriptHash};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

const HASH_SIZE: usize = 28;

/// Address decoding errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid bech32 address text: {0}")]
    Bech32(String),

    #[error("Unknown address prefix '{0}'")]
    UnknownPrefix(String),

    #[error("Empty address data")]
    Empty,

    #[error("Unsupported address type {0}")]
    UnsupportedType(u8),

    #[error("Unknown network id {0}")]
    UnknownNetwork(u8),

    #[error("Address prefix is for {prefix:?} but header is for {header:?}")]
    NetworkMismatch {
        prefix: AddressNetwork,
        header: AddressNetwork,
    },

    #[error("Expected {expected} address bytes, got {actual}")]
    BadLength { expected: usize, actual: usize },

    #[error("Pointer ran out of data")]
    PointerTruncated,

    #[error("Pointer value overflows 64 bits")]
    PointerOverflow,

    #[error("Trailing bytes after pointer")]
    PointerTrailingBytes,
}

/// Address network identifier
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressNetwork {
    /// Mainnet
    #[default]
    Main,

    /// Testnet
    Test,
}

impl AddressNetwork {
    fn id(&self) -> u8 {
        match self {
            AddressNetwork::Main => 1,
            AddressNetwork::Test => 0,
        }
    }

    fn from_id(id: u8) -> Result<Self, AddressError> {
        match id {
            1 => Ok(AddressNetwork::Main),
            0 => Ok(AddressNetwork::Test),
            other => Err(AddressError::UnknownNetwork(other)),
        }
    }

    fn hrp(&self) -> &'static str {
        match self {
            AddressNetwork::Main => "addr",
            AddressNetwork::Test => "addr_test",
        }
    }

    fn from_hrp(hrp: &str) -> Result<Self, AddressError> {
        match hrp {
            "addr" => Ok(AddressNetwork::Main),
            "addr_test" => Ok(AddressNetwork::Test),
            other => Err(AddressError::UnknownPrefix(other.to_string())),
        }
    }
}

/// Spending or staking authorization: a key hash or a script hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Credential {
    KeyHash(KeyHash),
    ScriptHash(ScriptHash),
}

impl Credential {
    pub fn from_public_key(key: &PublicKey) -> Self {
        Self::KeyHash(key.hash())
    }

    pub fn hash(&self) -> &[u8; HASH_SIZE] {
        match self {
            Credential::KeyHash(hash) | Credential::ScriptHash(hash) => hash,
        }
    }

    fn is_script(&self) -> bool {
        matches!(self, Credential::ScriptHash(_))
    }

    fn from_parts(script: bool, bytes: &[u8]) -> Result<Self, AddressError> {
        let hash = KeyHash::try_from(bytes).map_err(|_| AddressError::BadLength {
            expected: HASH_SIZE,
            actual: bytes.len(),
        })?;
        Ok(if script {
            Credential::ScriptHash(hash)
        } else {
            Credential::KeyHash(hash)
        })
    }
}

/// Delegation pointer to a stake registration certificate
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Pointer {
    /// Slot number
    pub slot: u64,

    /// Transaction index within the slot
    pub tx_index: u64,

    /// Certificate index within the transaction
    pub cert_index: u64,
}

/// Where the address delegates its stake
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelegationPart {
    /// No delegation (enterprise addresses)
    #[default]
    None,

    /// Delegation to a stake credential
    Stake(Credential),

    /// Delegation via a certificate pointer
    Pointer(Pointer),
}

/// Address kind, derived from the delegation part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    Base,
    Pointer,
    Enterprise,
}

/// A Shelley-era payment address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    /// Network id
    pub network: AddressNetwork,

    /// Payment part
    pub payment: Credential,

    /// Delegation part
    pub delegation: DelegationPart,
}

impl Address {
    /// Enterprise address paying to `payment`
    pub fn enterprise(network: AddressNetwork, payment: Credential) -> Self {
        Self {
            network,
            payment,
            delegation: DelegationPart::None,
        }
    }

    /// Base address paying to `payment` and delegating to `stake`
    pub fn base(network: AddressNetwork, payment: Credential, stake: Credential) -> Self {
        Self {
            network,
            payment,
            delegation: DelegationPart::Stake(stake),
        }
    }

    pub fn kind(&self) -> AddressKind {
        match self.delegation {
            DelegationPart::Stake(_) => AddressKind::Base,
            DelegationPart::Pointer(_) => AddressKind::Pointer,
            DelegationPart::None => AddressKind::Enterprise,
        }
    }

    /// Header type nibble, 0 to 7
    pub fn type_id(&self) -> u8 {
        let payment_bit = self.payment.is_script() as u8;
        let delegation_bits = match self.delegation {
            DelegationPart::Stake(credential) => credential.is_script() as u8,
            DelegationPart::Pointer(_) => 2,
            DelegationPart::None => 3,
        };
        payment_bit | (delegation_bits << 1)
    }

    /// Raw header-prefixed bytes, as carried in a transaction output
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = vec![(self.type_id() << 4) | self.network.id()];
        data.extend_from_slice(self.payment.hash());

        match &self.delegation {
            DelegationPart::None => {}
            DelegationPart::Stake(credential) => data.extend_from_slice(credential.hash()),
            DelegationPart::Pointer(pointer) => {
                let mut encoder = VarIntEncoder::new();
                encoder.push(pointer.slot);
                encoder.push(pointer.tx_index);
                encoder.push(pointer.cert_index);
                data.extend(encoder.into_vec());
            }
        }
        data
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, AddressError> {
        let header = *data.first().ok_or(AddressError::Empty)?;
        let type_id = header >> 4;
        if type_id > 7 {
            return Err(AddressError::UnsupportedType(type_id));
        }
        let network = AddressNetwork::from_id(header & 0x0f)?;

        let body = &data[1..];
        if body.len() < HASH_SIZE {
            return Err(AddressError::BadLength {
                expected: 1 + HASH_SIZE,
                actual: data.len(),
            });
        }
        let (payment_hash, rest) = body.split_at(HASH_SIZE);
        let payment = Credential::from_parts(type_id & 0x01 == 1, payment_hash)?;

        let exact = |expected: usize| {
            if data.len() == expected {
                Ok(())
            } else {
                Err(AddressError::BadLength {
                    expected,
                    actual: data.len(),
                })
            }
        };

        let delegation = match type_id >> 1 {
            0 | 1 => {
                exact(1 + 2 * HASH_SIZE)?;
                DelegationPart::Stake(Credential::from_parts(type_id >> 1 == 1, rest)?)
            }
            2 => {
                let mut decoder = VarIntDecoder::new(rest);
                let pointer = Pointer {
                    slot: decoder.read()?,
                    tx_index: decoder.read()?,
                    cert_index: decoder.read()?,
                };
                if !decoder.is_finished() {
                    return Err(AddressError::PointerTrailingBytes);
                }
                DelegationPart::Pointer(pointer)
            }
            _ => {
                exact(1 + HASH_SIZE)?;
                DelegationPart::None
            }
        };

        Ok(Self {
            network,
            payment,
            delegation,
        })
    }

    /// Convert to addr1xxx / addr_test1xxx form
    pub fn to_bech32(&self) -> Result<String, AddressError> {
        let hrp = bech32::Hrp::parse(self.network.hrp())
            .map_err(|e| AddressError::Bech32(e.to_string()))?;
        bech32::encode::<bech32::Bech32>(hrp, &self.to_bytes())
            .map_err(|e| AddressError::Bech32(e.to_string()))
    }

    /// Read from bech32 text. The prefix network must agree with the header.
    pub fn from_bech32(text: &str) -> Result<Self, AddressError> {
        let (hrp, data) = bech32::decode(text).map_err(|e| AddressError::Bech32(e.to_string()))?;
        let prefix = AddressNetwork::from_hrp(hrp.as_str())?;
        let address = Self::from_bytes(&data)?;
        if address.network != prefix {
            return Err(AddressError::NetworkMismatch {
                prefix,
                header: address.network,
            });
        }
        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_bech32().map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bech32(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let text = self.to_bech32().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl<C> minicbor::Encode<C> for Address {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.bytes(&self.to_bytes())?.ok()
    }
}
