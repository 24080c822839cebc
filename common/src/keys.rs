//! Hierarchical deterministic Ed25519 keys (BIP32-Ed25519, Icarus master keys)
//!
//! Extended private keys are 96 bytes: a 64-byte extended secret (`kL | kR`)
//! followed by a 32-byte chain code. Keys travel as bech32 text whose prefix names
//! the key's role and kind, e.g. `root_xsk`, `addr_xvk` or `addr_sk`.

use crate::{
    ed25519::{PublicKey, Signature},
    hash::KeyHash,
};
use cryptoxide::ed25519;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::{fmt, str::FromStr};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Child indices at or above this value use hardened derivation
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

const PBKDF2_ROUNDS: u32 = 4096;

type HmacSha512 = Hmac<Sha512>;

/// Key decoding and derivation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid bech32 key text: {0}")]
    Bech32(String),

    #[error("Unknown key prefix '{0}'")]
    UnknownPrefix(String),

    #[error("Key '{0}' cannot sign")]
    NotASigningKey(String),

    #[error("Expected {expected} bytes for a '{prefix}' key, got {actual}")]
    BadLength {
        prefix: String,
        expected: usize,
        actual: usize,
    },

    #[error("Secret is not a clamped Ed25519 scalar")]
    InvalidScalar,

    #[error("Invalid derivation path '{0}'")]
    InvalidPath(String),

    #[error("Derivation failed: {0}")]
    Derivation(String),
}

/// What a key is used for; selects the first half of the bech32 prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRole {
    Root,
    Account,
    Address,
    Stake,
}

impl KeyRole {
    fn as_str(&self) -> &'static str {
        match self {
            KeyRole::Root => "root",
            KeyRole::Account => "acct",
            KeyRole::Address => "addr",
            KeyRole::Stake => "stake",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "root" => Some(KeyRole::Root),
            "acct" => Some(KeyRole::Account),
            "addr" => Some(KeyRole::Address),
            "stake" => Some(KeyRole::Stake),
            _ => None,
        }
    }
}

/// Shape of the key material; selects the second half of the bech32 prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Extended secret plus chain code (`xsk`, 96 bytes)
    ExtendedPrivate,

    /// Public key plus chain code (`xvk`, 64 bytes)
    ExtendedPublic,

    /// Extended secret without chain code (`sk`, 64 bytes)
    Signing,
}

impl KeyKind {
    fn as_str(&self) -> &'static str {
        match self {
            KeyKind::ExtendedPrivate => "xsk",
            KeyKind::ExtendedPublic => "xvk",
            KeyKind::Signing => "sk",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "xsk" => Some(KeyKind::ExtendedPrivate),
            "xvk" => Some(KeyKind::ExtendedPublic),
            "sk" => Some(KeyKind::Signing),
            _ => None,
        }
    }

    fn payload_len(&self) -> usize {
        match self {
            KeyKind::ExtendedPrivate => XPrv::SIZE,
            KeyKind::ExtendedPublic => XPub::SIZE,
            KeyKind::Signing => PrivateKey::SIZE,
        }
    }
}

/// Decoded bech32 key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPrefix {
    pub role: KeyRole,
    pub kind: KeyKind,
}

impl KeyPrefix {
    pub fn new(role: KeyRole, kind: KeyKind) -> Self {
        Self { role, kind }
    }

    pub fn hrp(&self) -> String {
        format!("{}_{}", self.role.as_str(), self.kind.as_str())
    }

    pub fn parse(hrp: &str) -> Result<Self, KeyError> {
        let (role, kind) =
            hrp.split_once('_').ok_or_else(|| KeyError::UnknownPrefix(hrp.to_string()))?;
        match (KeyRole::parse(role), KeyKind::parse(kind)) {
            (Some(role), Some(kind)) => Ok(Self { role, kind }),
            _ => Err(KeyError::UnknownPrefix(hrp.to_string())),
        }
    }
}

fn encode_key(prefix: KeyPrefix, data: &[u8]) -> Result<String, KeyError> {
    let hrp = bech32::Hrp::parse(&prefix.hrp()).map_err(|e| KeyError::Bech32(e.to_string()))?;
    bech32::encode::<bech32::Bech32>(hrp, data).map_err(|e| KeyError::Bech32(e.to_string()))
}

fn decode_key(text: &str) -> Result<(KeyPrefix, Zeroizing<Vec<u8>>), KeyError> {
    let (hrp, data) = bech32::decode(text).map_err(|e| KeyError::Bech32(e.to_string()))?;
    let data = Zeroizing::new(data);
    let prefix = KeyPrefix::parse(hrp.as_str())?;
    let expected = prefix.kind.payload_len();
    if data.len() != expected {
        return Err(KeyError::BadLength {
            prefix: prefix.hrp(),
            expected,
            actual: data.len(),
        });
    }
    Ok((prefix, data))
}

/// `kL` must be a multiple of the cofactor with the top bit clear
fn is_clamped(extended: &[u8]) -> bool {
    extended[0] & 0b0000_0111 == 0 && extended[31] & 0b1000_0000 == 0
}

fn hmac_sha512(key: &[u8], tag: u8, parts: &[&[u8]]) -> Result<Zeroizing<[u8; 64]>, KeyError> {
    let mut mac =
        HmacSha512::new_from_slice(key).map_err(|e| KeyError::Derivation(e.to_string()))?;
    mac.update(&[tag]);
    for part in parts {
        mac.update(part);
    }
    let mut out = Zeroizing::new([0u8; 64]);
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

// kL + 8 * zL, zL being the first 28 bytes of Z
fn add_28_mul8(out: &mut [u8], x: &[u8], y: &[u8]) {
    let mut carry: u16 = 0;
    for i in 0..28 {
        let r = x[i] as u16 + ((y[i] as u16) << 3) + carry;
        out[i] = (r & 0xff) as u8;
        carry = r >> 8;
    }
    for i in 28..32 {
        let r = x[i] as u16 + carry;
        out[i] = (r & 0xff) as u8;
        carry = r >> 8;
    }
}

// kR + zR mod 2^256
fn add_256(out: &mut [u8], x: &[u8], y: &[u8]) {
    let mut carry: u16 = 0;
    for i in 0..32 {
        let r = x[i] as u16 + y[i] as u16 + carry;
        out[i] = (r & 0xff) as u8;
        carry = r >> 8;
    }
}

/// Harden a child index
pub fn harden(index: u32) -> u32 {
    index | HARDENED_OFFSET
}

/// A 64-byte extended Ed25519 secret. Signs, but cannot derive children.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 64]);

impl PrivateKey {
    pub const SIZE: usize = 64;

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != Self::SIZE {
            return Err(KeyError::BadLength {
                prefix: KeyKind::Signing.as_str().to_string(),
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        if !is_clamped(bytes) {
            return Err(KeyError::InvalidScalar);
        }
        let mut key = Self([0u8; 64]);
        key.0.copy_from_slice(bytes);
        Ok(key)
    }

    pub fn public(&self) -> PublicKey {
        PublicKey::from(ed25519::extended_to_public(&self.0))
    }

    /// Deterministic Ed25519 signature of `message`
    pub fn sign<T: AsRef<[u8]>>(&self, message: T) -> Signature {
        Signature::from(ed25519::signature_extended(message.as_ref(), &self.0))
    }

    pub fn to_bech32(&self, role: KeyRole) -> Result<String, KeyError> {
        encode_key(KeyPrefix::new(role, KeyKind::Signing), &self.0)
    }

    pub fn from_bech32(text: &str) -> Result<(KeyRole, Self), KeyError> {
        let (prefix, data) = decode_key(text)?;
        match prefix.kind {
            KeyKind::Signing => Ok((prefix.role, Self::from_slice(&data)?)),
            _ => Err(KeyError::UnknownPrefix(prefix.hrp())),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PrivateKey").field(&self.public()).finish()
    }
}

/// Extended private key: signs and derives children
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct XPrv([u8; 96]);

impl XPrv {
    pub const SIZE: usize = 96;

    /// Icarus master key: PBKDF2-HMAC-SHA512 of the entropy keyed by the passphrase,
    /// then clamped into a valid extended scalar
    pub fn from_entropy(entropy: &[u8], passphrase: &[u8]) -> Self {
        let mut key = Self([0u8; 96]);
        pbkdf2::pbkdf2_hmac::<Sha512>(passphrase, entropy, PBKDF2_ROUNDS, &mut key.0);
        key.0[0] &= 0b1111_1000;
        key.0[31] &= 0b0001_1111;
        key.0[31] |= 0b0100_0000;
        key
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != Self::SIZE {
            return Err(KeyError::BadLength {
                prefix: KeyKind::ExtendedPrivate.as_str().to_string(),
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        if !is_clamped(bytes) {
            return Err(KeyError::InvalidScalar);
        }
        let mut key = Self([0u8; 96]);
        key.0.copy_from_slice(bytes);
        Ok(key)
    }

    pub fn chain_code(&self) -> [u8; 32] {
        let mut cc = [0u8; 32];
        cc.copy_from_slice(&self.0[64..]);
        cc
    }

    /// The signing half, without the chain code
    pub fn private_key(&self) -> PrivateKey {
        let mut key = PrivateKey([0u8; 64]);
        key.0.copy_from_slice(&self.0[..64]);
        key
    }

    pub fn public(&self) -> XPub {
        XPub {
            public_key: self.private_key().public(),
            chain_code: self.chain_code(),
        }
    }

    pub fn sign<T: AsRef<[u8]>>(&self, message: T) -> Signature {
        self.private_key().sign(message)
    }

    /// Derive child `index` (V2 scheme). Indices from [`HARDENED_OFFSET`] up are hardened.
    pub fn derive(&self, index: u32) -> Result<Self, KeyError> {
        let (kl, rest) = self.0.split_at(32);
        let (kr, cc) = rest.split_at(32);
        let index_bytes = index.to_le_bytes();

        let (z, i) = if index >= HARDENED_OFFSET {
            (
                hmac_sha512(cc, 0x00, &[kl, kr, index_bytes.as_slice()])?,
                hmac_sha512(cc, 0x01, &[kl, kr, index_bytes.as_slice()])?,
            )
        } else {
            let public = self.private_key().public();
            (
                hmac_sha512(cc, 0x02, &[public.as_ref(), index_bytes.as_slice()])?,
                hmac_sha512(cc, 0x03, &[public.as_ref(), index_bytes.as_slice()])?,
            )
        };

        let mut child = Self([0u8; 96]);
        add_28_mul8(&mut child.0[..32], kl, &z[..28]);
        add_256(&mut child.0[32..64], kr, &z[32..]);
        child.0[64..].copy_from_slice(&i[32..]);
        Ok(child)
    }

    pub fn derive_path(&self, path: &DerivationPath) -> Result<Self, KeyError> {
        let mut key = self.clone();
        for index in path.indices() {
            key = key.derive(*index)?;
        }
        Ok(key)
    }

    pub fn to_bech32(&self, role: KeyRole) -> Result<String, KeyError> {
        encode_key(KeyPrefix::new(role, KeyKind::ExtendedPrivate), &self.0)
    }

    pub fn from_bech32(text: &str) -> Result<(KeyRole, Self), KeyError> {
        let (prefix, data) = decode_key(text)?;
        match prefix.kind {
            KeyKind::ExtendedPrivate => Ok((prefix.role, Self::from_slice(&data)?)),
            _ => Err(KeyError::UnknownPrefix(prefix.hrp())),
        }
    }
}

impl fmt::Debug for XPrv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("XPrv").field(&self.public().public_key).finish()
    }
}

/// Extended public key: verification key plus chain code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XPub {
    public_key: PublicKey,
    chain_code: [u8; 32],
}

impl XPub {
    pub const SIZE: usize = 64;

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn chain_code(&self) -> [u8; 32] {
        self.chain_code
    }

    pub fn hash(&self) -> KeyHash {
        self.public_key.hash()
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(self.public_key.as_ref());
        bytes[32..].copy_from_slice(&self.chain_code);
        bytes
    }

    pub fn to_bech32(&self, role: KeyRole) -> Result<String, KeyError> {
        encode_key(KeyPrefix::new(role, KeyKind::ExtendedPublic), &self.to_bytes())
    }

    pub fn from_bech32(text: &str) -> Result<(KeyRole, Self), KeyError> {
        let (prefix, data) = decode_key(text)?;
        if prefix.kind != KeyKind::ExtendedPublic {
            return Err(KeyError::UnknownPrefix(prefix.hrp()));
        }
        let public_key = PublicKey::try_from(&data[..32])
            .map_err(|e| KeyError::Derivation(e.to_string()))?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&data[32..]);
        Ok((
            prefix.role,
            Self {
                public_key,
                chain_code,
            },
        ))
    }
}

/// Decode any key text able to sign: `*_xsk` or `*_sk`
pub fn decode_signing_key(text: &str) -> Result<PrivateKey, KeyError> {
    let (prefix, data) = decode_key(text)?;
    match prefix.kind {
        KeyKind::ExtendedPrivate => Ok(XPrv::from_slice(&data)?.private_key()),
        KeyKind::Signing => PrivateKey::from_slice(&data),
        KeyKind::ExtendedPublic => Err(KeyError::NotASigningKey(prefix.hrp())),
    }
}

/// Derivation path such as `m/1852'/1815'/0'/0/0`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    pub fn new(indices: Vec<u32>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    /// CIP-1852 path of an address key: `m/1852'/1815'/account'/role/index`
    pub fn cip1852(account: u32, role: u32, index: u32) -> Self {
        Self(vec![harden(1852), harden(1815), harden(account), role, index])
    }
}

impl FromStr for DerivationPath {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || KeyError::InvalidPath(s.to_string());
        let mut segments = s.split('/');
        if segments.next() != Some("m") {
            return Err(invalid());
        }

        let mut indices = Vec::new();
        for segment in segments {
            let (number, hardened) = match segment.strip_suffix(['\'', 'h', 'H']) {
                Some(number) => (number, true),
                None => (segment, false),
            };
            let index: u32 = number.parse().map_err(|_| invalid())?;
            if index >= HARDENED_OFFSET {
                return Err(invalid());
            }
            indices.push(if hardened { harden(index) } else { index });
        }
        Ok(Self(indices))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for index in &self.0 {
            if *index >= HARDENED_OFFSET {
                write!(f, "/{}'", index - HARDENED_OFFSET)?;
            } else {
                write!(f, "/{index}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT_XSK: &str = "root_xsk1ypsc2rc9d6ss70k68mgcqlwdujvhk4c877fyxut6e793htm8t9rp7qv6erhk2hx3nngrp7y8dcegd4wjvjlh369kpqkxq8j72whff7ewp4kcut2mv5dvmk9t36dzkaf89jvhm5pg3wen2jq4zfcfgyg6zcahakt8";

    const ADDR_SK: &str = "addr_sk1uqpfmhkflccgy9wzdrgshtjez963a0rj2apjxzga9dysw5y4tap0ame6lckwe94wq68dyc2669vp7e64rhmd0lmyf0gy3k7aeqt5dcc8x0qzj";

    fn root() -> XPrv {
        XPrv::from_entropy(b"change address", b"foo")
    }

    #[test]
    fn icarus_root_from_entropy() {
        let root = root();
        assert_eq!(
            root.public().public_key().to_string(),
            "81865648a153eb8697f6298d6e85e55df275efdaf69e4d9ee15cd8a5a26959e4"
        );
        assert_eq!(root.to_bech32(KeyRole::Root).unwrap(), ROOT_XSK);
    }

    #[test]
    fn hardened_then_soft_derivation() {
        let purpose = root().derive(harden(1852)).unwrap();
        assert_eq!(
            purpose.public().public_key().to_string(),
            "6b477eaeac4453b0b04b64ae1ec58263fd6a6984e8fc8e42e7ee706a9c6005e3"
        );

        let child = purpose.derive(0).unwrap();
        assert_eq!(
            child.public().public_key().to_string(),
            "cdf720139dc144eed83f238cdd908725aca54b524eca92d8c32687f6b1d156ca"
        );
    }

    #[test]
    fn derivation_is_deterministic_and_index_sensitive() {
        let root = root();
        let a = root.derive(harden(0)).unwrap();
        let b = root.derive(harden(0)).unwrap();
        let soft = root.derive(0).unwrap();
        assert_eq!(a.public(), b.public());
        assert_ne!(a.public(), soft.public());
        assert_ne!(a.public(), root.public());
        assert_ne!(a.chain_code(), root.chain_code());
    }

    #[test]
    fn derive_path_matches_stepwise_derivation() {
        let path: DerivationPath = "m/1852'/1815'/0'/0/0".parse().unwrap();
        assert_eq!(path, DerivationPath::cip1852(0, 0, 0));
        assert_eq!(path.to_string(), "m/1852'/1815'/0'/0/0");

        let root = root();
        let stepwise = root
            .derive(harden(1852))
            .and_then(|k| k.derive(harden(1815)))
            .and_then(|k| k.derive(harden(0)))
            .and_then(|k| k.derive(0))
            .and_then(|k| k.derive(0))
            .unwrap();
        assert_eq!(root.derive_path(&path).unwrap().public(), stepwise.public());
    }

    #[test]
    fn rejects_bad_paths() {
        for path in ["", "1852'/0", "m/x", "m/2147483648", "m//0"] {
            assert!(
                matches!(path.parse::<DerivationPath>(), Err(KeyError::InvalidPath(_))),
                "{path}"
            );
        }
    }

    #[test]
    fn signs_deterministically() {
        let key = root().private_key();
        let digest = [0u8; 32];
        let signature = key.sign(digest);
        assert_eq!(
            signature.to_string(),
            "2625bd21385df51162d327633f1efd0ad574d6f6d986b2575017cea3406eb9adc391e8b191d94b3aae1562e787c4a1dd79f0daa829d7c2405756d3ff01e34b0d"
        );
        assert!(key.public().verify(digest, &signature));
        assert!(!key.public().verify([1u8; 32], &signature));
    }

    #[test]
    fn xsk_round_trip_signs_identically() {
        let root = root();
        let text = root.to_bech32(KeyRole::Account).unwrap();
        assert!(text.starts_with("acct_xsk1"));

        let (role, decoded) = XPrv::from_bech32(&text).unwrap();
        assert_eq!(role, KeyRole::Account);
        assert_eq!(decoded.sign(b"message"), root.sign(b"message"));
        assert_eq!(decoded.public(), root.public());
    }

    #[test]
    fn xvk_round_trip() {
        let public = root().public();
        let text = public.to_bech32(KeyRole::Root).unwrap();
        assert!(text.starts_with("root_xvk1"));
        assert_eq!(XPub::from_bech32(&text).unwrap(), (KeyRole::Root, public));
    }

    #[test]
    fn decodes_plain_signing_key() {
        let key = decode_signing_key(ADDR_SK).unwrap();
        assert_eq!(
            key.public().to_string(),
            "8e875f567a6933fd28f8b4d5b4461a6aa86ab0d9e4267000085c0c5ebeadefdc"
        );
        assert_eq!(key.to_bech32(KeyRole::Address).unwrap(), ADDR_SK);
    }

    #[test]
    fn decodes_extended_signing_key() {
        let key = decode_signing_key(ROOT_XSK).unwrap();
        assert_eq!(key.public(), root().public().public_key());
    }

    #[test]
    fn rejects_checksum_failure() {
        let mut corrupted = ROOT_XSK.to_string();
        let last = corrupted.pop().unwrap();
        corrupted.push(if last == 'q' { 'p' } else { 'q' });
        assert!(matches!(decode_signing_key(&corrupted), Err(KeyError::Bech32(_))));
    }

    #[test]
    fn rejects_unknown_prefix() {
        let hrp = bech32::Hrp::parse("addr_vk").unwrap();
        let text = bech32::encode::<bech32::Bech32>(hrp, &[0u8; 32]).unwrap();
        assert_eq!(
            decode_signing_key(&text).unwrap_err(),
            KeyError::UnknownPrefix("addr_vk".to_string())
        );
    }

    #[test]
    fn rejects_public_key_for_signing() {
        let text = root().public().to_bech32(KeyRole::Address).unwrap();
        assert!(matches!(decode_signing_key(&text), Err(KeyError::NotASigningKey(_))));
    }

    #[test]
    fn rejects_wrong_payload_length() {
        let hrp = bech32::Hrp::parse("addr_xsk").unwrap();
        let text = bech32::encode::<bech32::Bech32>(hrp, &[0u8; 64]).unwrap();
        assert!(matches!(
            decode_signing_key(&text),
            Err(KeyError::BadLength {
                expected: 96,
                actual: 64,
                ..
            })
        ));
    }

    #[test]
    fn rejects_unclamped_secret() {
        let mut bytes = [0u8; 96];
        bytes[0] = 1;
        assert_eq!(XPrv::from_slice(&bytes).unwrap_err(), KeyError::InvalidScalar);

        let hrp = bech32::Hrp::parse("addr_sk").unwrap();
        let text = bech32::encode::<bech32::Bech32>(hrp, &bytes[..64]).unwrap();
        assert_eq!(decode_signing_key(&text).unwrap_err(), KeyError::InvalidScalar);
    }

    #[test]
    fn debug_output_hides_secret() {
        let rendered = format!("{:?}", root());
        assert!(rendered.starts_with("XPrv("));
        assert!(rendered.contains("81865648a153eb86"));
    }
}
