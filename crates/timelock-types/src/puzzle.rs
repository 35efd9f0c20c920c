//! Persisted puzzle records.
//!
//! Every record is an RLP list `[version, N, a, steps, cipher_key]`. An artifact
//! that carries a sealed payload appends a nested `[scheme, ciphertext]` list.
//! Integers are minimal big-endian byte strings; zero is the empty string.
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use rug::Integer;
use rug::integer::Order;

use crate::TypesError;

/// Version tag written as the first item of every record.
pub const FORMAT_VERSION: u8 = 1;

const PUZZLE_FIELDS: usize = 5;

/// Public half of a time-lock puzzle.
///
/// Holds everything a solver needs and nothing that allows skipping the
/// sequential squarings: the totient of `N` never appears here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleDescriptor {
    modulus: Integer,    // N - product of two secret primes
    base: Integer,       // a - starting value in [0, N)
    steps: u64,          // t - number of squarings
    cipher_key: Integer, // (secret + a^(2^t)) mod N
}

impl PuzzleDescriptor {
    pub fn new(
        modulus: Integer,
        base: Integer,
        steps: u64,
        cipher_key: Integer,
    ) -> Result<Self, TypesError> {
        validate_modulus(&modulus)?;
        if steps == 0 {
            return Err(TypesError::InvalidDescriptor(
                "steps must be positive".to_string(),
            ));
        }
        validate_residue("base", &base, &modulus)?;
        validate_residue("cipher key", &cipher_key, &modulus)?;

        Ok(PuzzleDescriptor {
            modulus,
            base,
            steps,
            cipher_key,
        })
    }

    pub fn modulus(&self) -> &Integer {
        &self.modulus
    }

    pub fn base(&self) -> &Integer {
        &self.base
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn cipher_key(&self) -> &Integer {
        &self.cipher_key
    }

    pub fn to_rlp_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    pub fn from_rlp_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        let raw = RawRecord::from_bytes(bytes)?;
        if raw.sealed.is_some() {
            return Err(TypesError::Parse(
                "descriptor must not carry a payload".to_string(),
            ));
        }
        PuzzleDescriptor::new(raw.modulus, raw.base, raw.steps, raw.cipher_key)
    }
}

impl Encodable for PuzzleDescriptor {
    fn rlp_append(&self, s: &mut RlpStream) {
        append_puzzle_fields(
            s.begin_list(PUZZLE_FIELDS),
            &self.modulus,
            &self.base,
            self.steps,
            &self.cipher_key,
        );
    }
}

/// Mid-solve snapshot of a puzzle.
///
/// A checkpoint has the same shape as a descriptor: the accumulator takes the
/// place of the base and the remaining squarings take the place of the step
/// count. A checkpoint with nothing remaining is a finished solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    modulus: Integer,
    accumulator: Integer,
    remaining: u64,
    cipher_key: Integer,
}

impl Checkpoint {
    pub fn new(
        modulus: Integer,
        accumulator: Integer,
        remaining: u64,
        cipher_key: Integer,
    ) -> Result<Self, TypesError> {
        validate_modulus(&modulus)?;
        validate_residue("accumulator", &accumulator, &modulus)?;
        validate_residue("cipher key", &cipher_key, &modulus)?;

        Ok(Checkpoint {
            modulus,
            accumulator,
            remaining,
            cipher_key,
        })
    }

    /// The snapshot taken before the first squaring.
    pub fn start_of(descriptor: &PuzzleDescriptor) -> Self {
        Checkpoint {
            modulus: descriptor.modulus.clone(),
            accumulator: descriptor.base.clone(),
            remaining: descriptor.steps,
            cipher_key: descriptor.cipher_key.clone(),
        }
    }

    pub fn modulus(&self) -> &Integer {
        &self.modulus
    }

    pub fn accumulator(&self) -> &Integer {
        &self.accumulator
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn cipher_key(&self) -> &Integer {
        &self.cipher_key
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }

    /// Whether this snapshot was derived from `descriptor`.
    pub fn belongs_to(&self, descriptor: &PuzzleDescriptor) -> bool {
        self.modulus == descriptor.modulus
            && self.cipher_key == descriptor.cipher_key
            && self.remaining <= descriptor.steps
    }

    /// A later snapshot of the same puzzle.
    ///
    /// `accumulator` must already be reduced modulo `N`.
    pub fn with_progress(&self, accumulator: Integer, remaining: u64) -> Checkpoint {
        debug_assert!(accumulator >= 0 && accumulator < self.modulus);
        debug_assert!(remaining <= self.remaining);
        Checkpoint {
            modulus: self.modulus.clone(),
            accumulator,
            remaining,
            cipher_key: self.cipher_key.clone(),
        }
    }

    /// Re-reads the snapshot as a fresh puzzle with the remaining work.
    pub fn to_descriptor(&self) -> Result<PuzzleDescriptor, TypesError> {
        PuzzleDescriptor::new(
            self.modulus.clone(),
            self.accumulator.clone(),
            self.remaining,
            self.cipher_key.clone(),
        )
    }

    pub fn to_rlp_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    pub fn from_rlp_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        let raw = RawRecord::from_bytes(bytes)?;
        if raw.sealed.is_some() {
            return Err(TypesError::Parse(
                "checkpoint must not carry a payload".to_string(),
            ));
        }
        Checkpoint::new(raw.modulus, raw.base, raw.steps, raw.cipher_key)
    }
}

impl Encodable for Checkpoint {
    fn rlp_append(&self, s: &mut RlpStream) {
        append_puzzle_fields(
            s.begin_list(PUZZLE_FIELDS),
            &self.modulus,
            &self.accumulator,
            self.remaining,
            &self.cipher_key,
        );
    }
}

/// How a payload was sealed.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SealScheme {
    /// AES-192-ECB with length padding. No nonce, no integrity tag.
    Legacy = 0,
    /// AES-192-GCM with a random nonce prepended to the ciphertext.
    Authenticated = 1,
}

impl SealScheme {
    pub fn from_code(code: u8) -> Option<SealScheme> {
        match code {
            0 => Some(SealScheme::Legacy),
            1 => Some(SealScheme::Authenticated),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    pub scheme: SealScheme,
    pub bytes: Vec<u8>,
}

impl Encodable for SealedPayload {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.scheme.code());
        s.append(&self.bytes);
    }
}

impl Decodable for SealedPayload {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let code: u8 = rlp.val_at(0)?;
        let scheme =
            SealScheme::from_code(code).ok_or(DecoderError::Custom("Unknown seal scheme"))?;
        Ok(SealedPayload {
            scheme,
            bytes: rlp.val_at(1)?,
        })
    }
}

/// The record handed to storage: a descriptor and, optionally, the payload
/// sealed under its secret key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleArtifact {
    pub descriptor: PuzzleDescriptor,
    pub sealed: Option<SealedPayload>,
}

impl PuzzleArtifact {
    pub fn new(descriptor: PuzzleDescriptor, sealed: Option<SealedPayload>) -> Self {
        PuzzleArtifact { descriptor, sealed }
    }

    pub fn to_rlp_bytes(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    pub fn from_rlp_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        let raw = RawRecord::from_bytes(bytes)?;
        let descriptor =
            PuzzleDescriptor::new(raw.modulus, raw.base, raw.steps, raw.cipher_key)?;
        Ok(PuzzleArtifact {
            descriptor,
            sealed: raw.sealed,
        })
    }
}

impl Encodable for PuzzleArtifact {
    fn rlp_append(&self, s: &mut RlpStream) {
        let d = &self.descriptor;
        match &self.sealed {
            Some(sealed) => {
                append_puzzle_fields(
                    s.begin_list(PUZZLE_FIELDS + 1),
                    &d.modulus,
                    &d.base,
                    d.steps,
                    &d.cipher_key,
                );
                s.append(sealed);
            }
            None => d.rlp_append(s),
        }
    }
}

/// Fields of a record after structural decoding but before the invariants of
/// the concrete type are checked.
struct RawRecord {
    modulus: Integer,
    base: Integer,
    steps: u64,
    cipher_key: Integer,
    sealed: Option<SealedPayload>,
}

impl RawRecord {
    fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        let rlp = Rlp::new(bytes);
        let info = rlp.payload_info()?;
        if info.header_len + info.value_len != bytes.len() {
            return Err(TypesError::Parse(format!(
                "{} trailing bytes after record",
                bytes.len().saturating_sub(info.header_len + info.value_len)
            )));
        }
        if !rlp.is_list() {
            return Err(TypesError::Parse("record is not a list".to_string()));
        }
        Ok(Self::decode(&rlp)?)
    }
}

impl Decodable for RawRecord {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        let count = rlp.item_count()?;
        if count != PUZZLE_FIELDS && count != PUZZLE_FIELDS + 1 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let version: u8 = rlp.val_at(0)?;
        if version != FORMAT_VERSION {
            return Err(DecoderError::Custom("Unsupported record version"));
        }
        Ok(RawRecord {
            modulus: decode_integer(&rlp.at(1)?)?,
            base: decode_integer(&rlp.at(2)?)?,
            steps: rlp.val_at(3)?,
            cipher_key: decode_integer(&rlp.at(4)?)?,
            sealed: if count > PUZZLE_FIELDS {
                Some(rlp.val_at(PUZZLE_FIELDS)?)
            } else {
                None
            },
        })
    }
}

fn append_puzzle_fields(
    s: &mut RlpStream,
    modulus: &Integer,
    base: &Integer,
    steps: u64,
    cipher_key: &Integer,
) {
    s.append(&FORMAT_VERSION);
    s.append(&encode_integer(modulus));
    s.append(&encode_integer(base));
    s.append(&steps);
    s.append(&encode_integer(cipher_key));
}

fn encode_integer(value: &Integer) -> Vec<u8> {
    value.to_digits::<u8>(Order::MsfBe)
}

fn decode_integer(rlp: &Rlp) -> Result<Integer, DecoderError> {
    let bytes: Vec<u8> = rlp.as_val()?;
    if bytes.first() == Some(&0) {
        return Err(DecoderError::Custom("Integer has leading zero bytes"));
    }
    Ok(Integer::from_digits(&bytes, Order::MsfBe))
}

fn validate_modulus(modulus: &Integer) -> Result<(), TypesError> {
    if *modulus <= 1 {
        return Err(TypesError::InvalidDescriptor(format!(
            "modulus must be greater than 1, got {}",
            modulus
        )));
    }
    Ok(())
}

fn validate_residue(name: &str, value: &Integer, modulus: &Integer) -> Result<(), TypesError> {
    if *value < 0 || value >= modulus {
        return Err(TypesError::InvalidDescriptor(format!(
            "{} is outside [0, N)",
            name
        )));
    }
    Ok(())
}
