use aes_gcm::aead::Aead;
use aes_gcm::aead::consts::U12;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aes::Aes192;
use aes_gcm::aes::cipher::{BlockDecrypt, BlockEncrypt};
use aes_gcm::{AesGcm, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use rug::Integer;
use rug::integer::Order;
use timelock_types::{SealScheme, SealedPayload};

use crate::PuzzleError;
use crate::puzzle::SecretKey;

/// AES-192 key length in bytes.
pub const KEY_SIZE: usize = 24;
pub const BLOCK_SIZE: usize = 16;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Seals payloads under a recovered puzzle key.
///
/// New payloads are sealed with the configured scheme. Unsealing follows the
/// scheme recorded in the [`SealedPayload`], so legacy artifacts keep opening
/// after the default changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadCipher {
    scheme: SealScheme,
}

impl PayloadCipher {
    pub fn new(scheme: SealScheme) -> Self {
        PayloadCipher { scheme }
    }

    /// AES-192-ECB without nonce or tag. Equal blocks leak and tampering goes
    /// unnoticed; only for artifacts that must stay readable by old tooling.
    pub fn legacy() -> Self {
        Self::new(SealScheme::Legacy)
    }

    pub fn authenticated() -> Self {
        Self::new(SealScheme::Authenticated)
    }

    pub fn scheme(&self) -> SealScheme {
        self.scheme
    }

    pub fn seal(&self, payload: &[u8], key: &SecretKey) -> Result<SealedPayload, PuzzleError> {
        self.seal_with_rng(payload, key, &mut OsRng)
    }

    /// Seals with nonces drawn from `rng`. Legacy sealing draws nothing.
    pub fn seal_with_rng<R: RngCore + CryptoRng>(
        &self,
        payload: &[u8],
        key: &SecretKey,
        rng: &mut R,
    ) -> Result<SealedPayload, PuzzleError> {
        let key = key_bytes(key.value())?;
        let bytes = match self.scheme {
            SealScheme::Legacy => seal_ecb(payload, &key)?,
            SealScheme::Authenticated => seal_gcm(payload, &key, rng)?,
        };
        Ok(SealedPayload {
            scheme: self.scheme,
            bytes,
        })
    }

    pub fn unseal(&self, sealed: &SealedPayload, key: &SecretKey) -> Result<Vec<u8>, PuzzleError> {
        let key = key_bytes(key.value())?;
        match sealed.scheme {
            SealScheme::Legacy => unseal_ecb(&sealed.bytes, &key),
            SealScheme::Authenticated => unseal_gcm(&sealed.bytes, &key),
        }
    }
}

impl Default for PayloadCipher {
    fn default() -> Self {
        Self::authenticated()
    }
}

/// Fixed-width big-endian key bytes, left-padded with zeros.
fn key_bytes(key: &Integer) -> Result<[u8; KEY_SIZE], PuzzleError> {
    if *key < 0 {
        return Err(PuzzleError::Format("negative key".to_string()));
    }
    let digits = key.to_digits::<u8>(Order::MsfBe);
    if digits.len() > KEY_SIZE {
        return Err(PuzzleError::Format(format!(
            "key of {} bits does not fit in {} bytes",
            key.significant_bits(),
            KEY_SIZE
        )));
    }
    let mut bytes = [0u8; KEY_SIZE];
    bytes[KEY_SIZE - digits.len()..].copy_from_slice(&digits);
    Ok(bytes)
}

/// Pads to a whole number of blocks; every pad byte holds the pad length.
fn pad(payload: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - payload.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(payload.len() + pad_len);
    padded.extend_from_slice(payload);
    padded.resize(payload.len() + pad_len, pad_len as u8);
    padded
}

fn unpad(mut padded: Vec<u8>) -> Result<Vec<u8>, PuzzleError> {
    let pad_len = match padded.last() {
        Some(&n) => n as usize,
        None => return Err(PuzzleError::Format("empty plaintext".to_string())),
    };
    if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > padded.len() {
        return Err(PuzzleError::Format(format!("invalid pad length {}", pad_len)));
    }
    let body_len = padded.len() - pad_len;
    if padded[body_len..].iter().any(|&b| b as usize != pad_len) {
        return Err(PuzzleError::Format("inconsistent padding".to_string()));
    }
    padded.truncate(body_len);
    Ok(padded)
}

fn block_cipher(key: &[u8; KEY_SIZE]) -> Result<Aes192, PuzzleError> {
    Aes192::new_from_slice(key).map_err(|_| PuzzleError::Format("invalid key length".to_string()))
}

fn seal_ecb(payload: &[u8], key: &[u8; KEY_SIZE]) -> Result<Vec<u8>, PuzzleError> {
    let cipher = block_cipher(key)?;
    let mut buffer = pad(payload);
    for chunk in buffer.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(chunk));
    }
    Ok(buffer)
}

fn unseal_ecb(ciphertext: &[u8], key: &[u8; KEY_SIZE]) -> Result<Vec<u8>, PuzzleError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(PuzzleError::Format(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_SIZE
        )));
    }
    let cipher = block_cipher(key)?;
    let mut buffer = ciphertext.to_vec();
    for chunk in buffer.chunks_exact_mut(BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
    }
    unpad(buffer)
}

fn seal_gcm<R: RngCore + CryptoRng>(
    payload: &[u8],
    key: &[u8; KEY_SIZE],
    rng: &mut R,
) -> Result<Vec<u8>, PuzzleError> {
    let cipher = Aes192Gcm::new(GenericArray::from_slice(key));
    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::<U12>::from_slice(&nonce), payload)
        .map_err(|_| PuzzleError::Format("payload too large to seal".to_string()))?;

    let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn unseal_gcm(sealed: &[u8], key: &[u8; KEY_SIZE]) -> Result<Vec<u8>, PuzzleError> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(PuzzleError::Format(format!(
            "sealed payload of {} bytes is shorter than nonce and tag",
            sealed.len()
        )));
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
    let cipher = Aes192Gcm::new(GenericArray::from_slice(key));
    cipher
        .decrypt(Nonce::<U12>::from_slice(nonce), ciphertext)
        .map_err(|_| PuzzleError::Authentication)
}
