//! Field codec: AES-256-CBC for recoverable values, SHA-256 for one-way ones.
//!
//! Tokens have the form `hex(iv):hex(ciphertext)` with a fresh random IV
//! per call. The codec holds only an immutable key and can be shared
//! freely between threads.

use crate::config::EncryptionKey;
use crate::error::CodecError;
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha2::{Digest, Sha256};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const IV_LEN: usize = 16;
const BLOCK_LEN: usize = 16;
const TOKEN_SEPARATOR: char = ':';

/// Symmetric encrypt/decrypt and one-way hash over field values.
#[derive(Debug, Clone)]
pub struct FieldCodec {
    key: EncryptionKey,
}

impl FieldCodec {
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    /// Encrypts `value` under a fresh random IV.
    pub fn encrypt_reversible(&self, value: &str) -> String {
        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        let key: [u8; 32] = *self.key.as_bytes();
        let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(value.as_bytes());

        format!(
            "{}{}{}",
            hex::encode(iv),
            TOKEN_SEPARATOR,
            hex::encode(ciphertext)
        )
    }

    /// Decrypts a token produced by [`FieldCodec::encrypt_reversible`].
    pub fn decrypt_reversible(&self, token: &str) -> Result<String, CodecError> {
        let (iv, ciphertext) = parse_token(token)?;

        let key: [u8; 32] = *self.key.as_bytes();
        let plaintext = Aes256CbcDec::new(&key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CodecError::Padding)?;

        String::from_utf8(plaintext).map_err(|_| CodecError::InvalidUtf8)
    }

    /// SHA-256 of the UTF-8 bytes of `value`, lowercase hex.
    pub fn hash_one_way(value: &str) -> String {
        hex::encode(Sha256::digest(value.as_bytes()))
    }
}

fn parse_token(token: &str) -> Result<([u8; IV_LEN], Vec<u8>), CodecError> {
    let parts: Vec<&str> = token.trim().split(TOKEN_SEPARATOR).collect();
    let [iv_hex, ct_hex] = parts.as_slice() else {
        return Err(CodecError::malformed(format!(
            "expected exactly one '{}' separator",
            TOKEN_SEPARATOR
        )));
    };

    let iv_bytes =
        hex::decode(iv_hex).map_err(|e| CodecError::malformed(format!("iv: {}", e)))?;
    let iv: [u8; IV_LEN] = iv_bytes.try_into().map_err(|_| {
        CodecError::malformed(format!("iv must be {} bytes", IV_LEN))
    })?;

    let ciphertext =
        hex::decode(ct_hex).map_err(|e| CodecError::malformed(format!("ciphertext: {}", e)))?;
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CodecError::malformed(format!(
            "ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_LEN
        )));
    }

    Ok((iv, ciphertext))
}
