//! Runtime configuration: header geometry, marker policy and key material.

use crate::domain::FieldKind;
use crate::error::{AnonymizerError, AnonymizerResult};
use crate::redaction::MarkerStyle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Environment variable holding the encryption passphrase.
pub const KEY_ENV_VAR: &str = "ENCRYPTION_KEY";

/// Byte used to right-pad passphrases shorter than the key size.
const KEY_PAD_BYTE: u8 = b'0';

/// Pipeline settings, loadable from a JSON file.
///
/// Every field has a default, so a partial file (or `{}`) is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnonymizerConfig {
    /// Fraction of page one's height treated as the header region.
    pub header_fraction: f32,

    /// What replaces a redacted value on the page.
    pub marker: MarkerStyle,

    /// Keep the plaintext `original` next to each token in the mapping.
    ///
    /// On by default to match the established mapping format. Anyone
    /// storing or sending mappings over an untrusted channel should turn
    /// this off.
    pub embed_plaintext: bool,

    /// Append an ENCRYPTED INFORMATION page to de-identified documents.
    pub append_info_page: bool,

    /// Field kinds that are hashed (not recoverable) instead of encrypted.
    pub one_way_fields: Vec<FieldKind>,

    /// Padding in points applied around each redacted region.
    pub redaction_pad: f32,
}

impl Default for AnonymizerConfig {
    fn default() -> Self {
        Self {
            header_fraction: 0.5,
            marker: MarkerStyle::LengthPreserving,
            embed_plaintext: true,
            append_info_page: false,
            one_way_fields: Vec::new(),
            redaction_pad: 1.0,
        }
    }
}

impl AnonymizerConfig {
    /// Reads a JSON config file and validates it.
    pub fn load(path: &Path) -> AnonymizerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| AnonymizerError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> AnonymizerResult<()> {
        if !(self.header_fraction > 0.0 && self.header_fraction <= 1.0) {
            return Err(AnonymizerError::invalid_input(
                "header_fraction",
                format!("must be in (0, 1], got {}", self.header_fraction),
            ));
        }
        if !self.redaction_pad.is_finite() || self.redaction_pad < 0.0 {
            return Err(AnonymizerError::invalid_input(
                "redaction_pad",
                "must be a non-negative number",
            ));
        }
        Ok(())
    }

    /// Whether values of `kind` are hashed rather than encrypted.
    pub fn is_one_way(&self, kind: FieldKind) -> bool {
        self.one_way_fields.contains(&kind)
    }
}

/// The 32-byte AES-256 key shared by encryption and decryption.
///
/// Built once and passed explicitly to the codec.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Derives a key from a passphrase by truncating to 32 bytes or
    /// right-padding with ASCII `'0'`.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let mut key = [KEY_PAD_BYTE; 32];
        let bytes = passphrase.as_bytes();
        let len = bytes.len().min(key.len());
        key[..len].copy_from_slice(&bytes[..len]);
        Self(key)
    }

    /// Reads the passphrase from [`KEY_ENV_VAR`].
    pub fn from_env() -> AnonymizerResult<Self> {
        match std::env::var(KEY_ENV_VAR) {
            Ok(value) if !value.is_empty() => Ok(Self::from_passphrase(&value)),
            _ => Err(AnonymizerError::invalid_input(
                KEY_ENV_VAR,
                "environment variable is not set",
            )),
        }
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}
