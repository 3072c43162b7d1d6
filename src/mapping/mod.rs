//! The mapping: encrypted field records plus summary flags.
//!
//! The mapping is the only artifact that allows a redacted document to be
//! restored. Its JSON shape is consumed by other clients and must stay
//! stable:
//!
//! ```json
//! {
//!   "encrypted_data": [
//!     {"name": {"original": "John Smith", "encrypted": "ivhex:cthex", "algorithm": "AES-256-CBC"}}
//!   ],
//!   "sensitive_data_found": {"name": true, "email": false, "affiliation": false, "title": false, "address": false},
//!   "encryption_options": {"name": true, "email": true, "affiliation": true, "title": false, "address": false}
//! }
//! ```

pub mod info_page;

use crate::crypto::FieldCodec;
use crate::domain::FieldKind;
use crate::error::{AnonymizerError, AnonymizerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How a field value was protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// Reversible, recoverable with the key
    #[serde(rename = "AES-256-CBC")]
    Aes256Cbc,

    /// One-way digest, verifiable but not recoverable
    #[serde(rename = "SHA-256")]
    Sha256,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes256Cbc => "AES-256-CBC",
            Self::Sha256 => "SHA-256",
        }
    }

    pub fn is_reversible(&self) -> bool {
        matches!(self, Self::Aes256Cbc)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "AES-256-CBC" => Ok(Self::Aes256Cbc),
            "SHA-256" => Ok(Self::Sha256),
            other => Err(format!("unknown algorithm '{}'", other)),
        }
    }
}

/// Wire body of one field, nested under its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<String>,
    pub encrypted: String,
    pub algorithm: Algorithm,
}

/// One protected field value.
///
/// Serialized as a single-key object, `{"<kind>": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<FieldKind, FieldBody>",
    into = "BTreeMap<FieldKind, FieldBody>"
)]
pub struct EncryptedField {
    pub kind: FieldKind,
    /// Plaintext copy, present only when plaintext embedding is enabled
    pub original: Option<String>,
    /// `ivhex:cthex` token, or a SHA-256 hex digest
    pub encrypted: String,
    pub algorithm: Algorithm,
}

impl EncryptedField {
    /// Protects `value`, encrypting it or, when `one_way`, hashing it.
    pub fn seal(
        codec: &FieldCodec,
        kind: FieldKind,
        value: &str,
        one_way: bool,
        embed_plaintext: bool,
    ) -> Self {
        let (encrypted, algorithm) = if one_way {
            (FieldCodec::hash_one_way(value), Algorithm::Sha256)
        } else {
            (codec.encrypt_reversible(value), Algorithm::Aes256Cbc)
        };
        Self {
            kind,
            original: embed_plaintext.then(|| value.to_string()),
            encrypted,
            algorithm,
        }
    }
}

impl TryFrom<BTreeMap<FieldKind, FieldBody>> for EncryptedField {
    type Error = String;

    fn try_from(map: BTreeMap<FieldKind, FieldBody>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(format!(
                "expected exactly one field kind per entry, found {}",
                map.len()
            ));
        }
        let (kind, body) = map
            .into_iter()
            .next()
            .ok_or_else(|| "empty field entry".to_string())?;
        Ok(Self {
            kind,
            original: body.original,
            encrypted: body.encrypted,
            algorithm: body.algorithm,
        })
    }
}

impl From<EncryptedField> for BTreeMap<FieldKind, FieldBody> {
    fn from(field: EncryptedField) -> Self {
        BTreeMap::from([(
            field.kind,
            FieldBody {
                original: field.original,
                encrypted: field.encrypted,
                algorithm: field.algorithm,
            },
        )])
    }
}

/// One boolean per field kind.
///
/// Used both for the encryption options a caller enables and for which
/// kinds were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFlags {
    pub name: bool,
    pub email: bool,
    pub affiliation: bool,
    pub title: bool,
    pub address: bool,
}

impl Default for FieldFlags {
    /// Names, emails and affiliations on; titles and addresses off.
    fn default() -> Self {
        Self {
            name: true,
            email: true,
            affiliation: true,
            title: false,
            address: false,
        }
    }
}

impl FieldFlags {
    /// Every kind off.
    pub fn none() -> Self {
        Self {
            name: false,
            email: false,
            affiliation: false,
            title: false,
            address: false,
        }
    }

    /// Every kind on.
    pub fn all() -> Self {
        Self::from_kinds(&FieldKind::ALL)
    }

    /// Only the listed kinds on.
    pub fn from_kinds(kinds: &[FieldKind]) -> Self {
        let mut flags = Self::none();
        for kind in kinds {
            flags.set(*kind, true);
        }
        flags
    }

    pub fn get(&self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Name => self.name,
            FieldKind::Email => self.email,
            FieldKind::Affiliation => self.affiliation,
            FieldKind::Title => self.title,
            FieldKind::Address => self.address,
        }
    }

    pub fn set(&mut self, kind: FieldKind, value: bool) {
        let slot = match kind {
            FieldKind::Name => &mut self.name,
            FieldKind::Email => &mut self.email,
            FieldKind::Affiliation => &mut self.affiliation,
            FieldKind::Title => &mut self.title,
            FieldKind::Address => &mut self.address,
        };
        *slot = value;
    }

    pub fn any(&self) -> bool {
        FieldKind::ALL.iter().any(|k| self.get(*k))
    }

    /// Kinds that are on, in canonical order.
    pub fn enabled(&self) -> impl Iterator<Item = FieldKind> + '_ {
        FieldKind::ALL.into_iter().filter(|k| self.get(*k))
    }
}

/// Encrypted field records and summary flags for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub encrypted_data: Vec<EncryptedField>,
    pub sensitive_data_found: FieldFlags,
    pub encryption_options: FieldFlags,
}

impl Mapping {
    /// Assembles a mapping. Pure; never fails.
    pub fn build(fields: Vec<EncryptedField>, options: FieldFlags, found: FieldFlags) -> Self {
        Self {
            encrypted_data: fields,
            sensitive_data_found: found,
            encryption_options: options,
        }
    }

    /// A mapping with no fields, nothing found.
    pub fn empty(options: FieldFlags) -> Self {
        Self::build(Vec::new(), options, FieldFlags::none())
    }

    pub fn is_empty(&self) -> bool {
        self.encrypted_data.is_empty()
    }

    /// Copy with every plaintext `original` removed, safe to hand to
    /// parties that should only hold tokens.
    pub fn without_plaintext(&self) -> Self {
        let mut stripped = self.clone();
        for field in &mut stripped.encrypted_data {
            field.original = None;
        }
        stripped
    }

    pub fn fields_of(&self, kind: FieldKind) -> impl Iterator<Item = &EncryptedField> {
        self.encrypted_data.iter().filter(move |f| f.kind == kind)
    }

    pub fn to_json(&self) -> AnonymizerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> AnonymizerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the mapping as pretty JSON.
    pub fn save(&self, path: &Path) -> AnonymizerResult<()> {
        std::fs::write(path, self.to_json()?).map_err(|e| AnonymizerError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn load(path: &Path) -> AnonymizerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| AnonymizerError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&raw)
    }
}
