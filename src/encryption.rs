//! Structural check that a parsed document went through sops.
//!
//! sops keeps keys in plaintext and replaces every selected value with an
//! `ENC[...]` string, so a document is judged by walking its leaves. The
//! `sops` metadata key is never walked, and `encrypted_regex` from that
//! metadata narrows which top-level keys are required to be encrypted.
//!
//! ## Example
//! ```text
//! foo: ENC[AES256_GCM,data:9LiS,...,type:str]   -> checked, passes
//! bar: 42                                        -> exempt when encrypted_regex is ^foo
//! sops:
//!     encrypted_regex: ^foo
//! ```
use crate::check::Failure;
use crate::document::Document;
use regex::Regex;

/// Prefix sops writes in front of every ciphertext value.
pub const ENCRYPTION_MARKER: &str = "ENC[";

/// Reserved top-level key holding sops metadata.
pub const SOPS_METADATA_KEY: &str = "sops";

/// Used when the metadata carries no `encrypted_regex`.
pub const DEFAULT_ENCRYPTED_REGEX: &str = r"\S";

const ENCRYPTED_REGEX_KEY: &str = "encrypted_regex";

/// True when every leaf under `value` is an encrypted (or empty) string.
pub fn is_encrypted_leaf(value: &Document) -> bool {
    match value {
        Document::String(text) => text.is_empty() || text.starts_with(ENCRYPTION_MARKER),
        Document::Sequence(items) => items.iter().all(is_encrypted_leaf),
        Document::Mapping(entries) => entries.iter().all(|(_, value)| is_encrypted_leaf(value)),
        Document::Other(_) => false,
    }
}

/// Selects the top-level keys that must be encrypted.
///
/// Matching is anchored at the start of the key only, so `^foo` and `foo`
/// both select `foobar`.
#[derive(Debug)]
pub struct KeyFilter {
    pattern: Regex,
}

impl KeyFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// Filter from the `sops` metadata value, falling back to the default.
    pub fn from_metadata(metadata: &Document) -> Result<Self, Failure> {
        let pattern = match metadata.get(ENCRYPTED_REGEX_KEY) {
            None => DEFAULT_ENCRYPTED_REGEX,
            Some(Document::String(pattern)) => pattern.as_str(),
            Some(_) => {
                return Err(Failure::InvalidEncryptedRegex(
                    "value is not a string".to_string(),
                ))
            }
        };
        // regex syntax errors render over several lines; keep the last one.
        Self::new(pattern).map_err(|err| {
            let rendered = err.to_string();
            let summary = rendered.lines().last().unwrap_or_default().trim();
            Failure::InvalidEncryptedRegex(summary.to_string())
        })
    }

    pub fn selects(&self, key: &str) -> bool {
        // The leftmost match starts at 0 whenever any match does.
        self.pattern
            .find(key)
            .is_some_and(|found| found.start() == 0)
    }
}

/// Checks one document; the error names the first reason it is rejected.
pub fn validate_document(doc: &Document) -> Result<(), Failure> {
    let Document::Mapping(entries) = doc else {
        return Err(Failure::MissingMetadata);
    };
    let metadata = doc
        .get(SOPS_METADATA_KEY)
        .ok_or(Failure::MissingMetadata)?;
    let filter = KeyFilter::from_metadata(metadata)?;

    let mut unencrypted_keys = Vec::new();
    for (key, value) in entries {
        if key == SOPS_METADATA_KEY {
            continue;
        }
        if !filter.selects(key) {
            tracing::trace!(key = %key, "key exempt from encryption");
            continue;
        }
        if !is_encrypted_leaf(value) {
            unencrypted_keys.push(key.clone());
        }
    }

    if unencrypted_keys.is_empty() {
        Ok(())
    } else {
        Err(Failure::UnencryptedValues(unencrypted_keys))
    }
}

/// Checks documents in order and stops at the first rejected one.
pub fn validate_documents(docs: &[Document]) -> Result<(), Failure> {
    if docs.is_empty() {
        return Err(Failure::NoDocuments);
    }
    for (index, doc) in docs.iter().enumerate() {
        validate_document(doc).inspect_err(|failure| {
            tracing::debug!(document = index, %failure, "document rejected");
        })?;
    }
    Ok(())
}
