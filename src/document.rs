//! Document loading for sops-managed files.
//!
//! sops writes YAML for YAML targets and JSON (with hard tabs, which YAML
//! rejects) for everything else, so the parser is picked by file extension.
//! Both parsers feed the same [`Document`] tree so validation never sees
//! format-specific values.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Parsed value tree shared by the YAML and JSON loaders.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    String(String),
    Sequence(Vec<Document>),
    /// Entries keep file order.
    Mapping(Vec<(String, Document)>),
    Other(ScalarKind),
}

/// Non-string leaves. None of these can carry the `ENC[` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Null,
    Bool,
    Number,
}

impl Document {
    /// Value stored under `key` when this is a mapping.
    pub fn get(&self, key: &str) -> Option<&Document> {
        match self {
            Document::Mapping(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Parse(String),
}

/// How a path is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

/// Picks YAML when the final extension is listed in `yaml_extensions`.
pub fn detect_format(path: &Path, yaml_extensions: &[String]) -> Format {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| yaml_extensions.iter().any(|candidate| candidate == ext));
    if is_yaml {
        Format::Yaml
    } else {
        Format::Json
    }
}

/// Reads and parses every document in `path`.
///
/// With `multi_document` unset exactly one document is returned. With it set,
/// YAML streams are parsed in full before returning, so a syntax error in any
/// later document still fails the whole load. JSON always yields one value.
pub fn load_documents(
    path: &Path,
    multi_document: bool,
    yaml_extensions: &[String],
) -> Result<Vec<Document>, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = detect_format(path, yaml_extensions);
    tracing::debug!(
        path = %path.display(),
        ?format,
        multi_document,
        bytes = bytes.len(),
        "loading document"
    );
    parse_documents(&bytes, format, multi_document).map_err(LoadError::Parse)
}

pub(crate) fn parse_documents(
    bytes: &[u8],
    format: Format,
    multi_document: bool,
) -> Result<Vec<Document>, String> {
    match format {
        Format::Json => {
            let value: serde_json::Value =
                serde_json::from_slice(bytes).map_err(|err| err.to_string())?;
            Ok(vec![from_json(value)])
        }
        Format::Yaml if multi_document => {
            let mut documents = Vec::new();
            for deserializer in serde_yaml::Deserializer::from_slice(bytes) {
                let value = serde_yaml::Value::deserialize(deserializer)
                    .map_err(|err| err.to_string())?;
                documents.push(from_yaml(value));
            }
            // Empty, comment-only, and bare `---` streams parse as null documents.
            if documents
                .iter()
                .all(|doc| *doc == Document::Other(ScalarKind::Null))
            {
                documents.clear();
            }
            Ok(documents)
        }
        Format::Yaml => {
            let value: serde_yaml::Value =
                serde_yaml::from_slice(bytes).map_err(|err| err.to_string())?;
            Ok(vec![from_yaml(value)])
        }
    }
}

fn from_json(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::String(text) => Document::String(text),
        serde_json::Value::Array(items) => {
            Document::Sequence(items.into_iter().map(from_json).collect())
        }
        serde_json::Value::Object(map) => Document::Mapping(
            map.into_iter()
                .map(|(key, value)| (key, from_json(value)))
                .collect(),
        ),
        serde_json::Value::Null => Document::Other(ScalarKind::Null),
        serde_json::Value::Bool(_) => Document::Other(ScalarKind::Bool),
        serde_json::Value::Number(_) => Document::Other(ScalarKind::Number),
    }
}

fn from_yaml(value: serde_yaml::Value) -> Document {
    match value {
        serde_yaml::Value::String(text) => Document::String(text),
        serde_yaml::Value::Sequence(items) => {
            Document::Sequence(items.into_iter().map(from_yaml).collect())
        }
        serde_yaml::Value::Mapping(map) => Document::Mapping(
            map.into_iter()
                .map(|(key, value)| (yaml_key(&key), from_yaml(value)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => from_yaml(tagged.value),
        serde_yaml::Value::Null => Document::Other(ScalarKind::Null),
        serde_yaml::Value::Bool(_) => Document::Other(ScalarKind::Bool),
        serde_yaml::Value::Number(_) => Document::Other(ScalarKind::Number),
    }
}

// YAML allows non-string keys; render them so they can be filtered and reported.
fn yaml_key(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(text) => text.clone(),
        serde_yaml::Value::Number(number) => number.to_string(),
        serde_yaml::Value::Bool(flag) => flag.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|text| text.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Result<Vec<Document>, String> {
        parse_documents(text.as_bytes(), Format::Yaml, false)
    }

    fn yaml_stream(text: &str) -> Result<Vec<Document>, String> {
        parse_documents(text.as_bytes(), Format::Yaml, true)
    }

    fn exts() -> Vec<String> {
        vec!["yaml".to_string(), "yml".to_string()]
    }

    #[test]
    fn detects_yaml_by_extension_only() {
        assert_eq!(detect_format(Path::new("a/b.yaml"), &exts()), Format::Yaml);
        assert_eq!(detect_format(Path::new("b.yml"), &exts()), Format::Yaml);
        assert_eq!(detect_format(Path::new("b.json"), &exts()), Format::Json);
        assert_eq!(detect_format(Path::new("b.env"), &exts()), Format::Json);
        assert_eq!(detect_format(Path::new("yaml"), &exts()), Format::Json);
        assert_eq!(detect_format(Path::new("b.YAML"), &exts()), Format::Json);
    }

    #[test]
    fn yaml_mapping_keeps_key_order_and_leaf_kinds() {
        let docs = yaml("zeta: a\nalpha: [1, true, ~]\nsops: ''\n").unwrap();
        assert_eq!(
            docs,
            vec![Document::Mapping(vec![
                ("zeta".to_string(), Document::String("a".to_string())),
                (
                    "alpha".to_string(),
                    Document::Sequence(vec![
                        Document::Other(ScalarKind::Number),
                        Document::Other(ScalarKind::Bool),
                        Document::Other(ScalarKind::Null),
                    ])
                ),
                ("sops".to_string(), Document::String(String::new())),
            ])]
        );
    }

    #[test]
    fn json_object_keeps_key_order() {
        let docs = parse_documents(
            b"{\"zeta\": \"x\",\n\t\"alpha\": 1, \"sops\": {}}",
            Format::Json,
            false,
        )
        .unwrap();
        let Document::Mapping(entries) = &docs[0] else {
            panic!("expected mapping");
        };
        let keys: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "sops"]);
    }

    #[test]
    fn json_loader_rejects_yaml_text() {
        assert!(parse_documents(b"foo: bar\n", Format::Json, false).is_err());
    }

    #[test]
    fn non_string_yaml_keys_are_rendered() {
        let docs = yaml("1: a\ntrue: b\n").unwrap();
        let Document::Mapping(entries) = &docs[0] else {
            panic!("expected mapping");
        };
        assert_eq!(entries[0].0, "1");
        assert_eq!(entries[1].0, "true");
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(yaml("foo: [unclosed\n").is_err());
        assert!(yaml("foo: bar\n  baz: qux\n").is_err());
    }

    #[test]
    fn single_document_mode_rejects_streams() {
        assert!(yaml("a: 1\n---\nb: 2\n").is_err());
    }

    #[test]
    fn multi_document_mode_returns_every_document_in_order() {
        let docs = yaml_stream("a: x\n---\nb: y\n").unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].get("a").is_some());
        assert!(docs[1].get("b").is_some());
    }

    #[test]
    fn multi_document_mode_surfaces_late_syntax_errors() {
        assert!(yaml_stream("a: x\n---\nb: [oops\n").is_err());
    }

    #[test]
    fn empty_streams_have_no_documents() {
        for text in ["", "\n", "---\n", "# only a comment\n", "---\n---\n"] {
            assert_eq!(yaml_stream(text).unwrap(), Vec::new(), "input {text:?}");
        }
        assert_eq!(yaml_stream("---\n---\na: x\n").unwrap().len(), 2);
    }

    #[test]
    fn multi_document_flag_does_not_change_json() {
        let docs = parse_documents(b"{\"a\": \"x\"}", Format::Json, true).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn get_only_reads_mappings() {
        let doc = Document::Sequence(vec![Document::String("sops".to_string())]);
        assert!(doc.get("sops").is_none());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_documents(&dir.path().join("absent.yaml"), false, &exts()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = load_documents(&path, false, &exts()).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }
}
