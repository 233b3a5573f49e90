// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Loading Twinkle Eval result files (.json / .jsonl)
//!
//! Handles:
//! - Byte decoding (UTF-8 with or without BOM, UTF-16 with BOM, Big5)
//! - Whole-document JSON, falling back to the first parseable JSONL line
//! - Validation of the required top-level fields

use crate::error::LoadError;
use serde_json::{Map, Value};
use std::path::Path;

/// One dataset entry of `dataset_results`, with its result entries still raw
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetResult {
    /// Key as it appears in the file, e.g. `datasets/tmmlu/`
    pub path: String,
    /// Overall average reported by the file, if any
    pub average_accuracy: Option<f64>,
    /// Result entries in file order; validated by the extractor
    pub results: Vec<Value>,
}

/// A validated evaluation document
#[derive(Debug, Clone, PartialEq)]
pub struct EvalFile {
    /// File name used in messages and reports
    pub name: String,
    pub timestamp: String,
    /// `config.model.name`
    pub model_name: String,
    /// Datasets in file order
    pub dataset_results: Vec<DatasetResult>,
}

impl EvalFile {
    /// Label identifying this file's column in comparisons
    pub fn source_label(&self) -> String {
        format!("{} @ {}", self.model_name, self.timestamp)
    }

    /// Read and validate a file from disk
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            file: name.clone(),
            source,
        })?;

        Self::from_bytes(&name, &bytes)
    }

    /// Decode, parse and validate raw file contents
    pub fn from_bytes(name: &str, bytes: &[u8]) -> Result<Self, LoadError> {
        let text = decode_text(bytes);
        let doc = parse_document(name, &text)?;
        Self::from_object(name, doc)
    }

    /// Validate a parsed top-level object
    pub fn from_object(name: &str, mut doc: Map<String, Value>) -> Result<Self, LoadError> {
        let schema = |path: &str| LoadError::Schema {
            file: name.to_string(),
            path: path.to_string(),
        };

        let model_name = {
            let config = doc.get("config").ok_or_else(|| schema("config"))?;
            let model = config
                .as_object()
                .and_then(|c| c.get("model"))
                .ok_or_else(|| schema("config.model"))?;
            model
                .as_object()
                .and_then(|m| m.get("name"))
                .and_then(Value::as_str)
                .ok_or_else(|| schema("config.model.name"))?
                .to_string()
        };

        let timestamp = doc
            .get("timestamp")
            .and_then(Value::as_str)
            .ok_or_else(|| schema("timestamp"))?
            .to_string();

        if chrono::DateTime::parse_from_rfc3339(&timestamp).is_err()
            && chrono::NaiveDateTime::parse_from_str(&timestamp, "%Y-%m-%dT%H:%M:%S%.f").is_err()
        {
            tracing::warn!("{}: timestamp `{}` is not ISO-8601; using it verbatim", name, timestamp);
        }

        let datasets = match doc.remove("dataset_results") {
            Some(Value::Object(map)) => map,
            _ => return Err(schema("dataset_results")),
        };

        let dataset_results = datasets
            .into_iter()
            .map(|(path, payload)| dataset_from_value(name, path, payload))
            .collect();

        Ok(Self {
            name: name.to_string(),
            timestamp,
            model_name,
            dataset_results,
        })
    }
}

fn dataset_from_value(file: &str, path: String, payload: Value) -> DatasetResult {
    let Value::Object(mut payload) = payload else {
        tracing::warn!("{}: dataset `{}` is not an object; treating it as empty", file, path);
        return DatasetResult {
            path,
            average_accuracy: None,
            results: Vec::new(),
        };
    };

    let average_accuracy = match payload.get("average_accuracy") {
        None | Some(Value::Null) => None,
        Some(v) => match v.as_f64() {
            Some(avg) if avg.is_finite() => Some(avg),
            _ => {
                tracing::warn!("{}: dataset `{}` has a non-numeric average_accuracy; deriving it", file, path);
                None
            }
        },
    };

    let results = match payload.remove("results") {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => Vec::new(),
        Some(_) => {
            tracing::warn!("{}: dataset `{}` has a non-list `results`; ignoring it", file, path);
            Vec::new()
        }
    };

    DatasetResult {
        path,
        average_accuracy,
        results,
    }
}

/// Decode file bytes to text
///
/// UTF-16 is only recognised with a byte order mark. Bytes that are not valid
/// UTF-8 are tried as Big5 (CP950) and decoded lossily as UTF-8 if that fails.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    if let Some(text) = encoding_rs::BIG5.decode_without_bom_handling_and_without_replacement(bytes) {
        tracing::debug!("Decoded input as Big5");
        return text.into_owned();
    }
    String::from_utf8_lossy(bytes).into_owned()
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| to_unit([c[0], c[1]])).collect();
    String::from_utf16_lossy(&units)
}

/// Parse text as one JSON object, or as JSONL taking the first parseable line
pub fn parse_document(name: &str, text: &str) -> Result<Map<String, Value>, LoadError> {
    let text = text.trim();

    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(whole_err) => {
            let first_line = text
                .lines()
                .map(|line| line.trim().trim_end_matches(','))
                .filter(|line| !line.is_empty())
                .find_map(|line| serde_json::from_str::<Value>(line).ok());

            match first_line {
                Some(value) => {
                    tracing::debug!("{}: parsed as JSONL (first valid line)", name);
                    value
                }
                None => {
                    return Err(LoadError::Parse {
                        file: name.to_string(),
                        message: whole_err.to_string(),
                    })
                }
            }
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(LoadError::Parse {
            file: name.to_string(),
            message: format!("top-level value is {}, expected an object", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOC: &str = r#"{
        "timestamp": "2025-01-02T03:04:05",
        "config": {"model": {"name": "twinkle-7b"}},
        "dataset_results": {
            "datasets/tmmlu/": {
                "average_accuracy": 0.5,
                "results": [{"file": "datasets/tmmlu/law.csv", "accuracy_mean": 0.5}]
            },
            "datasets/mmlu/": {"results": []}
        }
    }"#;

    #[test]
    fn test_load_valid_document() {
        let file = EvalFile::from_bytes("run.json", DOC.as_bytes()).expect("valid document");

        assert_eq!(file.model_name, "twinkle-7b");
        assert_eq!(file.source_label(), "twinkle-7b @ 2025-01-02T03:04:05");
        assert_eq!(file.dataset_results.len(), 2);
        // File order is kept
        assert_eq!(file.dataset_results[0].path, "datasets/tmmlu/");
        assert_eq!(file.dataset_results[0].average_accuracy, Some(0.5));
        assert_eq!(file.dataset_results[1].average_accuracy, None);
    }

    #[test]
    fn test_missing_dataset_results_is_schema_error() {
        let text = r#"{"timestamp": "t", "config": {"model": {"name": "m"}}}"#;
        let err = EvalFile::from_bytes("bad.json", text.as_bytes()).unwrap_err();

        match err {
            LoadError::Schema { file, path } => {
                assert_eq!(file, "bad.json");
                assert_eq!(path, "dataset_results");
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_model_name_names_nested_path() {
        let text = r#"{"timestamp": "t", "config": {"model": {}}, "dataset_results": {}}"#;
        let err = EvalFile::from_bytes("bad.json", text.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Schema { ref path, .. } if path == "config.model.name"));

        let text = r#"{"timestamp": "t", "dataset_results": {}}"#;
        let err = EvalFile::from_bytes("bad.json", text.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Schema { ref path, .. } if path == "config"));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = EvalFile::from_bytes("broken.json", b"{\"timestamp\": ").unwrap_err();
        assert_eq!(err.kind(), "parse");

        let err = EvalFile::from_bytes("list.json", b"[1, 2, 3]").unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_jsonl_uses_first_valid_line() {
        let line = DOC.replace('\n', " ");
        let text = format!("not json\n{},\n{{\"other\": 1}}\n", line);
        let file = EvalFile::from_bytes("run.jsonl", text.as_bytes()).expect("first valid line");
        assert_eq!(file.model_name, "twinkle-7b");
    }

    #[test]
    fn test_decode_boms() {
        let mut utf8 = vec![0xEF, 0xBB, 0xBF];
        utf8.extend_from_slice("{}".as_bytes());
        assert_eq!(decode_text(&utf8), "{}");

        let mut utf16le = vec![0xFF, 0xFE];
        for unit in "{\"a\":1}".encode_utf16() {
            utf16le.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&utf16le), "{\"a\":1}");

        let mut utf16be = vec![0xFE, 0xFF];
        for unit in "ok".encode_utf16() {
            utf16be.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_text(&utf16be), "ok");
    }

    fn big5_doc(category: &[u8]) -> Vec<u8> {
        let mut bytes = br#"{"timestamp": "t", "config": {"model": {"name": "m"}}, "dataset_results": {"d": {"results": [{"file": ""#.to_vec();
        bytes.extend_from_slice(category);
        bytes.extend_from_slice(br#".csv", "accuracy_mean": 0.5}]}}}"#);
        bytes
    }

    #[test]
    fn test_big5_category_names_are_decoded() {
        // 法律
        let file = EvalFile::from_bytes("big5.json", &big5_doc(&[0xAA, 0x6B, 0xAB, 0xDF])).expect("Big5 document");
        assert_eq!(file.dataset_results[0].results[0]["file"], "法律.csv");
    }

    #[test]
    fn test_big5_trail_byte_backslash_does_not_break_json() {
        // 許可: the trail byte of 許 is 0x5C
        let file = EvalFile::from_bytes("big5.json", &big5_doc(&[0xB3, 0x5C, 0xA5, 0x69])).expect("Big5 document");
        assert_eq!(file.dataset_results[0].results[0]["file"], "許可.csv");
    }

    #[test]
    fn test_undecodable_bytes_fall_back_to_lossy_utf8() {
        // 0x80 is neither UTF-8 nor a Big5 lead byte
        assert_eq!(decode_text(b"ok\x80"), "ok\u{FFFD}");
    }

    #[test]
    fn test_load_from_disk_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(DOC.as_bytes()).unwrap();

        let file = EvalFile::load(&path).expect("file loads");
        assert_eq!(file.name, "run.json");

        let err = EvalFile::load(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.kind(), "io");
        assert_eq!(err.file(), "absent.json");
    }

    #[test]
    fn test_non_object_dataset_payload_is_empty() {
        let text = r#"{"timestamp": "t", "config": {"model": {"name": "m"}},
            "dataset_results": {"x": 3, "y": {"average_accuracy": "high", "results": [1]}}}"#;
        let file = EvalFile::from_bytes("odd.json", text.as_bytes()).unwrap();
        assert!(file.dataset_results[0].results.is_empty());
        assert_eq!(file.dataset_results[1].average_accuracy, None);
        assert_eq!(file.dataset_results[1].results.len(), 1);
    }
}
