// src/cases/mod.rs

//! Persisted regression cases: `{"testCases": {"<id>": {...}}}`.

use crate::error::CaseStoreError;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum Verdict {
    #[value(name = "Pass")]
    Pass,
    #[value(name = "Fail")]
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => f.write_str("Pass"),
            Verdict::Fail => f.write_str("Fail"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Fields this tool does not interpret, written back untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TestCase {
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or("No description")
    }
}

/// A case is either a full object or just the query text.
#[derive(Deserialize)]
#[serde(untagged)]
enum CaseEntry {
    Full(TestCase),
    Query(String),
}

impl From<CaseEntry> for TestCase {
    fn from(entry: CaseEntry) -> Self {
        match entry {
            CaseEntry::Full(case) => case,
            CaseEntry::Query(query) => TestCase {
                query,
                ..TestCase::default()
            },
        }
    }
}

#[derive(Deserialize)]
struct CaseFileIn {
    #[serde(rename = "testCases", default)]
    test_cases: BTreeMap<String, CaseEntry>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Serialize)]
struct CaseFileOut<'a> {
    #[serde(rename = "testCases")]
    test_cases: &'a BTreeMap<String, TestCase>,
    #[serde(flatten)]
    extra: &'a Map<String, Value>,
}

pub struct TestCaseStore {
    path: PathBuf,
    cases: BTreeMap<String, TestCase>,
    extra: Map<String, Value>,
}

impl TestCaseStore {
    pub fn load(path: &Path) -> Result<Self, CaseStoreError> {
        if !path.exists() {
            return Err(CaseStoreError::NotFound(path.display().to_string()));
        }
        let contents = fs::read_to_string(path)?;
        let file: CaseFileIn = serde_json::from_str(&contents)?;
        tracing::debug!(path = %path.display(), cases = file.test_cases.len(), "loaded test cases");

        Ok(Self {
            path: path.to_path_buf(),
            cases: file
                .test_cases
                .into_iter()
                .map(|(id, entry)| (id, entry.into()))
                .collect(),
            extra: file.extra,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Cases ordered by id, numerically where ids are numbers.
    pub fn list(&self) -> Vec<(&str, &TestCase)> {
        let mut cases: Vec<_> = self.cases.iter().map(|(id, c)| (id.as_str(), c)).collect();
        cases.sort_by_key(|(id, _)| match id.parse::<u64>() {
            Ok(n) => (0, n, id.to_string()),
            Err(_) => (1, 0, id.to_string()),
        });
        cases
    }

    pub fn get(&self, id: &str) -> Result<&TestCase, CaseStoreError> {
        self.cases
            .get(id)
            .ok_or_else(|| CaseStoreError::UnknownCase(id.to_string()))
    }

    /// Overwrite `result` and `status` of case `id`; nothing else changes.
    pub fn record(&mut self, id: &str, result: &str, verdict: Verdict) -> Result<(), CaseStoreError> {
        let case = self
            .cases
            .get_mut(id)
            .ok_or_else(|| CaseStoreError::UnknownCase(id.to_string()))?;
        case.result = Some(result.to_string());
        case.status = Some(verdict.to_string());
        Ok(())
    }

    pub fn save(&self) -> Result<(), CaseStoreError> {
        let out = CaseFileOut {
            test_cases: &self.cases,
            extra: &self.extra,
        };
        let json = serde_json::to_string_pretty(&out)?;
        fs::write(&self.path, json + "\n")?;
        tracing::info!(path = %self.path.display(), "saved test cases");
        Ok(())
    }
}

/// Forced verdict first, then `expected_result`, then the operator.
pub fn decide_verdict(
    forced: Option<Verdict>,
    expected: Option<&str>,
    actual: &str,
    ask: impl FnOnce(&str) -> bool,
) -> Verdict {
    if let Some(verdict) = forced {
        return verdict;
    }
    let passed = match expected {
        Some(expected) if !expected.trim().is_empty() => expected.trim() == actual.trim(),
        _ => ask(actual),
    };
    if passed { Verdict::Pass } else { Verdict::Fail }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"{
  "version": 3,
  "testCases": {
    "10": { "description": "Ten", "query": "take 10 photos" },
    "2": {
      "description": "Blur",
      "query": "set portrait blur",
      "expected_result": "status: OK",
      "owner": "qa",
      "tags": ["effects"]
    },
    "1": "open the camera"
  }
}"#;

    fn store() -> (tempfile::TempDir, TestCaseStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_cases.json");
        fs::write(&path, SAMPLE).unwrap();
        let store = TestCaseStore::load(&path).unwrap();
        (dir, store)
    }

    #[test]
    fn lists_ids_numerically() {
        let (_dir, store) = store();
        let ids: Vec<_> = store.list().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["1", "2", "10"]);
    }

    #[test]
    fn plain_string_case_is_its_query() {
        let (_dir, store) = store();
        let case = store.get("1").unwrap();
        assert_eq!(case.query, "open the camera");
        assert_eq!(case.description(), "No description");
    }

    #[test]
    fn unknown_id_is_an_error() {
        let (_dir, mut store) = store();
        assert!(matches!(store.get("99"), Err(CaseStoreError::UnknownCase(_))));
        assert!(store.record("99", "x", Verdict::Pass).is_err());
    }

    #[test]
    fn record_preserves_unrelated_fields() {
        let (_dir, mut store) = store();
        store.record("2", "status: OK", Verdict::Pass).unwrap();
        store.save().unwrap();

        let saved: Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let case = &saved["testCases"]["2"];
        assert_eq!(case["result"], json!("status: OK"));
        assert_eq!(case["status"], json!("Pass"));
        assert_eq!(case["owner"], json!("qa"));
        assert_eq!(case["tags"], json!(["effects"]));
        assert_eq!(case["expected_result"], json!("status: OK"));
        assert_eq!(saved["version"], json!(3));
        assert!(saved["testCases"]["10"].get("result").is_none());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TestCaseStore::load(&dir.path().join("nope.json")),
            Err(CaseStoreError::NotFound(_))
        ));
    }

    #[test]
    fn verdict_policy() {
        let never = |_: &str| -> bool { panic!("operator should not be asked") };
        assert_eq!(decide_verdict(Some(Verdict::Fail), Some("a"), "a", never), Verdict::Fail);
        assert_eq!(decide_verdict(None, Some("a\n"), "a", never), Verdict::Pass);
        assert_eq!(decide_verdict(None, Some("a"), "b", never), Verdict::Fail);
        assert_eq!(decide_verdict(None, None, "b", |_| true), Verdict::Pass);
        assert_eq!(decide_verdict(None, Some(""), "b", |_| false), Verdict::Fail);
    }
}
