//! Catalog of test prompts and the scoring functions used to compare algorithms.

use crate::client::ChatEngine;
use crate::selection::{select_entries, Dataset, SelectionExample, SelectionOptions};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// One instruction with the IDs a correct answer selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub instruction: String,
    pub expected: Vec<usize>,
}

/// A dataset, its demonstrations and the cases to run against it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub dataset: Dataset,
    #[serde(default)]
    pub examples: Vec<SelectionExample>,
    pub cases: Vec<TestCase>,
}

impl Catalog {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                "invalid test catalog",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("catalog_loader"),
            )
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }
}

fn as_set(ids: &[usize]) -> HashSet<usize> {
    ids.iter().copied().collect()
}

/// 1.0 when both lists select the same IDs (order ignored), else 0.0.
pub fn exact_match(predicted: &[usize], expected: &[usize]) -> f64 {
    if as_set(predicted) == as_set(expected) {
        1.0
    } else {
        0.0
    }
}

/// Share of predicted IDs that were expected. An empty prediction is precise.
pub fn precision(predicted: &[usize], expected: &[usize]) -> f64 {
    let p = as_set(predicted);
    if p.is_empty() {
        return 1.0;
    }
    let hits = p.intersection(&as_set(expected)).count();
    hits as f64 / p.len() as f64
}

/// Share of expected IDs that were predicted. Nothing expected means full recall.
pub fn recall(predicted: &[usize], expected: &[usize]) -> f64 {
    let e = as_set(expected);
    if e.is_empty() {
        return 1.0;
    }
    let hits = e.intersection(&as_set(predicted)).count();
    hits as f64 / e.len() as f64
}

pub fn f1(predicted: &[usize], expected: &[usize]) -> f64 {
    let p = precision(predicted, expected);
    let r = recall(predicted, expected);
    if p + r == 0.0 {
        0.0
    } else {
        2.0 * p * r / (p + r)
    }
}

/// Outcome of one test case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub name: String,
    pub predicted: Option<Vec<usize>>,
    pub expected: Vec<usize>,
    pub f1: f64,
    pub exact: bool,
    pub attempts: u32,
    pub error: Option<String>,
}

/// Aggregate over a catalog run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub cases: usize,
    pub exact: usize,
    pub failed: usize,
    pub mean_f1: f64,
}

impl Summary {
    pub fn from_reports(reports: &[CaseReport]) -> Self {
        let cases = reports.len();
        let mean_f1 = if cases == 0 {
            0.0
        } else {
            reports.iter().map(|r| r.f1).sum::<f64>() / cases as f64
        };
        Self {
            cases,
            exact: reports.iter().filter(|r| r.exact).count(),
            failed: reports.iter().filter(|r| r.error.is_some()).count(),
            mean_f1,
        }
    }
}

/// Model invocations behind a failed selection.
fn attempts_made(err: &Error) -> u32 {
    match err {
        Error::RetriesExhausted { attempts, .. } => *attempts,
        // rejected before any model call
        Error::Configuration { .. } => 0,
        _ => 1,
    }
}

/// Run every case of `catalog` sequentially. A failed case scores zero and the run
/// continues.
pub async fn run_catalog(
    engine: &ChatEngine,
    catalog: &Catalog,
    options: &SelectionOptions,
) -> Vec<CaseReport> {
    let mut options = options.clone();
    if options.examples.is_empty() {
        options.examples = catalog.examples.clone();
    }

    let mut reports = Vec::with_capacity(catalog.cases.len());
    for case in &catalog.cases {
        let report = match select_entries(engine, &catalog.dataset, &case.instruction, &options).await {
            Ok((selected, stats)) => {
                let predicted: Vec<usize> = selected.iter().map(|s| s.id).collect();
                CaseReport {
                    name: case.name.clone(),
                    f1: f1(&predicted, &case.expected),
                    exact: exact_match(&predicted, &case.expected) == 1.0,
                    predicted: Some(predicted),
                    expected: case.expected.clone(),
                    attempts: stats.attempts,
                    error: None,
                }
            }
            Err(e) => CaseReport {
                name: case.name.clone(),
                predicted: None,
                expected: case.expected.clone(),
                f1: 0.0,
                exact: false,
                attempts: attempts_made(&e),
                error: Some(e.to_string()),
            },
        };
        info!(
            case = report.name.as_str(),
            f1 = report.f1,
            exact = report.exact,
            attempts = report.attempts,
            "test case scored"
        );
        reports.push(report);
    }
    reports
}
