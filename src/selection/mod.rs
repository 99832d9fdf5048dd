//! ID selection: pick dataset entries from a natural-language instruction.
//!
//! The model answers with entry IDs; [`id_list_transform`] checks the answer and
//! maps it back to entries, producing diagnostics the model can act on.

use crate::client::{ChatEngine, ChatStats};
use crate::prompt::FewShotPrompt;
use crate::request::ChatOptions;
use crate::structured::JsonMode;
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// GBNF grammar for a JSON array of non-negative integers.
pub const ID_LIST_GRAMMAR: &str = r#"root ::= "[" ws ( id ( ws "," ws id )* )? ws "]"
id ::= "0" | [1-9] [0-9]*
ws ::= [ \t\n]*
"#;

/// One selectable entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Label(String),
    Full(Entry),
}

/// Entries addressed by their position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dataset {
    entries: Vec<Entry>,
}

impl<'de> Deserialize<'de> for Dataset {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Vec::<RawEntry>::deserialize(deserializer)?;
        Ok(Self {
            entries: raw
                .into_iter()
                .map(|r| match r {
                    RawEntry::Label(label) => Entry {
                        label,
                        description: None,
                    },
                    RawEntry::Full(entry) => entry,
                })
                .collect(),
        })
    }
}

impl Dataset {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            labels
                .into_iter()
                .map(|l| Entry {
                    label: l.into(),
                    description: None,
                })
                .collect(),
        )
    }

    /// Load from a YAML or JSON file holding a list of labels or `{label, description}`
    /// objects.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&text).map_err(|e| {
            Error::configuration_with_context(
                "invalid dataset",
                ErrorContext::new()
                    .with_field_path(path.display().to_string())
                    .with_details(e.to_string())
                    .with_source("dataset_loader"),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// One `"<id>: <label>"` line per entry, with the description if present.
    pub fn listing(&self) -> String {
        self.entries
            .iter()
            .enumerate()
            .map(|(id, e)| match &e.description {
                Some(d) => format!("{}: {} ({})", id, e.label, d),
                None => format!("{}: {}", id, e.label),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn id_list(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get("ids").and_then(Value::as_array),
        _ => None,
    }
}

fn join_ids<'a>(ids: impl IntoIterator<Item = &'a u64>) -> String {
    ids.into_iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check an ID-list answer against `dataset` and return the selected IDs.
///
/// Accepts a bare array or an object with an `ids` array. Rejects non-integers,
/// duplicates and unknown IDs with a diagnostic addressed to the model.
pub fn validate_ids(value: &Value, dataset: &Dataset) -> std::result::Result<Vec<usize>, String> {
    let items = id_list(value).ok_or_else(|| {
        "Please answer with a JSON array of IDs, for example [0, 3].".to_string()
    })?;

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        let id = item
            .as_u64()
            .ok_or_else(|| format!("{} is not a valid ID. IDs are non-negative integers.", item))?;
        ids.push(id);
    }

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for id in &ids {
        if !seen.insert(*id) && !duplicates.contains(id) {
            duplicates.push(*id);
        }
    }
    if !duplicates.is_empty() {
        return Err(format!(
            "The list contains duplicate IDs: {}. Please list each ID only once.",
            join_ids(&duplicates)
        ));
    }

    let unknown: Vec<u64> = ids
        .iter()
        .copied()
        .filter(|id| usize::try_from(*id).map_or(true, |i| i >= dataset.len()))
        .collect();
    if !unknown.is_empty() {
        let valid = match dataset.len() {
            0 => "There are no valid IDs.".to_string(),
            n => format!("Valid IDs are 0 to {}.", n - 1),
        };
        return Err(format!(
            "These IDs do not exist: {}. {}",
            join_ids(&unknown),
            valid
        ));
    }

    Ok(ids.into_iter().map(|id| id as usize).collect())
}

/// An entry picked by the model, with its ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selected {
    pub id: usize,
    pub entry: Entry,
}

/// Transform for the chat engine: ID-list answer → selected entries.
pub fn id_list_transform(
    dataset: &Dataset,
) -> impl Fn(Value) -> std::result::Result<Vec<Selected>, String> + Send + Sync + '_ {
    move |value| {
        let ids = validate_ids(&value, dataset)?;
        Ok(ids
            .into_iter()
            .filter_map(|id| {
                dataset.get(id).map(|entry| Selected {
                    id,
                    entry: entry.clone(),
                })
            })
            .collect())
    }
}

/// How the model is steered towards an ID list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Grammar-constrained JSON array (`JsonMode::Any` + [`ID_LIST_GRAMMAR`]).
    #[default]
    Grammar,
    /// Native JSON object mode, answer shaped `{"ids": [...]}`.
    Json,
}

impl Algorithm {
    fn render(&self, ids: &[usize]) -> String {
        match self {
            Algorithm::Grammar => serde_json::json!(ids).to_string(),
            Algorithm::Json => serde_json::json!({ "ids": ids }).to_string(),
        }
    }

    fn instructions(&self) -> &'static str {
        match self {
            Algorithm::Grammar => {
                "Answer with a JSON array containing the IDs of every matching entry, and nothing else."
            }
            Algorithm::Json => {
                "Answer with a JSON object of the form {\"ids\": [...]} listing the IDs of every matching entry, and nothing else."
            }
        }
    }
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "grammar" => Ok(Algorithm::Grammar),
            "json" => Ok(Algorithm::Json),
            _ => Err(format!("Unknown algorithm: {}", s)),
        }
    }
}

/// A demonstration for the selection prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionExample {
    pub instruction: String,
    pub ids: Vec<usize>,
}

/// Knobs for [`select_entries`].
#[derive(Debug, Clone, Default)]
pub struct SelectionOptions {
    pub algorithm: Algorithm,
    pub examples: Vec<SelectionExample>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_length: Option<usize>,
    pub retries: Option<u32>,
}

/// Chat options for selecting from `dataset`, before any model call.
pub fn selection_options(dataset: &Dataset, instruction: &str, options: &SelectionOptions) -> ChatOptions {
    let algorithm = options.algorithm;
    let prompt = FewShotPrompt::new()
        .system(format!(
            "You select entries from the list below by their numeric ID. {}",
            algorithm.instructions()
        ))
        .context(format!("Entries:\n{}", dataset.listing()))
        .examples(options.examples.iter().map(|ex| {
            crate::prompt::FewShotExample::new(ex.instruction.clone(), algorithm.render(&ex.ids))
        }));

    let mut chat = ChatOptions::new(prompt.build(instruction));
    chat = match algorithm {
        Algorithm::Grammar => chat.json(JsonMode::Any).grammar(ID_LIST_GRAMMAR),
        Algorithm::Json => chat.json(JsonMode::Object),
    };
    if let Some(model) = &options.model {
        chat = chat.model(model.clone());
    }
    if let Some(t) = options.temperature {
        chat = chat.temperature(t);
    }
    if let Some(max) = options.max_length {
        chat = chat.max_length(max);
    }
    if let Some(retries) = options.retries {
        chat = chat.retries(retries);
    }
    chat
}

/// Ask the model which entries of `dataset` match `instruction`.
pub async fn select_entries(
    engine: &ChatEngine,
    dataset: &Dataset,
    instruction: &str,
    options: &SelectionOptions,
) -> Result<(Vec<Selected>, ChatStats)> {
    let chat = selection_options(dataset, instruction, options);
    engine
        .chat_with_stats(chat, id_list_transform(dataset))
        .await
}
