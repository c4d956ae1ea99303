//! Iteration records: one measured execution of a workload's scenario.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A named, timed sub-step of one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtomicAction {
    pub name: String,
    pub started_at: f64,
    pub finished_at: f64,
}

impl AtomicAction {
    pub fn duration(&self) -> f64 {
        self.finished_at - self.started_at
    }
}

/// Atomic actions of an iteration.
///
/// Old result files store a `name -> duration` mapping instead of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AtomicActions {
    Timeline(Vec<AtomicAction>),
    Legacy(IndexMap<String, f64>),
}

impl Default for AtomicActions {
    fn default() -> Self {
        AtomicActions::Timeline(Vec::new())
    }
}

/// Same-named actions of one iteration, folded together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedAction {
    pub duration: f64,
    pub count: u32,
}

impl AtomicActions {
    /// Sums durations and counts occurrences per name, in first-seen order.
    pub fn merged(&self) -> IndexMap<String, MergedAction> {
        let mut merged: IndexMap<String, MergedAction> = IndexMap::new();
        let mut add = |name: &str, duration: f64| match merged.get_mut(name) {
            Some(entry) => {
                entry.duration += duration;
                entry.count += 1;
            }
            None => {
                merged.insert(
                    name.to_string(),
                    MergedAction { duration, count: 1 },
                );
            }
        };
        match self {
            AtomicActions::Timeline(actions) => {
                for action in actions {
                    add(&action.name, action.duration());
                }
            }
            AtomicActions::Legacy(durations) => {
                for (name, duration) in durations {
                    add(name, *duration);
                }
            }
        }
        merged
    }
}

/// One chart of an iteration's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputChart {
    pub title: String,
    pub chart_plugin: String,
    /// `[[label, number], ..]`, a `{cols, rows}` table or a list of strings.
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis_label: Option<String>,
}

/// Chart-ready output of an iteration.
///
/// - `additive`: independent series that can be summed across iterations.
/// - `complete`: full-state snapshots (tables, paired series, labels).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IterationOutput {
    pub additive: Vec<OutputChart>,
    pub complete: Vec<OutputChart>,
}

/// Deprecated `scenario_output` field of old iterations.
///
/// Values are kept as written; they are not required to be numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyScenarioOutput {
    #[serde(default)]
    pub data: IndexMap<String, Value>,
    #[serde(default)]
    pub errors: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iteration {
    /// Seconds since epoch.
    pub timestamp: f64,

    #[serde(default, deserialize_with = "null_as_zero")]
    pub duration: f64,

    #[serde(default, deserialize_with = "null_as_zero")]
    pub idle_duration: f64,

    /// Empty, or `[type, message, traceback]`.
    pub error: Vec<String>,

    pub atomic_actions: AtomicActions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<IterationOutput>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_output: Option<LegacyScenarioOutput>,
}

impl Iteration {
    pub fn new(timestamp: f64, duration: f64) -> Self {
        Self {
            timestamp,
            duration,
            idle_duration: 0.0,
            error: Vec::new(),
            atomic_actions: AtomicActions::default(),
            output: None,
            scenario_output: None,
        }
    }

    pub fn with_error(
        mut self,
        etype: impl Into<String>,
        msg: impl Into<String>,
        trace: impl Into<String>,
    ) -> Self {
        self.error = vec![etype.into(), msg.into(), trace.into()];
        self
    }

    pub fn with_action(
        mut self,
        name: impl Into<String>,
        started_at: f64,
        finished_at: f64,
    ) -> Self {
        let action = AtomicAction {
            name: name.into(),
            started_at,
            finished_at,
        };
        match &mut self.atomic_actions {
            AtomicActions::Timeline(actions) => actions.push(action),
            AtomicActions::Legacy(durations) => {
                durations.insert(action.name.clone(), action.duration());
            }
        }
        self
    }

    pub fn is_failed(&self) -> bool {
        !self.error.is_empty()
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}
