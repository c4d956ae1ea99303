//! Aggregated, derived view of a workload's iterations.
//!
//! Never persisted: recomputed from `data` each time a report is built.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Cross-iteration timing of one atomic action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtomicStat {
    pub min_duration: f64,
    pub max_duration: f64,
    pub count: u32,
}

/// Action name -> stats, in first-seen order.
pub type AtomicTable = IndexMap<String, AtomicStat>;

/// Rendered statistics table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatTable {
    pub cols: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadInfo {
    pub stat: StatTable,
    pub atomic: AtomicTable,
    pub iterations_count: usize,
    pub iterations_failed: usize,
    pub min_duration: f64,
    pub max_duration: f64,
    pub tstamp_start: f64,
    pub full_duration: f64,
    pub load_duration: f64,
}
