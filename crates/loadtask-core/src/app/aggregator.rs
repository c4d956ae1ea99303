//! ResultAggregator - 生のイテレーションから集計ビューを作る
//!
//! レポート生成時にだけ呼ばれ、書き込み経路には入りません。
//! 入力の `data` は変更せず、`info` と正規化済み `iterations` を別に返します。
//!
//! # 手順（ワークロードごと）
//! 1. イテレーション内で同名アトミックアクションを合算
//! 2. イテレーション横断でマージ（出現回数が最大のものが勝つ）
//! 3. `tstamp_start` = 最小タイムスタンプ（空なら 0）
//! 4. `output` の正規化（旧 `scenario_output` の変換を含む）
//! 5. 成功イテレーションの min/max、失敗数
//! 6. `created_at` / `updated_at` を文字列化
//! 7. 統計テーブルの描画
//! 8. `info` の組み立て
//! 9. タイムスタンプ順に並べ、materialized か streaming で公開

use std::cmp::Ordering;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::debug;

use crate::config::{IterationsMode, ReportConfig};
use crate::domain::{
    AtomicStat, AtomicTable, Iteration, IterationOutput, OutputChart, SubtaskRecord, TaskRecord,
    WorkloadInfo, WorkloadRecord,
};
use crate::impls::MainStatsTableFactory;
use crate::ports::StatsTableFactory;

const LEGACY_OUTPUT_TITLE: &str = "Scenario output";

/// Single-pass iteration sequence.
///
/// Not `Clone`: exactly one consumer drains it.
#[derive(Debug)]
pub struct IterationStream {
    inner: std::vec::IntoIter<Iteration>,
}

impl Iterator for IterationStream {
    type Item = Iteration;

    fn next(&mut self) -> Option<Iteration> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for IterationStream {}

/// Normalized iterations of a workload, sorted by timestamp.
#[derive(Debug)]
pub enum Iterations {
    Materialized(Vec<Iteration>),
    Streaming(IterationStream),
}

impl Iterations {
    fn from_sorted(iterations: Vec<Iteration>, mode: IterationsMode) -> Self {
        match mode {
            IterationsMode::Serializable => Iterations::Materialized(iterations),
            IterationsMode::Streaming => Iterations::Streaming(IterationStream {
                inner: iterations.into_iter(),
            }),
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Iterations::Streaming(_))
    }

    /// Remaining iterations.
    pub fn len(&self) -> usize {
        match self {
            Iterations::Materialized(v) => v.len(),
            Iterations::Streaming(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl IntoIterator for Iterations {
    type Item = Iteration;
    type IntoIter = IterationStream;

    fn into_iter(self) -> IterationStream {
        match self {
            Iterations::Materialized(v) => IterationStream {
                inner: v.into_iter(),
            },
            Iterations::Streaming(s) => s,
        }
    }
}

/// A workload plus its derived view.
#[derive(Debug)]
pub struct ExtendedWorkload {
    /// As read from the store; `data` is left untouched.
    pub workload: WorkloadRecord,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub info: WorkloadInfo,
    pub iterations: Iterations,
}

impl ExtendedWorkload {
    /// Extended result document; drains `iterations`.
    pub fn into_extended_result(self) -> Value {
        let iterations: Vec<Iteration> = self.iterations.into_iter().collect();
        let mut doc = json!({
            "task_uuid": self.workload.task_uuid,
            "name": self.workload.name,
            "position": self.workload.position,
            "load_duration": self.workload.load_duration,
            "full_duration": self.workload.full_duration,
            "sla": self.workload.sla_results,
            "hooks": self.workload.hooks,
            "iterations": iterations,
            "info": self.info,
        });
        if let Some(obj) = doc.as_object_mut() {
            if let Some(at) = self.created_at {
                obj.insert("created_at".into(), Value::String(at));
            }
            if let Some(at) = self.updated_at {
                obj.insert("updated_at".into(), Value::String(at));
            }
        }
        doc
    }
}

#[derive(Debug)]
pub struct ExtendedSubtask {
    /// `workloads` is emptied; see the extended list below.
    pub subtask: SubtaskRecord,
    pub workloads: Vec<ExtendedWorkload>,
}

#[derive(Debug)]
pub struct ExtendedTask {
    /// `subtasks` is emptied; see the extended list below.
    pub task: TaskRecord,
    pub subtasks: Vec<ExtendedSubtask>,
}

impl ExtendedTask {
    pub fn workloads(&self) -> impl Iterator<Item = &ExtendedWorkload> {
        self.subtasks.iter().flat_map(|s| s.workloads.iter())
    }

    pub fn workloads_count(&self) -> usize {
        self.subtasks.iter().map(|s| s.workloads.len()).sum()
    }

    /// One extended result document per workload, in subtask order.
    pub fn into_extended_results(self) -> Vec<Value> {
        self.subtasks
            .into_iter()
            .flat_map(|s| s.workloads)
            .map(ExtendedWorkload::into_extended_result)
            .collect()
    }
}

/// Folds one iteration's merged actions into the workload table.
///
/// The iteration with the most occurrences of a name owns that entry;
/// iterations tied on count widen its min/max.
fn fold_atomic(table: &mut AtomicTable, iteration: &Iteration) {
    for (name, merged) in iteration.atomic_actions.merged() {
        let fresh = AtomicStat {
            min_duration: merged.duration,
            max_duration: merged.duration,
            count: merged.count,
        };
        match table.get_mut(&name) {
            Some(stat) => match merged.count.cmp(&stat.count) {
                Ordering::Greater => *stat = fresh,
                Ordering::Equal => {
                    stat.min_duration = stat.min_duration.min(merged.duration);
                    stat.max_duration = stat.max_duration.max(merged.duration);
                }
                Ordering::Less => {}
            },
            None => {
                table.insert(name, fresh);
            }
        }
    }
}

pub fn merge_atomic_table(iterations: &[Iteration]) -> AtomicTable {
    let mut table = AtomicTable::new();
    for iteration in iterations {
        fold_atomic(&mut table, iteration);
    }
    table
}

pub struct ResultAggregator {
    config: ReportConfig,
    factory: Arc<dyn StatsTableFactory>,
}

impl ResultAggregator {
    pub fn new(config: ReportConfig, factory: Arc<dyn StatsTableFactory>) -> Self {
        Self { config, factory }
    }

    /// Default config and `MainStatsTable`.
    pub fn with_defaults() -> Self {
        Self::new(ReportConfig::default(), Arc::new(MainStatsTableFactory))
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Ensures `output` is present, converting deprecated `scenario_output`.
    fn normalize_output(&self, iteration: &mut Iteration) {
        if iteration.output.is_some() {
            return;
        }
        let mut output = IterationOutput::default();
        if let Some(legacy) = iteration
            .scenario_output
            .take_if(|legacy| !legacy.data.is_empty())
        {
            let items: Vec<Value> = legacy
                .data
                .into_iter()
                .map(|(key, value)| json!([key, value]))
                .collect();
            output.additive.push(OutputChart {
                title: LEGACY_OUTPUT_TITLE.to_string(),
                chart_plugin: self.config.legacy_output_chart.clone(),
                data: Value::Array(items),
                description: Some(String::new()),
                label: None,
                axis_label: None,
            });
        }
        iteration.output = Some(output);
    }

    pub fn extend_workload(
        &self,
        workload: WorkloadRecord,
        mode: IterationsMode,
    ) -> ExtendedWorkload {
        let mut atomic = AtomicTable::new();
        let mut tstamp_start: Option<f64> = None;
        let mut durations: Option<(f64, f64)> = None;
        let mut iterations_failed = 0;
        let mut normalized = Vec::with_capacity(workload.data.len());

        for raw in &workload.data {
            fold_atomic(&mut atomic, raw);

            tstamp_start = Some(tstamp_start.map_or(raw.timestamp, |t| t.min(raw.timestamp)));

            let mut iteration = raw.clone();
            self.normalize_output(&mut iteration);

            if iteration.is_failed() {
                iterations_failed += 1;
            } else {
                let d = iteration.duration;
                durations = Some(durations.map_or((d, d), |(lo, hi)| (lo.min(d), hi.max(d))));
            }
            normalized.push(iteration);
        }

        let mut stat = self.factory.create(normalized.len(), &atomic);
        for iteration in &normalized {
            stat.add_iteration(iteration);
        }

        let (min_duration, max_duration) = durations.unwrap_or((0.0, 0.0));
        let info = WorkloadInfo {
            stat: stat.render(),
            atomic,
            iterations_count: normalized.len(),
            iterations_failed,
            min_duration,
            max_duration,
            tstamp_start: tstamp_start.unwrap_or(0.0),
            full_duration: workload.full_duration,
            load_duration: workload.load_duration,
        };
        debug!(
            workload_id = %workload.uuid,
            iterations = info.iterations_count,
            failed = info.iterations_failed,
            "workload extended"
        );

        normalized.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        ExtendedWorkload {
            created_at: workload
                .created_at
                .map(|at| self.config.format_workload_time(at)),
            updated_at: workload
                .updated_at
                .map(|at| self.config.format_workload_time(at)),
            workload,
            info,
            iterations: Iterations::from_sorted(normalized, mode),
        }
    }

    /// Extends every workload of every subtask of a detailed task record.
    pub fn extend_task(&self, mut task: TaskRecord, mode: IterationsMode) -> ExtendedTask {
        let subtasks = std::mem::take(&mut task.subtasks)
            .into_iter()
            .map(|mut subtask| {
                let workloads = std::mem::take(&mut subtask.workloads)
                    .into_iter()
                    .map(|w| self.extend_workload(w, mode))
                    .collect();
                ExtendedSubtask { subtask, workloads }
            })
            .collect();
        ExtendedTask { task, subtasks }
    }
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::with_defaults()
    }
}
