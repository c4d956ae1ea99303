//! MainStatsTable - 既定の統計テーブル
//!
//! 行はアトミックアクションごと（atomic テーブル順）と最後の `total`。
//! 所要時間のサンプルは成功したイテレーションのみから取ります。

use indexmap::IndexMap;
use serde_json::Value;

use crate::domain::{AtomicTable, Iteration, StatTable};
use crate::ports::{StatsTable, StatsTableFactory};

pub const COLUMNS: [&str; 9] = [
    "Action",
    "Min (sec)",
    "Median (sec)",
    "90%ile (sec)",
    "95%ile (sec)",
    "Max (sec)",
    "Avg (sec)",
    "Success",
    "Count",
];

const TOTAL: &str = "total";

#[derive(Debug, Default, Clone)]
struct RowStats {
    samples: Vec<f64>,
    succeeded: usize,
    count: usize,
}

impl RowStats {
    fn record(&mut self, duration: f64, failed: bool) {
        self.count += 1;
        if !failed {
            self.succeeded += 1;
            self.samples.push(duration);
        }
    }

    fn render(&self, name: &str) -> Vec<Value> {
        let mut sorted = self.samples.clone();
        sorted.sort_by(f64::total_cmp);

        let mut row = vec![Value::from(name)];
        if sorted.is_empty() {
            row.extend(std::iter::repeat_n(Value::from("n/a"), 6));
        } else {
            let sum: f64 = sorted.iter().sum();
            let avg = sum / sorted.len() as f64;
            for v in [
                sorted[0],
                percentile(&sorted, 0.5),
                percentile(&sorted, 0.9),
                percentile(&sorted, 0.95),
                sorted[sorted.len() - 1],
                avg,
            ] {
                row.push(Value::from(round3(v)));
            }
        }
        row.push(if self.count == 0 {
            Value::from("n/a")
        } else {
            Value::from(format!(
                "{:.1}%",
                self.succeeded as f64 * 100.0 / self.count as f64
            ))
        });
        row.push(Value::from(self.count));
        row
    }
}

/// Linear interpolation between the closest ranks of `sorted`.
pub fn percentile(sorted: &[f64], percent: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let k = (sorted.len() - 1) as f64 * percent;
    let f = k.floor();
    let c = k.ceil();
    if f == c {
        return sorted[k as usize];
    }
    sorted[f as usize] * (c - k) + sorted[c as usize] * (k - f)
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

pub struct MainStatsTable {
    actions: IndexMap<String, RowStats>,
    total: RowStats,
}

impl MainStatsTable {
    pub fn new(iterations_count: usize, atomic: &AtomicTable) -> Self {
        let actions = atomic
            .keys()
            .map(|name| (name.clone(), RowStats::default()))
            .collect();
        Self {
            actions,
            total: RowStats {
                samples: Vec::with_capacity(iterations_count),
                ..Default::default()
            },
        }
    }
}

impl StatsTable for MainStatsTable {
    fn add_iteration(&mut self, iteration: &Iteration) {
        let failed = iteration.is_failed();
        for (name, merged) in iteration.atomic_actions.merged() {
            self.actions
                .entry(name)
                .or_default()
                .record(merged.duration, failed);
        }
        self.total.record(iteration.duration, failed);
    }

    fn render(&self) -> StatTable {
        let mut rows: Vec<Vec<Value>> = self
            .actions
            .iter()
            .map(|(name, stats)| stats.render(name))
            .collect();
        rows.push(self.total.render(TOTAL));
        StatTable {
            cols: COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MainStatsTableFactory;

impl StatsTableFactory for MainStatsTableFactory {
    fn create(&self, iterations_count: usize, atomic: &AtomicTable) -> Box<dyn StatsTable> {
        Box::new(MainStatsTable::new(iterations_count, atomic))
    }
}
