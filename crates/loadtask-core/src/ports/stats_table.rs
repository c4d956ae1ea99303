//! StatsTable port - 統計テーブルの描画
//!
//! 集計器は反復回数と atomic テーブルでテーブルを作り、
//! 各イテレーションを元の順序で追加してから `render` します。

use crate::domain::{AtomicTable, Iteration, StatTable};

pub trait StatsTable {
    /// Iterations arrive normalized and in their original order.
    fn add_iteration(&mut self, iteration: &Iteration);

    fn render(&self) -> StatTable;
}

pub trait StatsTableFactory: Send + Sync {
    fn create(&self, iterations_count: usize, atomic: &AtomicTable) -> Box<dyn StatsTable>;
}
