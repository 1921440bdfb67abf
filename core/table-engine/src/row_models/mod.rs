//! FILENAME: core/table-engine/src/row_models/mod.rs
//! Row Model Pipeline - Stage-by-stage derivation of the rows to render.
//!
//! This module is organized into layers:
//! - `core_model`: records -> row forest (always present)
//! - `filtered`: column filters and the global filter
//! - `grouped`: synthetic group rows with aggregated values
//! - `sorted`: multi-column stable sort, recursive into sub-rows
//! - `expanded`: flattens the forest honoring the expanded state
//! - `paginated`: cuts one page out of the upstream rows
//!
//! Every stage is a memo cell keyed by the identity of its input model plus
//! the state slices and settings it reads, so repeated reads between writes
//! are cache hits and a slice change only recomputes the stages that read it.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::TableResult;
use crate::row::RowModel;
use crate::table::Table;
use crate::utils::{ptr_key, Memo, PtrEq};
use crate::value::Record;

pub mod core_model;
pub mod expanded;
pub mod filtered;
pub mod grouped;
pub mod paginated;
pub mod sorted;

pub use core_model::build_core_row_model;

// ============================================================================
// PIPELINE CONFIGURATION
// ============================================================================

/// An optional pipeline stage. Core is always present and never listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Filtered,
    Grouped,
    Sorted,
    Expanded,
    Paginated,
}

impl Stage {
    /// Canonical order: filtered, grouped, sorted, expanded, paginated.
    pub const CANONICAL: [Stage; 5] = [
        Stage::Filtered,
        Stage::Grouped,
        Stage::Sorted,
        Stage::Expanded,
        Stage::Paginated,
    ];

    pub fn rank(self) -> u8 {
        match self {
            Stage::Filtered => 1,
            Stage::Grouped => 2,
            Stage::Sorted => 3,
            Stage::Expanded => 4,
            Stage::Paginated => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::Filtered => "filtered",
            Stage::Grouped => "grouped",
            Stage::Sorted => "sorted",
            Stage::Expanded => "expanded",
            Stage::Paginated => "paginated",
        }
    }
}

/// The ordered list of stages run after the core model. Empty means core only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RowModelPipeline {
    stages: Vec<Stage>,
}

impl RowModelPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stage in canonical order.
    pub fn full() -> Self {
        Self::ordered(Stage::CANONICAL)
    }

    /// Stages in exactly the given order. Repeats after the first are dropped.
    pub fn ordered(stages: impl IntoIterator<Item = Stage>) -> Self {
        let mut out: Vec<Stage> = Vec::new();
        for stage in stages {
            if !out.contains(&stage) {
                out.push(stage);
            }
        }
        RowModelPipeline { stages: out }
    }

    /// Adds `stage` before the first configured stage of higher rank.
    pub fn with_stage(mut self, stage: Stage) -> Self {
        if self.stages.contains(&stage) {
            return self;
        }
        let at = self
            .stages
            .iter()
            .position(|s| s.rank() > stage.rank())
            .unwrap_or(self.stages.len());
        self.stages.insert(at, stage);
        self
    }

    pub fn with_filtered(self) -> Self {
        self.with_stage(Stage::Filtered)
    }

    pub fn with_grouped(self) -> Self {
        self.with_stage(Stage::Grouped)
    }

    pub fn with_sorted(self) -> Self {
        self.with_stage(Stage::Sorted)
    }

    pub fn with_expanded(self) -> Self {
        self.with_stage(Stage::Expanded)
    }

    pub fn with_paginated(self) -> Self {
        self.with_stage(Stage::Paginated)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    fn position(&self, stage: Stage) -> Option<usize> {
        self.stages.iter().position(|s| *s == stage)
    }

    /// Position of the last configured stage ranked below `stage`.
    fn last_below(&self, stage: Stage) -> Option<usize> {
        self.stages.iter().rposition(|s| s.rank() < stage.rank())
    }
}

// ============================================================================
// MEMO CELLS
// ============================================================================

pub(crate) type ModelRef<T> = Rc<RowModel<T>>;
type StageMemo<T, D> = Memo<(PtrEq<RowModel<T>>, D), ModelRef<T>>;

pub(crate) struct PipelineMemos<T> {
    pub(crate) core: Memo<core_model::CoreDeps<T>, ModelRef<T>>,
    pub(crate) filtered: StageMemo<T, filtered::FilterDeps<T>>,
    pub(crate) grouped: StageMemo<T, grouped::GroupDeps<T>>,
    pub(crate) sorted: StageMemo<T, sorted::SortDeps<T>>,
    pub(crate) expanded: StageMemo<T, expanded::ExpandDeps>,
    pub(crate) paginated: StageMemo<T, paginated::PageDeps>,
}

impl<T> PipelineMemos<T> {
    pub(crate) fn new() -> Self {
        PipelineMemos {
            core: Memo::new("getCoreRowModel"),
            filtered: Memo::new("getFilteredRowModel"),
            grouped: Memo::new("getGroupedRowModel"),
            sorted: Memo::new("getSortedRowModel"),
            expanded: Memo::new("getExpandedRowModel"),
            paginated: Memo::new("getPaginationRowModel"),
        }
    }
}

// ============================================================================
// GETTERS
// ============================================================================

impl<T: Record> Table<T> {
    /// Rows built straight from the data. Never fails.
    pub fn get_core_row_model(&self) -> Rc<RowModel<T>> {
        let options = self.options();
        let deps = (
            PtrEq::new(&options.data),
            PtrEq::new(options.columns.tree()),
            ptr_key(&options.get_row_id),
            ptr_key(&options.get_sub_rows),
        );
        self.memos
            .pipeline
            .core
            .get_logged(deps, options.settings.debug_rows_enabled(), |_| {
                Rc::new(build_core_row_model(
                    &options.data,
                    options.get_row_id.as_ref(),
                    options.get_sub_rows.as_ref(),
                ))
            })
    }

    fn run_stage(&self, stage: Stage, input: ModelRef<T>) -> TableResult<ModelRef<T>> {
        match stage {
            Stage::Filtered => filtered::run(self, input),
            Stage::Grouped => grouped::run(self, input),
            Stage::Sorted => sorted::run(self, input),
            Stage::Expanded => expanded::run(self, input),
            Stage::Paginated => paginated::run(self, input),
        }
    }

    /// Output of the pipeline prefix ending at `end` (exclusive).
    fn pipeline_prefix(&self, end: usize) -> TableResult<ModelRef<T>> {
        let pipeline = self.options().pipeline.clone();
        let mut model = self.get_core_row_model();
        for &stage in pipeline.stages().iter().take(end) {
            model = self.run_stage(stage, model)?;
        }
        Ok(model)
    }

    /// Output of `stage`, or of the last configured stage ranked below it.
    fn stage_output(&self, stage: Stage) -> TableResult<ModelRef<T>> {
        let pipeline = self.options().pipeline.clone();
        match pipeline.position(stage).or_else(|| pipeline.last_below(stage)) {
            Some(at) => self.pipeline_prefix(at + 1),
            None => Ok(self.get_core_row_model()),
        }
    }

    /// Input of `stage`. Unconfigured stages pass their input through.
    fn stage_input(&self, stage: Stage) -> TableResult<ModelRef<T>> {
        let pipeline = self.options().pipeline.clone();
        match pipeline.position(stage) {
            Some(at) => self.pipeline_prefix(at),
            None => self.stage_output(stage),
        }
    }

    /// Output of the whole pipeline.
    pub fn get_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        let len = self.options().pipeline.stages().len();
        self.pipeline_prefix(len)
    }

    pub fn get_pre_filtered_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        self.stage_input(Stage::Filtered)
    }

    pub fn get_filtered_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        self.stage_output(Stage::Filtered)
    }

    pub fn get_pre_grouped_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        self.stage_input(Stage::Grouped)
    }

    pub fn get_grouped_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        self.stage_output(Stage::Grouped)
    }

    pub fn get_pre_sorted_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        self.stage_input(Stage::Sorted)
    }

    pub fn get_sorted_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        self.stage_output(Stage::Sorted)
    }

    pub fn get_pre_expanded_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        self.stage_input(Stage::Expanded)
    }

    pub fn get_expanded_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        self.stage_output(Stage::Expanded)
    }

    pub fn get_pre_pagination_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        self.stage_input(Stage::Paginated)
    }

    pub fn get_pagination_row_model(&self) -> TableResult<Rc<RowModel<T>>> {
        self.stage_output(Stage::Paginated)
    }
}
