//! FILENAME: core/table-engine/src/features/column_sizing.rs
//! PURPOSE: Column widths, header widths and drag-resizing.
//! CONTEXT: A resize is three calls: `begin_resize` on a header captures the
//! starting pointer offset and the sizes of every leaf beneath the header,
//! `update_resize` scales those sizes by the relative pointer delta, and
//! `end_resize` commits them and clears the drag bookkeeping. With
//! `ColumnResizeMode::OnChange` sizes are written on every update, with
//! `OnEnd` only when the drag ends.

use crate::column::{TableColumn, DEFAULT_COLUMN_MAX_SIZE, DEFAULT_COLUMN_MIN_SIZE, DEFAULT_COLUMN_SIZE};
use crate::features::{ColumnVisibility, Feature};
use crate::header::{ColumnRegion, TableHeader};
use crate::options::{ColumnResizeDirection, ColumnResizeMode};
use crate::state::{ColumnSizingInfoState, ColumnSizingState, TableState};
use crate::table::Table;
use crate::utils::Updater;
use crate::value::Record;

/// Smallest relative change a drag can make; a column never collapses to zero
/// in a single move.
const MIN_DELTA_PERCENTAGE: f64 = -0.999999;

/// Applies a pointer position to an in-progress drag. Returns the updated
/// drag info and the new size of every captured leaf column.
pub(crate) fn resize_step(
    info: &ColumnSizingInfoState,
    client_x: f64,
    direction: ColumnResizeDirection,
) -> (ColumnSizingInfoState, Vec<(String, f64)>) {
    let sign = match direction {
        ColumnResizeDirection::Ltr => 1.0,
        ColumnResizeDirection::Rtl => -1.0,
    };
    let delta_offset = (client_x - info.start_offset.unwrap_or(0.0)) * sign;
    let start_size = info.start_size.unwrap_or(0.0);
    let delta_percentage = if start_size > 0.0 {
        (delta_offset / start_size).max(MIN_DELTA_PERCENTAGE)
    } else {
        0.0
    };

    let sizes = info
        .column_sizing_start
        .iter()
        .map(|(id, size)| {
            let next = (size + size * delta_percentage).max(0.0);
            (id.clone(), (next * 100.0).round() / 100.0)
        })
        .collect();

    let next = ColumnSizingInfoState {
        delta_offset: Some(delta_offset),
        delta_percentage: Some(delta_percentage),
        ..info.clone()
    };
    (next, sizes)
}

// ============================================================================
// TABLE
// ============================================================================

impl<T: Record> Table<T> {
    pub fn set_column_sizing(&self, updater: impl Into<Updater<ColumnSizingState>>) {
        self.update_slice(updater.into(), |s| &mut s.column_sizing, |o| o.on_column_sizing_change.as_ref());
    }

    pub fn set_column_sizing_info(&self, updater: impl Into<Updater<ColumnSizingInfoState>>) {
        self.update_slice(updater.into(), |s| &mut s.column_sizing_info, |o| {
            o.on_column_sizing_info_change.as_ref()
        });
    }

    pub fn reset_column_sizing(&self, default: bool) {
        let next = if default {
            TableState::default().column_sizing
        } else {
            self.initial_state().column_sizing.clone()
        };
        self.set_column_sizing(next);
    }

    pub fn reset_header_size_info(&self, default: bool) {
        let next = if default {
            TableState::default().column_sizing_info
        } else {
            self.initial_state().column_sizing_info.clone()
        };
        self.set_column_sizing_info(next);
    }

    /// Width of the top header row.
    pub fn get_total_size(&self) -> f64 {
        self.total_size_of(ColumnRegion::All)
    }

    pub fn get_left_total_size(&self) -> f64 {
        self.total_size_of(ColumnRegion::Left)
    }

    pub fn get_center_total_size(&self) -> f64 {
        self.total_size_of(ColumnRegion::Center)
    }

    pub fn get_right_total_size(&self) -> f64 {
        self.total_size_of(ColumnRegion::Right)
    }

    fn total_size_of(&self, region: ColumnRegion) -> f64 {
        let groups = self.header_groups_for(region);
        let Some(top) = groups.first() else {
            return 0.0;
        };
        top.headers
            .iter()
            .map(|h| self.header_handle(h.clone()).get_size())
            .sum()
    }

    /// Moves the drag started by `HeaderSizing::begin_resize` to `client_x`.
    pub fn update_resize(&self, client_x: f64) {
        self.resize_to(client_x, false);
    }

    /// Finishes the drag at `client_x` and clears the drag bookkeeping.
    pub fn end_resize(&self, client_x: f64) {
        self.resize_to(client_x, true);
        self.set_column_sizing_info(ColumnSizingInfoState::default());
    }

    fn resize_to(&self, client_x: f64, is_end: bool) {
        let info = self.get_state().column_sizing_info;
        let Some(column_id) = info.is_resizing_column.as_deref() else {
            log::debug!(target: "table_engine::sizing", "resize update without an active drag");
            return;
        };
        let settings = self.options().settings.clone();
        let (next_info, sizes) = resize_step(&info, client_x, settings.column_resize_direction);
        log::trace!(
            target: "table_engine::sizing",
            "resizing '{}' by {:.2}",
            column_id,
            next_info.delta_offset.unwrap_or(0.0)
        );
        self.set_column_sizing_info(next_info);

        if settings.column_resize_mode == ColumnResizeMode::OnChange || is_end {
            self.set_column_sizing(Updater::with(move |old: &ColumnSizingState| {
                let mut next = old.clone();
                next.extend(sizes);
                next
            }));
        }
    }
}

// ============================================================================
// COLUMN CAPABILITY
// ============================================================================

pub trait ColumnSizing {
    /// The stored size (or the definition's size) clamped to the column's bounds.
    fn get_size(&self) -> f64;
    /// Sum of the sizes of the visible columns before this one in `region`.
    fn get_start(&self, region: ColumnRegion) -> f64;
    /// Sum of the sizes of the visible columns after this one in `region`.
    fn get_after(&self, region: ColumnRegion) -> f64;
    fn reset_size(&self);
    fn get_can_resize(&self) -> bool;
    fn get_is_resizing(&self) -> bool;
}

impl<'t, T: Record> ColumnSizing for TableColumn<'t, T> {
    fn get_size(&self) -> f64 {
        let def = &self.column.def;
        let stored = if self.table.has_feature(Feature::ColumnSizing) {
            self.table.get_state().column_sizing.get(&self.column.id).copied()
        } else {
            None
        };
        let size = stored.or(def.size).unwrap_or(DEFAULT_COLUMN_SIZE);
        size.max(def.min_size.unwrap_or(DEFAULT_COLUMN_MIN_SIZE))
            .min(def.max_size.unwrap_or(DEFAULT_COLUMN_MAX_SIZE))
    }

    fn get_start(&self, region: ColumnRegion) -> f64 {
        let layout = self.table.column_layout();
        let columns = layout.visible_in(region);
        let Some(index) = columns.iter().position(|c| c.id == self.column.id) else {
            return 0.0;
        };
        self.table
            .column_handles(columns[..index].iter().cloned())
            .iter()
            .map(|c| c.get_size())
            .sum()
    }

    fn get_after(&self, region: ColumnRegion) -> f64 {
        let layout = self.table.column_layout();
        let columns = layout.visible_in(region);
        let Some(index) = columns.iter().position(|c| c.id == self.column.id) else {
            return 0.0;
        };
        self.table
            .column_handles(columns[index + 1..].iter().cloned())
            .iter()
            .map(|c| c.get_size())
            .sum()
    }

    fn reset_size(&self) {
        let column_id = self.column.id.clone();
        self.table.set_column_sizing(Updater::with(move |old: &ColumnSizingState| {
            let mut next = old.clone();
            next.remove(&column_id);
            next
        }));
    }

    fn get_can_resize(&self) -> bool {
        self.table.has_feature(Feature::ColumnSizing)
            && self.column.def.enable_resizing.unwrap_or(true)
            && self.table.options().settings.enable_column_resizing
    }

    fn get_is_resizing(&self) -> bool {
        self.table.get_state().column_sizing_info.is_resizing_column.as_deref() == Some(self.column.id.as_str())
    }
}

// ============================================================================
// HEADER CAPABILITY
// ============================================================================

pub trait HeaderSizing {
    /// Sum of the sizes of the leaf columns beneath this header.
    fn get_size(&self) -> f64;
    /// Sum of the sizes of the headers before this one in its group.
    fn get_start(&self) -> f64;
    /// Starts a drag at pointer offset `client_x`. Ignored for columns that
    /// cannot resize.
    fn begin_resize(&self, client_x: f64);
}

impl<'t, T: Record> HeaderSizing for TableHeader<'t, T> {
    fn get_size(&self) -> f64 {
        self.get_leaf_headers().iter().map(|h| h.get_column().get_size()).sum()
    }

    fn get_start(&self) -> f64 {
        if self.header.index == 0 {
            return 0.0;
        }
        let Some(group) = self.header_group() else {
            return 0.0;
        };
        group
            .headers
            .iter()
            .take(self.header.index)
            .map(|h| self.table.header_handle(h.clone()).get_size())
            .sum()
    }

    fn begin_resize(&self, client_x: f64) {
        let column = self.get_column();
        if !column.get_can_resize() {
            return;
        }
        let column_sizing_start: Vec<(String, f64)> = self
            .get_leaf_headers()
            .iter()
            .map(|h| {
                let leaf = h.get_column();
                let size = if leaf.get_is_visible() { leaf.get_size() } else { 0.0 };
                (leaf.id.clone(), size)
            })
            .collect();
        let start_size = self.get_size();
        let column_id = column.id.clone();
        self.table.set_column_sizing_info(Updater::with(move |old: &ColumnSizingInfoState| {
            ColumnSizingInfoState {
                start_offset: Some(client_x),
                start_size: Some(start_size),
                delta_offset: Some(0.0),
                delta_percentage: Some(0.0),
                is_resizing_column: Some(column_id),
                column_sizing_start,
                ..old.clone()
            }
        }));
    }
}
