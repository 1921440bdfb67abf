//! FILENAME: core/table-engine/src/features/pagination.rs
//! PURPOSE: Pagination state and page navigation.
//! CONTEXT: Page indexes are clamped only when the caller configures
//! `page_count` (server-side pagination). Without it any index is accepted
//! and an out-of-range page simply renders no rows.

use crate::state::{PaginationState, TableState, DEFAULT_PAGE_INDEX, DEFAULT_PAGE_SIZE};
use crate::table::Table;
use crate::utils::Updater;
use crate::value::Record;

impl<T: Record> Table<T> {
    pub fn set_pagination(&self, updater: impl Into<Updater<PaginationState>>) {
        self.update_slice(updater.into(), |s| &mut s.pagination, |o| o.on_pagination_change.as_ref());
    }

    pub fn reset_pagination(&self, default: bool) {
        let next = if default {
            TableState::default().pagination
        } else {
            self.initial_state().pagination
        };
        self.set_pagination(next);
    }

    pub fn set_page_index(&self, page_index: usize) {
        self.update_page_index(move |_| page_index);
    }

    pub fn reset_page_index(&self, default: bool) {
        let page_index = if default {
            DEFAULT_PAGE_INDEX
        } else {
            self.initial_state().pagination.page_index
        };
        self.set_page_index(page_index);
    }

    /// Changes the page size and moves to the page holding the current top row.
    pub fn set_page_size(&self, page_size: usize) {
        let page_size = page_size.max(1);
        self.set_pagination(Updater::with(move |old: &PaginationState| {
            let top_row_index = old.page_size.saturating_mul(old.page_index);
            PaginationState {
                page_index: top_row_index / page_size,
                page_size,
            }
        }));
    }

    pub fn reset_page_size(&self, default: bool) {
        let page_size = if default {
            DEFAULT_PAGE_SIZE
        } else {
            self.initial_state().pagination.page_size
        };
        self.set_page_size(page_size);
    }

    fn update_page_index(&self, f: impl FnOnce(usize) -> usize + 'static) {
        let max_page_index = self
            .options()
            .settings
            .page_count
            .map(|count| count.saturating_sub(1))
            .unwrap_or(usize::MAX);
        self.set_pagination(Updater::with(move |old: &PaginationState| PaginationState {
            page_index: f(old.page_index).min(max_page_index),
            ..*old
        }));
    }

    /// Every page index, `0..page_count`.
    pub fn get_page_options(&self) -> Vec<usize> {
        (0..self.get_page_count()).collect()
    }

    pub fn get_can_previous_page(&self) -> bool {
        self.get_state().pagination.page_index > 0
    }

    pub fn get_can_next_page(&self) -> bool {
        let page_count = self.get_page_count();
        page_count > 0 && self.get_state().pagination.page_index < page_count - 1
    }

    pub fn previous_page(&self) {
        self.update_page_index(|index| index.saturating_sub(1));
    }

    pub fn next_page(&self) {
        self.update_page_index(|index| index.saturating_add(1));
    }

    pub fn first_page(&self) {
        self.set_page_index(0);
    }

    pub fn last_page(&self) {
        let last = self.get_page_count().saturating_sub(1);
        self.set_page_index(last);
    }

    /// The configured page count, or the row count divided into pages.
    pub fn get_page_count(&self) -> usize {
        if let Some(count) = self.options().settings.page_count {
            return count;
        }
        let page_size = self.get_state().pagination.page_size.max(1);
        self.get_row_count().div_ceil(page_size)
    }

    /// The configured row count, or the number of rows before pagination.
    pub fn get_row_count(&self) -> usize {
        if let Some(count) = self.options().settings.row_count {
            return count;
        }
        match self.get_pre_pagination_row_model() {
            Ok(model) => model.rows.len(),
            Err(err) => {
                log::warn!(target: "table_engine::pagination", "counting core rows: {}", err);
                self.get_core_row_model().rows.len()
            }
        }
    }
}
