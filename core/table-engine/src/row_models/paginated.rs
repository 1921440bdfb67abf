//! FILENAME: core/table-engine/src/row_models/paginated.rs
//! PURPOSE: Cuts `[page_index * page_size, page_index * page_size + page_size)`
//! out of the upstream rows.
//! CONTEXT: An out-of-range page is empty, never clamped. With
//! `paginate_expanded_rows` off, the page is cut from the unexpanded rows
//! and expanded afterwards, so children never push their parent off a page.

use std::rc::Rc;

use crate::error::TableResult;
use crate::features::Feature;
use crate::row::RowModel;
use crate::state::{ExpandedState, PaginationState};
use crate::table::Table;
use crate::utils::PtrEq;
use crate::value::Record;

use super::expanded::expand_rows;
use super::ModelRef;

/// Pagination, and the expanded state when pages are expanded after slicing.
pub(crate) type PageDeps = (PaginationState, Option<ExpandedState>);

pub(crate) fn run<T: Record>(table: &Table<T>, input: ModelRef<T>) -> TableResult<ModelRef<T>> {
    let options = table.options();
    if options.settings.manual_pagination || !table.has_feature(Feature::RowPagination) {
        return Ok(input);
    }
    let state = table.get_state();
    let expand_after = (!options.settings.paginate_expanded_rows && table.has_feature(Feature::RowExpanding))
        .then_some(state.expanded);
    let deps: PageDeps = (state.pagination, expand_after);
    let model = table.memos.pipeline.paginated.get_logged(
        (PtrEq(input), deps),
        options.settings.debug_rows_enabled(),
        |(input, (pagination, expand_after))| {
            let input = &input.0;
            if input.rows.is_empty() {
                return Rc::clone(input);
            }
            Rc::new(paginate(input, pagination, expand_after.as_ref()))
        },
    );
    Ok(model)
}

fn paginate<T>(model: &RowModel<T>, pagination: &PaginationState, expand_after: Option<&ExpandedState>) -> RowModel<T> {
    let start = pagination.page_index.saturating_mul(pagination.page_size);
    let end = start.saturating_add(pagination.page_size).min(model.rows.len());
    let page = if start < end {
        model.rows[start..end].to_vec()
    } else {
        Vec::new()
    };

    let rows = match expand_after {
        Some(expanded) if !expanded.is_empty() => {
            let sliced = RowModel {
                rows: page,
                flat_rows: Vec::new(),
                rows_by_id: Default::default(),
            };
            expand_rows(&sliced, expanded).rows
        }
        _ => page,
    };
    RowModel::from_listed_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;

    fn model(n: usize) -> RowModel<u8> {
        let rows = (0..n)
            .map(|i| Rc::new(Row::new(i.to_string(), Rc::new(0), i, 0, Vec::new(), None)))
            .collect();
        RowModel::from_rows(rows)
    }

    #[test]
    fn test_middle_page() {
        let page = paginate(&model(25), &PaginationState { page_index: 1, page_size: 10 }, None);
        assert_eq!(page.len(), 10);
        assert_eq!(page.rows[0].id, "10");
    }

    #[test]
    fn test_last_page_is_short() {
        let page = paginate(&model(25), &PaginationState { page_index: 2, page_size: 10 }, None);
        assert_eq!(page.row_ids(), vec!["20", "21", "22", "23", "24"]);
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let page = paginate(&model(25), &PaginationState { page_index: 7, page_size: 10 }, None);
        assert!(page.is_empty());
        assert!(page.flat_rows.is_empty());
    }
}
