//! FILENAME: core/table-engine/src/row_models/expanded.rs
//! PURPOSE: Flattens the row forest into the display list.
//! CONTEXT: An expanded row with sub-rows is followed directly by its
//! children, recursively, depth first. Collapsed rows contribute only
//! themselves. `flat_rows` and `rows_by_id` stay those of the input model.

use std::rc::Rc;

use crate::error::TableResult;
use crate::features::Feature;
use crate::row::{Row, RowModel};
use crate::state::ExpandedState;
use crate::table::Table;
use crate::utils::PtrEq;
use crate::value::Record;

use super::ModelRef;

/// Expanded state, `paginate_expanded_rows`, feature installed.
pub(crate) type ExpandDeps = (ExpandedState, bool, bool);

pub(crate) fn run<T: Record>(table: &Table<T>, input: ModelRef<T>) -> TableResult<ModelRef<T>> {
    let options = table.options();
    if options.settings.manual_expanding {
        return Ok(input);
    }
    let enabled = table.has_feature(Feature::RowExpanding);
    let expanded = if enabled {
        table.get_state().expanded
    } else {
        ExpandedState::default()
    };
    let deps: ExpandDeps = (expanded, options.settings.paginate_expanded_rows, enabled);
    let model = table.memos.pipeline.expanded.get_logged(
        (PtrEq(input), deps),
        options.settings.debug_rows_enabled(),
        |(input, (expanded, paginate_expanded_rows, _))| {
            let input = &input.0;
            if input.rows.is_empty() || expanded.is_empty() || !paginate_expanded_rows {
                return Rc::clone(input);
            }
            Rc::new(expand_rows(input, expanded))
        },
    );
    Ok(model)
}

/// Lists every row reachable through expanded parents, depth first.
pub(crate) fn expand_rows<T>(model: &RowModel<T>, expanded: &ExpandedState) -> RowModel<T> {
    fn visit<T>(row: &Rc<Row<T>>, expanded: &ExpandedState, out: &mut Vec<Rc<Row<T>>>) {
        out.push(Rc::clone(row));
        if !row.sub_rows.is_empty() && expanded.get(&row.id) == Some(true) {
            for child in &row.sub_rows {
                visit(child, expanded, out);
            }
        }
    }

    let mut rows = Vec::with_capacity(model.rows.len());
    for row in &model.rows {
        visit(row, expanded, &mut rows);
    }
    RowModel {
        rows,
        flat_rows: model.flat_rows.clone(),
        rows_by_id: model.rows_by_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn node(id: &str, depth: usize, children: Vec<Rc<Row<u8>>>) -> Rc<Row<u8>> {
        Rc::new(Row::new(id.to_string(), Rc::new(0), 0, depth, children, None))
    }

    fn forest() -> RowModel<u8> {
        let electronics = node("0", 0, vec![node("0.0", 1, vec![]), node("0.1", 1, vec![])]);
        RowModel::from_rows(vec![electronics, node("1", 0, vec![])])
    }

    #[test]
    fn test_expanded_row_is_followed_by_children() {
        let mut map = BTreeMap::new();
        map.insert("0".to_string(), true);
        let model = expand_rows(&forest(), &ExpandedState::Rows(map));
        assert_eq!(model.row_ids(), vec!["0", "0.0", "0.1", "1"]);
        assert_eq!(model.flat_rows.len(), 4);
    }

    #[test]
    fn test_false_entries_stay_collapsed() {
        let mut map = BTreeMap::new();
        map.insert("0".to_string(), false);
        let model = expand_rows(&forest(), &ExpandedState::Rows(map));
        assert_eq!(model.row_ids(), vec!["0", "1"]);
    }

    #[test]
    fn test_expand_all() {
        let model = expand_rows(&forest(), &ExpandedState::All);
        assert_eq!(model.len(), 4);
    }
}
