//! FILENAME: core/table-engine/src/header.rs
//! PURPOSE: Projects the ordered leaf columns back through the column tree
//! into rows of headers.
//! CONTEXT: Headers are assembled bottom-up in an index arena (a parent only
//! learns its children as the level below is walked) and then frozen into
//! `Rc<Header>` nodes, children first.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::column::{Column, TableColumn};
use crate::table::Table;
use crate::value::Record;

// ============================================================================
// TYPES
// ============================================================================

/// Which slice of the leaf columns a set of header groups was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRegion {
    /// Left, center and right together.
    All,
    Left,
    Center,
    Right,
}

impl ColumnRegion {
    fn prefix(self) -> Option<&'static str> {
        match self {
            ColumnRegion::All => None,
            ColumnRegion::Left => Some("left"),
            ColumnRegion::Center => Some("center"),
            ColumnRegion::Right => Some("right"),
        }
    }
}

pub struct Header<T> {
    pub id: String,
    /// Position inside its header group.
    pub index: usize,
    pub depth: usize,
    pub column: Rc<Column<T>>,
    /// Stands in for a column that has no header at this level.
    pub is_placeholder: bool,
    pub placeholder_id: Option<String>,
    pub sub_headers: Vec<Rc<Header<T>>>,
    /// Number of visible leaf columns beneath this header.
    pub col_span: usize,
    pub header_group_id: Option<String>,
    pub region: ColumnRegion,
}

/// Leaf headers beneath `header` (the header itself when it has no sub-headers).
pub fn leaf_headers_of<T>(header: &Rc<Header<T>>) -> Vec<Rc<Header<T>>> {
    if header.sub_headers.is_empty() {
        return vec![Rc::clone(header)];
    }
    header.sub_headers.iter().flat_map(leaf_headers_of).collect()
}

impl<T> fmt::Debug for Header<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("id", &self.id)
            .field("column", &self.column.id)
            .field("is_placeholder", &self.is_placeholder)
            .field("col_span", &self.col_span)
            .finish()
    }
}

pub struct HeaderGroup<T> {
    pub id: String,
    pub depth: usize,
    pub headers: Vec<Rc<Header<T>>>,
}

impl<T> fmt::Debug for HeaderGroup<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderGroup")
            .field("id", &self.id)
            .field("headers", &self.headers)
            .finish()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

struct PendingHeader<T> {
    id: String,
    column: Rc<Column<T>>,
    depth: usize,
    index: usize,
    is_placeholder: bool,
    placeholder_id: Option<String>,
    sub: Vec<usize>,
    group: Option<String>,
}

/// Builds header groups, top group first.
///
/// `roots` is the whole column tree (it decides how many levels there are);
/// `leaves` is the ordered, visible leaf sequence the bottom row shows.
pub(crate) fn build_header_groups<T>(
    roots: &[Rc<Column<T>>],
    leaves: &[Rc<Column<T>>],
    by_id: &FxHashMap<String, Rc<Column<T>>>,
    region: ColumnRegion,
    is_visible: &dyn Fn(&Rc<Column<T>>) -> bool,
) -> Vec<HeaderGroup<T>> {
    let max_depth = max_visible_depth(roots, 1, is_visible);
    let prefix = region.prefix();

    let mut arena: Vec<PendingHeader<T>> = leaves
        .iter()
        .enumerate()
        .map(|(index, column)| PendingHeader {
            id: column.id.clone(),
            column: Rc::clone(column),
            depth: max_depth,
            index,
            is_placeholder: false,
            placeholder_id: None,
            sub: Vec::new(),
            group: None,
        })
        .collect();

    let mut groups: Vec<(String, usize, Vec<usize>)> = Vec::new();
    let mut to_group: Vec<usize> = (0..arena.len()).collect();

    for depth in (0..max_depth).rev() {
        let group_id = join_id(&[prefix, Some(depth.to_string().as_str())]);
        let mut pending: Vec<usize> = Vec::new();

        for &child in &to_group {
            let child_column = Rc::clone(&arena[child].column);
            let parent = child_column
                .parent_id
                .as_ref()
                .and_then(|id| by_id.get(id))
                .filter(|_| child_column.depth == depth);
            let (column, is_placeholder) = match parent {
                Some(parent) => (Rc::clone(parent), false),
                None => (child_column, true),
            };

            let latest = pending.last().copied();
            match latest {
                Some(last) if Rc::ptr_eq(&arena[last].column, &column) => arena[last].sub.push(child),
                _ => {
                    let placeholder_id = is_placeholder.then(|| {
                        pending
                            .iter()
                            .filter(|&&p| Rc::ptr_eq(&arena[p].column, &column))
                            .count()
                            .to_string()
                    });
                    let depth_part = (depth != 0).then(|| depth.to_string());
                    let id = join_id(&[
                        prefix,
                        depth_part.as_deref(),
                        Some(column.id.as_str()),
                        Some(arena[child].id.as_str()),
                    ]);
                    arena.push(PendingHeader {
                        id,
                        column,
                        depth,
                        index: pending.len(),
                        is_placeholder,
                        placeholder_id,
                        sub: vec![child],
                        group: None,
                    });
                    pending.push(arena.len() - 1);
                }
            }
            arena[child].group = Some(group_id.clone());
        }

        groups.push((group_id, depth, std::mem::take(&mut to_group)));
        to_group = pending;
    }

    let frozen = freeze(arena, region);
    groups
        .into_iter()
        .rev()
        .map(|(id, depth, members)| HeaderGroup {
            id,
            depth,
            headers: members.into_iter().map(|i| Rc::clone(&frozen[i])).collect(),
        })
        .collect()
}

/// Children always precede their parents in the arena.
fn freeze<T>(arena: Vec<PendingHeader<T>>, region: ColumnRegion) -> Vec<Rc<Header<T>>> {
    let mut frozen: Vec<Rc<Header<T>>> = Vec::with_capacity(arena.len());
    for pending in arena {
        let sub_headers: Vec<Rc<Header<T>>> = pending.sub.iter().map(|&i| Rc::clone(&frozen[i])).collect();
        let col_span = if sub_headers.is_empty() {
            1
        } else {
            sub_headers.iter().map(|h| h.col_span).sum()
        };
        frozen.push(Rc::new(Header {
            id: pending.id,
            index: pending.index,
            depth: pending.depth,
            column: pending.column,
            is_placeholder: pending.is_placeholder,
            placeholder_id: pending.placeholder_id,
            sub_headers,
            col_span,
            header_group_id: pending.group,
            region,
        }));
    }
    frozen
}

fn max_visible_depth<T>(
    columns: &[Rc<Column<T>>],
    depth: usize,
    is_visible: &dyn Fn(&Rc<Column<T>>) -> bool,
) -> usize {
    columns
        .iter()
        .filter(|c| is_visible(c) && !c.columns.is_empty())
        .map(|c| max_visible_depth(&c.columns, depth + 1, is_visible))
        .fold(depth, usize::max)
}

fn join_id(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

// ============================================================================
// HEADER HANDLE
// ============================================================================

/// A header bound to its table.
pub struct TableHeader<'t, T> {
    pub(crate) table: &'t Table<T>,
    pub(crate) header: Rc<Header<T>>,
}

impl<'t, T: Record> TableHeader<'t, T> {
    pub(crate) fn new(table: &'t Table<T>, header: Rc<Header<T>>) -> Self {
        TableHeader { table, header }
    }

    pub fn header(&self) -> &Rc<Header<T>> {
        &self.header
    }

    pub fn get_column(&self) -> TableColumn<'t, T> {
        TableColumn::new(self.table, Rc::clone(&self.header.column))
    }

    pub fn get_sub_headers(&self) -> Vec<TableHeader<'t, T>> {
        self.header
            .sub_headers
            .iter()
            .map(|h| TableHeader::new(self.table, Rc::clone(h)))
            .collect()
    }

    pub fn get_leaf_headers(&self) -> Vec<TableHeader<'t, T>> {
        leaf_headers_of(&self.header)
            .into_iter()
            .map(|h| TableHeader::new(self.table, h))
            .collect()
    }

    /// Header text, or nothing for placeholders.
    pub fn render_header(&self) -> Option<String> {
        if self.header.is_placeholder {
            return None;
        }
        Some(self.get_column().header_text())
    }

    pub fn render_footer(&self) -> Option<String> {
        if self.header.is_placeholder {
            return None;
        }
        self.header.column.def.footer.clone()
    }

    /// The group this header sits in, within its own region.
    pub(crate) fn header_group(&self) -> Option<Rc<HeaderGroup<T>>> {
        let group_id = self.header.header_group_id.as_deref()?;
        self.table
            .header_groups_for(self.header.region)
            .iter()
            .find(|g| g.id == group_id)
            .cloned()
    }
}

impl<'t, T: Record> Clone for TableHeader<'t, T> {
    fn clone(&self) -> Self {
        TableHeader::new(self.table, Rc::clone(&self.header))
    }
}

impl<'t, T: Record> Deref for TableHeader<'t, T> {
    type Target = Header<T>;

    fn deref(&self) -> &Header<T> {
        &self.header
    }
}

impl<'t, T: Record> fmt::Debug for TableHeader<'t, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TableHeader").field(&self.header.id).finish()
    }
}
