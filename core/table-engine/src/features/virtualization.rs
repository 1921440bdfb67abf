//! FILENAME: core/table-engine/src/features/virtualization.rs
//! PURPOSE: Offset arithmetic for rendering a window of a long row list.
//! CONTEXT: The engine never scrolls. A viewport reports its scroll offset
//! and size; `VirtualList` answers which items intersect it (plus overscan),
//! where each item starts, and which offset brings an item into view.
//! Item sizes start at an estimate and are replaced as they get measured.

use std::ops::Range;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Where a scrolled-to item should land in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlign {
    Start,
    Center,
    End,
    /// Scroll the least distance that makes the item fully visible; stay put
    /// when it already is.
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VirtualItem {
    pub index: usize,
    pub start: f64,
    pub size: f64,
    pub end: f64,
}

#[derive(Debug, Clone)]
pub struct VirtualList {
    count: usize,
    estimate_size: f64,
    overscan: usize,
    padding_start: f64,
    padding_end: f64,
    measured: FxHashMap<usize, f64>,
    /// `starts[i]` is the offset of item `i`; one extra entry holds the end
    /// of the last item.
    starts: Vec<f64>,
}

impl VirtualList {
    pub const DEFAULT_OVERSCAN: usize = 1;

    pub fn new(count: usize, estimate_size: f64) -> Self {
        let mut list = VirtualList {
            count,
            estimate_size: estimate_size.max(0.0),
            overscan: Self::DEFAULT_OVERSCAN,
            padding_start: 0.0,
            padding_end: 0.0,
            measured: FxHashMap::default(),
            starts: Vec::new(),
        };
        list.rebuild();
        list
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    /// Space before the first item and after the last one.
    pub fn with_padding(mut self, start: f64, end: f64) -> Self {
        self.padding_start = start.max(0.0);
        self.padding_end = end.max(0.0);
        self.rebuild();
        self
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Changes the item count. Measurements of surviving indexes are kept.
    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        self.measured.retain(|index, _| *index < count);
        self.rebuild();
    }

    /// Records the rendered size of an item. Out-of-range indexes are ignored.
    pub fn measure(&mut self, index: usize, size: f64) {
        if index >= self.count {
            log::debug!(target: "table_engine::virtual", "measured index {} past count {}", index, self.count);
            return;
        }
        self.measured.insert(index, size.max(0.0));
        self.rebuild();
    }

    fn size_of(&self, index: usize) -> f64 {
        self.measured.get(&index).copied().unwrap_or(self.estimate_size)
    }

    fn rebuild(&mut self) {
        let mut starts = Vec::with_capacity(self.count + 1);
        let mut offset = self.padding_start;
        for index in 0..self.count {
            starts.push(offset);
            offset += self.size_of(index);
        }
        starts.push(offset);
        self.starts = starts;
    }

    pub fn item(&self, index: usize) -> Option<VirtualItem> {
        if index >= self.count {
            return None;
        }
        let start = self.starts[index];
        let end = self.starts[index + 1];
        Some(VirtualItem {
            index,
            start,
            size: end - start,
            end,
        })
    }

    /// Full scrollable length, padding included.
    pub fn total_size(&self) -> f64 {
        self.starts.last().copied().unwrap_or(0.0) + self.padding_end
    }

    /// Index of the item covering `offset` (clamped to the list).
    fn index_at(&self, offset: f64) -> usize {
        // first start strictly after `offset`, minus one
        let after = self.starts[..self.count].partition_point(|start| *start <= offset);
        after.saturating_sub(1).min(self.count.saturating_sub(1))
    }

    /// Indexes intersecting `[scroll_offset, scroll_offset + viewport_size)`,
    /// widened by the overscan on both sides.
    pub fn visible_range(&self, scroll_offset: f64, viewport_size: f64) -> Range<usize> {
        if self.count == 0 || viewport_size <= 0.0 {
            return 0..0;
        }
        let first = self.index_at(scroll_offset);
        let viewport_end = scroll_offset + viewport_size;
        let mut last = first;
        while last + 1 < self.count && self.starts[last + 1] < viewport_end {
            last += 1;
        }
        let start = first.saturating_sub(self.overscan);
        let end = (last + self.overscan + 1).min(self.count);
        start..end
    }

    pub fn virtual_items(&self, scroll_offset: f64, viewport_size: f64) -> Vec<VirtualItem> {
        self.visible_range(scroll_offset, viewport_size)
            .filter_map(|index| self.item(index))
            .collect()
    }

    /// The scroll offset that shows `index` aligned per `align`, clamped to
    /// the scrollable range. `None` for an empty list.
    pub fn scroll_offset_for(
        &self,
        index: usize,
        align: ScrollAlign,
        scroll_offset: f64,
        viewport_size: f64,
    ) -> Option<f64> {
        let item = self.item(index.min(self.count.checked_sub(1)?))?;
        let align = match align {
            ScrollAlign::Auto => {
                if item.end > scroll_offset + viewport_size {
                    ScrollAlign::End
                } else if item.start < scroll_offset {
                    ScrollAlign::Start
                } else {
                    return Some(scroll_offset);
                }
            }
            other => other,
        };
        let target = match align {
            ScrollAlign::Start => item.start,
            ScrollAlign::End => item.end - viewport_size,
            ScrollAlign::Center => item.start + item.size / 2.0 - viewport_size / 2.0,
            ScrollAlign::Auto => scroll_offset,
        };
        let max_offset = (self.total_size() - viewport_size).max(0.0);
        Some(target.clamp(0.0, max_offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_follow_measurements() {
        let mut list = VirtualList::new(5, 10.0);
        assert_eq!(list.total_size(), 50.0);
        list.measure(1, 30.0);
        assert_eq!(list.item(2).unwrap().start, 40.0);
        assert_eq!(list.total_size(), 70.0);
        assert_eq!(list.item(1).unwrap().size, 30.0);
        assert!(list.item(5).is_none());

        list.measure(9, 100.0);
        assert_eq!(list.total_size(), 70.0);
    }

    #[test]
    fn test_visible_range_with_overscan() {
        let list = VirtualList::new(100, 10.0).with_overscan(2);
        assert_eq!(list.visible_range(0.0, 35.0), 0..6);
        assert_eq!(list.visible_range(105.0, 20.0), 8..15);
        assert_eq!(list.visible_range(995.0, 50.0), 97..100);

        let items = list.virtual_items(500.0, 10.0);
        assert_eq!(items.first().map(|i| i.index), Some(48));
        assert_eq!(items.last().map(|i| i.index), Some(52));
    }

    #[test]
    fn test_empty_list() {
        let list = VirtualList::new(0, 10.0);
        assert_eq!(list.visible_range(0.0, 100.0), 0..0);
        assert_eq!(list.scroll_offset_for(3, ScrollAlign::Start, 0.0, 100.0), None);
        assert_eq!(list.total_size(), 0.0);
    }

    #[test]
    fn test_scroll_alignment() {
        let list = VirtualList::new(100, 10.0);
        assert_eq!(list.scroll_offset_for(50, ScrollAlign::Start, 0.0, 100.0), Some(500.0));
        assert_eq!(list.scroll_offset_for(50, ScrollAlign::End, 0.0, 100.0), Some(410.0));
        assert_eq!(list.scroll_offset_for(50, ScrollAlign::Center, 0.0, 100.0), Some(455.0));
        assert_eq!(list.scroll_offset_for(99, ScrollAlign::Start, 0.0, 100.0), Some(900.0));
        assert_eq!(list.scroll_offset_for(500, ScrollAlign::Start, 0.0, 100.0), Some(900.0));
    }

    #[test]
    fn test_auto_scrolls_least_distance() {
        let list = VirtualList::new(100, 10.0).with_padding(5.0, 5.0);
        assert_eq!(list.scroll_offset_for(3, ScrollAlign::Auto, 0.0, 100.0), Some(0.0));
        assert_eq!(list.scroll_offset_for(20, ScrollAlign::Auto, 0.0, 100.0), Some(115.0));
        assert_eq!(list.scroll_offset_for(2, ScrollAlign::Auto, 200.0, 100.0), Some(25.0));
    }
}
