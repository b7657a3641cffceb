//! One prefix-sorted table of the forest.

use std::cmp::Ordering;

/// All item ids, ordered by one window of their signatures.
///
/// Table `i` of a forest with window width `w` looks at signature positions
/// `[i * w, (i + 1) * w)`. Sorting by that window lexicographically puts items
/// sharing a prefix of any length next to each other, which is all a prefix
/// tree would give us, without the pointers.
#[derive(Debug, Clone)]
pub struct ForestTable {
    offset: usize,
    width: usize,
    order: Vec<u32>,
}

impl ForestTable {
    /// Sort items `0..num_items` of a flat signature buffer by this table's window.
    pub(crate) fn build(
        signatures: &[u32],
        stride: usize,
        offset: usize,
        width: usize,
        num_items: usize,
    ) -> Self {
        let window = move |id: u32| {
            let start = id as usize * stride + offset;
            &signatures[start..start + width]
        };

        let mut order: Vec<u32> = (0..num_items as u32).collect();
        order.sort_unstable_by(|&a, &b| match window(a).cmp(window(b)) {
            Ordering::Equal => a.cmp(&b),
            other => other,
        });

        Self { offset, width, order }
    }

    /// Items whose window starts with the first `depth` values of `query`'s window.
    ///
    /// `query` is a full signature; `depth` is clamped to the window width.
    pub(crate) fn prefix_range<'a>(
        &'a self,
        signatures: &[u32],
        stride: usize,
        query: &[u32],
        depth: usize,
    ) -> &'a [u32] {
        let depth = depth.min(self.width);
        let prefix = move |id: u32| {
            let start = id as usize * stride + self.offset;
            &signatures[start..start + depth]
        };
        let q = &query[self.offset..self.offset + depth];

        let lo = self.order.partition_point(|&id| prefix(id) < q);
        let hi = lo + self.order[lo..].partition_point(|&id| prefix(id) <= q);
        &self.order[lo..hi]
    }

    /// First signature position covered by this table.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of signature positions in this table's window.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Item ids in table order.
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Four items, signature length 4, window = positions 2..4.
    const SIGS: [u32; 16] = [
        9, 9, 5, 1, //
        9, 9, 3, 7, //
        9, 9, 5, 0, //
        9, 9, 3, 7, //
    ];

    #[test]
    fn sorts_by_window_then_id() {
        let t = ForestTable::build(&SIGS, 4, 2, 2, 4);
        assert_eq!(t.order(), &[1, 3, 2, 0]);
    }

    #[test]
    fn prefix_ranges_widen_as_depth_shrinks() {
        let t = ForestTable::build(&SIGS, 4, 2, 2, 4);
        let query = [0, 0, 5, 1];

        assert_eq!(t.prefix_range(&SIGS, 4, &query, 2), &[0]);
        assert_eq!(t.prefix_range(&SIGS, 4, &query, 1), &[2, 0]);
        assert_eq!(t.prefix_range(&SIGS, 4, &query, 0).len(), 4);
    }

    #[test]
    fn missing_prefix_is_empty() {
        let t = ForestTable::build(&SIGS, 4, 2, 2, 4);
        assert!(t.prefix_range(&SIGS, 4, &[0, 0, 4, 4], 1).is_empty());
    }
}
