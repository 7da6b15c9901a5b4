//! Set-associative translation cache.
//!
//! Every row holds at most [`ROW_CAPACITY`] slots. A row keeps its slots in
//! fixed storage and tracks recency with a separate list of storage indices,
//! most recently used first.

use std::fmt;

use crate::config::TlbRows;

pub const ROW_CAPACITY: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TlbSlot {
    pub tag: u32,
    pub ppn: u32,
}

#[derive(Clone, Debug)]
pub struct TlbRow {
    slots: [TlbSlot; ROW_CAPACITY],
    // `order[..len]` are live storage indices, MRU first; `order[len..]` are free.
    order: [u8; ROW_CAPACITY],
    len: usize,
}

impl TlbRow {
    pub fn new() -> Self {
        Self {
            slots: [TlbSlot::default(); ROW_CAPACITY],
            order: [0, 1, 2, 3],
            len: 0,
        }
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    /// slots from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = &TlbSlot> + '_ {
        self.order[..self.len]
            .iter()
            .map(|&s| &self.slots[s as usize])
    }
    fn position(&self, tag: u32) -> Option<usize> {
        self.order[..self.len]
            .iter()
            .position(|&s| self.slots[s as usize].tag == tag)
    }
    fn promote(&mut self, pos: usize) {
        self.order[..=pos].rotate_right(1);
    }
    pub fn contains(&self, tag: u32) -> bool {
        self.position(tag).is_some()
    }
    /// Looks `tag` up. A hit makes the slot the most recently used one.
    pub fn lookup(&mut self, tag: u32) -> Option<u32> {
        let pos = self.position(tag)?;
        self.promote(pos);
        Some(self.slots[self.order[0] as usize].ppn)
    }
    /// Caches `tag -> ppn` as the most recently used slot, returning the slot
    /// evicted to make room for it.
    ///
    /// A tag already cached is only promoted; its page number is kept.
    pub fn insert(&mut self, tag: u32, ppn: u32) -> Option<TlbSlot> {
        if let Some(pos) = self.position(tag) {
            self.promote(pos);
            return None;
        }
        let (pos, evicted) = if self.len == ROW_CAPACITY {
            let pos = ROW_CAPACITY - 1;
            (pos, Some(self.slots[self.order[pos] as usize]))
        } else {
            self.len += 1;
            (self.len - 1, None)
        };
        self.slots[self.order[pos] as usize] = TlbSlot { tag, ppn };
        self.promote(pos);
        evicted
    }
    /// Drops the slot for `tag`, keeping the relative order of the others.
    pub fn remove(&mut self, tag: u32) -> Option<TlbSlot> {
        let pos = self.position(tag)?;
        let removed = self.slots[self.order[pos] as usize];
        self.order[pos..self.len].rotate_left(1);
        self.len -= 1;
        Some(removed)
    }
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Default for TlbRow {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Tlb {
    rows: Vec<TlbRow>,
}

impl Tlb {
    pub fn new(rows: TlbRows) -> Self {
        Self {
            rows: vec![TlbRow::new(); rows.count()],
        }
    }
    pub fn rows(&self) -> &[TlbRow] {
        &self.rows
    }
    /// number of cached translations over all rows.
    pub fn occupancy(&self) -> usize {
        self.rows.iter().map(TlbRow::len).sum()
    }
    pub(crate) fn lookup(&mut self, row_index: u32, tag: u32) -> Option<u32> {
        self.rows[row_index as usize].lookup(tag)
    }
    pub(crate) fn contains(&self, row_index: u32, tag: u32) -> bool {
        self.rows[row_index as usize].contains(tag)
    }
    pub(crate) fn insert(&mut self, row_index: u32, tag: u32, ppn: u32) -> Option<TlbSlot> {
        self.rows[row_index as usize].insert(tag, ppn)
    }
    pub(crate) fn invalidate(&mut self, row_index: u32, tag: u32) -> Option<TlbSlot> {
        self.rows[row_index as usize].remove(tag)
    }
    pub fn flush(&mut self) {
        self.rows.iter_mut().for_each(TlbRow::clear);
    }
}

impl fmt::Display for Tlb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut printed = false;
        for (idx, row) in self.rows.iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            printed = true;
            write!(f, "row {idx:>2x}:")?;
            for slot in row.iter() {
                write!(f, " [tag {:#x} -> ppn {:#x}]", slot.tag, slot.ppn)?;
            }
            writeln!(f)?;
        }
        if !printed {
            writeln!(f, "TLB is empty.")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(row: &TlbRow) -> Vec<u32> {
        row.iter().map(|s| s.tag).collect()
    }

    #[test]
    fn test_insert_orders_by_recency() {
        let mut row = TlbRow::new();
        for tag in 1..=3 {
            assert_eq!(None, row.insert(tag, tag * 10));
        }
        assert_eq!(vec![3, 2, 1], tags(&row));
    }
    #[test]
    fn test_evicts_least_recently_used() {
        let mut row = TlbRow::new();
        for tag in 1..=4 {
            row.insert(tag, tag * 10);
        }
        assert_eq!(Some(TlbSlot { tag: 1, ppn: 10 }), row.insert(5, 50));
        assert_eq!(vec![5, 4, 3, 2], tags(&row));
        assert_eq!(ROW_CAPACITY, row.len());
        assert_eq!(None, row.lookup(1));
    }
    #[test]
    fn test_hit_refreshes_recency() {
        let mut row = TlbRow::new();
        for tag in 1..=4 {
            row.insert(tag, tag * 10);
        }
        assert_eq!(Some(10), row.lookup(1));
        assert_eq!(vec![1, 4, 3, 2], tags(&row));
        // 2 is now the oldest one
        assert_eq!(Some(TlbSlot { tag: 2, ppn: 20 }), row.insert(5, 50));
        assert_eq!(Some(10), row.lookup(1));
    }
    #[test]
    fn test_contains_keeps_recency() {
        let mut row = TlbRow::new();
        row.insert(1, 10);
        row.insert(2, 20);
        assert!(row.contains(1));
        assert!(!row.contains(3));
        assert_eq!(vec![2, 1], tags(&row));
    }
    #[test]
    fn test_reinsert_promotes_without_overwriting() {
        let mut row = TlbRow::new();
        row.insert(7, 70);
        row.insert(8, 80);
        assert_eq!(None, row.insert(7, 99));
        assert_eq!(vec![7, 8], tags(&row));
        assert_eq!(Some(70), row.lookup(7));
        assert_eq!(2, row.len());
    }
    #[test]
    fn test_remove_reuses_storage() {
        let mut row = TlbRow::new();
        for tag in 1..=4 {
            row.insert(tag, tag * 10);
        }
        assert_eq!(Some(TlbSlot { tag: 3, ppn: 30 }), row.remove(3));
        assert_eq!(None, row.remove(3));
        assert_eq!(vec![4, 2, 1], tags(&row));
        assert_eq!(None, row.insert(9, 90));
        assert_eq!(vec![9, 4, 2, 1], tags(&row));
        assert_eq!(Some(TlbSlot { tag: 1, ppn: 10 }), row.insert(6, 60));
        assert_eq!(vec![6, 9, 4, 2], tags(&row));
    }
    #[test]
    fn test_rows_are_independent() {
        let mut tlb = Tlb::new(TlbRows::Rows4);
        assert_eq!(4, tlb.rows().len());
        for tag in 0..5 {
            tlb.insert(0, tag, tag);
        }
        tlb.insert(1, 0, 100);
        assert_eq!(Some(100), tlb.lookup(1, 0));
        assert_eq!(None, tlb.lookup(0, 0));
        assert_eq!(5, tlb.occupancy());
        assert_eq!(Some(TlbSlot { tag: 0, ppn: 100 }), tlb.invalidate(1, 0));
        tlb.flush();
        assert_eq!(0, tlb.occupancy());
        assert!(!tlb.contains(0, 4));
    }
    #[test]
    fn test_dump() {
        let mut tlb = Tlb::new(TlbRows::Rows4);
        assert_eq!("TLB is empty.\n", tlb.to_string());
        tlb.insert(2, 0x1, 0x5);
        tlb.insert(2, 0x3, 0x6);
        assert_eq!(
            "row  2: [tag 0x3 -> ppn 0x6] [tag 0x1 -> ppn 0x5]\n",
            tlb.to_string()
        );
    }
}
