use thiserror::Error;

use crate::config::PageSize;

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTableError {
    #[error("virtual page number {vpn:#x} not in valid range (page table holds {size:#x} entries)")]
    InvalidVpn { vpn: u32, size: usize },
    #[error("physical page number {ppn:#x} not in valid range (at most {max:#x})")]
    InvalidPpn { ppn: u32, max: u32 },
}

pub type Result<T> = std::result::Result<T, PageTableError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageTableEntry {
    pub vpn: u32,
    pub ppn: u32,
    pub present: bool,
}

impl PageTableEntry {
    fn absent(vpn: u32) -> Self {
        Self {
            vpn,
            ppn: 0,
            present: false,
        }
    }
}

pub struct PageTable {
    inner: Vec<PageTableEntry>,
    max_ppn: u32,
    mapped: usize,
}

macro_rules! bounds_check {
    ($vpn:ident < $self:ident) => {
        if $vpn as usize >= $self.inner.len() {
            return Err(PageTableError::InvalidVpn {
                vpn: $vpn,
                size: $self.inner.len(),
            });
        }
    };
}

impl PageTable {
    pub fn new(page_size: PageSize) -> Self {
        let size = page_size.table_size() as u32;
        Self {
            inner: (0..size).map(PageTableEntry::absent).collect(),
            max_ppn: u32::MAX >> page_size.offset_bits(),
            mapped: 0,
        }
    }
    pub fn size(&self) -> usize {
        self.inner.len()
    }
    /// number of entries currently marked present.
    pub fn mapped_count(&self) -> usize {
        self.mapped
    }
    pub fn set_entry(&mut self, vpn: u32, ppn: u32, present: bool) -> Result<()> {
        bounds_check!(vpn < self);
        if ppn > self.max_ppn {
            return Err(PageTableError::InvalidPpn {
                ppn,
                max: self.max_ppn,
            });
        }
        let slot = &mut self.inner[vpn as usize];
        match (slot.present, present) {
            (false, true) => self.mapped += 1,
            (true, false) => self.mapped -= 1,
            _ => (),
        }
        *slot = PageTableEntry { vpn, ppn, present };
        Ok(())
    }
    pub fn lookup(&self, vpn: u32) -> Result<PageTableEntry> {
        bounds_check!(vpn < self);
        Ok(self.inner[vpn as usize])
    }
}

#[cfg(feature = "stat")]
impl AddStats for PageTable {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(stat::PageTableStat {
            size: self.size(),
            mapped: self.mapped,
        }));
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use crate::stat::*;

    pub struct PageTableStat {
        pub size: usize,
        pub mapped: usize,
    }

    impl Stat for PageTableStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(self)
        }
    }

    impl StatView for &'_ PageTableStat {
        fn header(&self) -> &'static str {
            "page table"
        }
        fn width(&self) -> usize {
            30
        }
    }

    impl fmt::Display for &'_ PageTableStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "  entries: {:>19}", self.size)?;
            write!(f, "  present: {:>19}", self.mapped)
        }
    }
}
