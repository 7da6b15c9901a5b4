use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

/// Number of entries of the page table, per page size.
///
/// These are one short of the full virtual page number space, so the topmost
/// page of the 32-bit address space is never translatable.
const PAGE_TABLE_SIZE_4K: usize = 1_048_575;
const PAGE_TABLE_SIZE_8K: usize = 524_287;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("wrong page size {0}: the page size should be 4096 or 8192")]
    InvalidPageSize(u32),
    #[error("wrong number of TLB rows {0}: the TLB should have 4, 8 or 16 rows")]
    InvalidTlbRows(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum PageSize {
    Size4K = 4096,
    Size8K = 8192,
}

impl PageSize {
    pub fn new(bytes: u32) -> Result<Self, ConfigError> {
        Self::try_from_primitive(bytes).map_err(|e| ConfigError::InvalidPageSize(e.number))
    }
    pub fn bytes(self) -> u32 {
        self.into()
    }
    pub fn offset_bits(self) -> u32 {
        self.bytes().trailing_zeros()
    }
    pub fn table_size(self) -> usize {
        match self {
            PageSize::Size4K => PAGE_TABLE_SIZE_4K,
            PageSize::Size8K => PAGE_TABLE_SIZE_8K,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum TlbRows {
    Rows4 = 4,
    Rows8 = 8,
    Rows16 = 16,
}

impl TlbRows {
    pub fn new(rows: u32) -> Result<Self, ConfigError> {
        Self::try_from_primitive(rows).map_err(|e| ConfigError::InvalidTlbRows(e.number))
    }
    pub fn count(self) -> usize {
        u32::from(self) as usize
    }
    pub fn index_bits(self) -> u32 {
        u32::from(self).trailing_zeros()
    }
}

/// Geometry of a translator. Immutable once built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub page_size: PageSize,
    pub tlb_rows: TlbRows,
}

impl Config {
    pub fn new(page_size: u32, tlb_rows: u32) -> Result<Self, ConfigError> {
        Ok(Self {
            page_size: PageSize::new(page_size)?,
            tlb_rows: TlbRows::new(tlb_rows)?,
        })
    }
    pub fn offset_bits(&self) -> u32 {
        self.page_size.offset_bits()
    }
    pub fn row_index_bits(&self) -> u32 {
        self.tlb_rows.index_bits()
    }
    pub fn tag_bits(&self) -> u32 {
        u32::BITS - self.offset_bits() - self.row_index_bits()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Each page contains {} bytes.", self.page_size.bytes())?;
        writeln!(
            f,
            "Page table holds {} entries.",
            self.page_size.table_size()
        )?;
        writeln!(f, "TLB contains {} rows.", self.tlb_rows.count())?;
        writeln!(f, "Each row contains {} entries.", crate::tlb::ROW_CAPACITY)?;
        write!(
            f,
            "Bits used for offset / row index / tag: {} / {} / {}.",
            self.offset_bits(),
            self.row_index_bits(),
            self.tag_bits()
        )
    }
}
