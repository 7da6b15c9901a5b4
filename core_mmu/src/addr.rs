//! Splitting virtual addresses into `tag | row index | offset` and gluing
//! physical page numbers back onto offsets.

use std::fmt;

use thiserror::Error;

use crate::{
    bin::{extract, mask_lower, shift_out},
    config::Config,
};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("address {address:#010x} lies on virtual page {vpn:#x}, outside the page table (size {limit:#x})")]
pub struct AddressOutOfRange {
    pub address: u32,
    pub vpn: u32,
    pub limit: u32,
}

/// Fields of a virtual address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decomposed {
    pub tag: u32,
    pub row_index: u32,
    pub vpn: u32,
    pub offset: u32,
}

impl fmt::Display for Decomposed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vpn {:#x} (tag {:#x}, row {:#x}) + {:#x}",
            self.vpn, self.tag, self.row_index, self.offset
        )
    }
}

/// Splits `address` without checking it against any page table.
pub const fn split(address: u32, offset_bits: u32, row_index_bits: u32) -> Decomposed {
    let vpn = shift_out(address, offset_bits);
    Decomposed {
        tag: shift_out(vpn, row_index_bits),
        row_index: extract(address, offset_bits, row_index_bits),
        vpn,
        offset: mask_lower(address, offset_bits),
    }
}

#[derive(Clone, Copy, Debug)]
pub struct AddressCodec {
    offset_bits: u32,
    row_index_bits: u32,
    limit: u32,
}

impl AddressCodec {
    pub fn new(config: &Config) -> Self {
        Self {
            offset_bits: config.offset_bits(),
            row_index_bits: config.row_index_bits(),
            limit: config.page_size.table_size() as u32,
        }
    }
    pub fn decompose(&self, address: u32) -> Result<Decomposed, AddressOutOfRange> {
        let d = split(address, self.offset_bits, self.row_index_bits);
        if d.vpn >= self.limit {
            return Err(AddressOutOfRange {
                address,
                vpn: d.vpn,
                limit: self.limit,
            });
        }
        Ok(d)
    }
    /// row index and tag a page would be cached under.
    pub fn locate(&self, vpn: u32) -> (u32, u32) {
        (
            mask_lower(vpn, self.row_index_bits),
            shift_out(vpn, self.row_index_bits),
        )
    }
    pub fn compose(&self, ppn: u32, offset: u32) -> u32 {
        (ppn << self.offset_bits) | mask_lower(offset, self.offset_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(page_size: u32, rows: u32) -> AddressCodec {
        AddressCodec::new(&Config::new(page_size, rows).unwrap())
    }

    #[test]
    fn test_decompose() {
        let c = codec(4096, 16);
        let d = c.decompose(4100).unwrap();
        assert_eq!(
            Decomposed {
                tag: 0,
                row_index: 1,
                vpn: 1,
                offset: 4
            },
            d
        );

        let d = c.decompose(0x1234_5678).unwrap();
        assert_eq!(0x12345, d.vpn);
        assert_eq!(0x5, d.row_index);
        assert_eq!(0x1234, d.tag);
        assert_eq!(0x678, d.offset);
    }
    #[test]
    fn test_fields_cover_every_bit() {
        for (page_size, rows) in [(4096, 4), (4096, 16), (8192, 8), (8192, 16)] {
            let config = Config::new(page_size, rows).unwrap();
            let address = 0x7fff_d00d;
            let d = split(address, config.offset_bits(), config.row_index_bits());
            let rebuilt = (d.tag << (config.offset_bits() + config.row_index_bits()))
                | (d.row_index << config.offset_bits())
                | d.offset;
            assert_eq!(address, rebuilt, "page size {page_size}, {rows} rows");
            assert_eq!(d.vpn, (d.tag << config.row_index_bits()) | d.row_index);
        }
    }
    #[test]
    fn test_out_of_range() {
        let c = codec(4096, 4);
        assert!(c.decompose(0xffff_efff).is_ok());
        assert_eq!(
            Err(AddressOutOfRange {
                address: 0xffff_f000,
                vpn: 0xfffff,
                limit: 1_048_575
            }),
            c.decompose(0xffff_f000)
        );
        let c = codec(8192, 4);
        assert!(c.decompose(0xffff_e000).is_err());
        assert!(c.decompose(0xffff_dfff).is_ok());
    }
    #[test]
    fn test_compose() {
        let c = codec(4096, 16);
        assert_eq!(20484, c.compose(5, 4));
        let c = codec(8192, 16);
        assert_eq!(3 * 8192 + 0x1fff, c.compose(3, 0x1fff));
    }
    #[test]
    fn test_locate_matches_decompose() {
        let c = codec(8192, 8);
        let d = c.decompose(0x0abc_def0).unwrap();
        assert_eq!((d.row_index, d.tag), c.locate(d.vpn));
    }
}
