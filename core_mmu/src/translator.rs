use thiserror::Error;

use crate::{
    addr::{AddressCodec, AddressOutOfRange, Decomposed},
    config::{Config, ConfigError},
    page_table::{PageTable, PageTableError},
    tlb::Tlb,
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCause {
    #[error("virtual page {vpn:#x} is outside the page table (size {limit:#x})")]
    OutOfRange { vpn: u32, limit: u32 },
    #[error("virtual page {vpn:#x} is not present")]
    NotPresent { vpn: u32 },
}

/// Raised by [`Translator::translate`] whenever an address cannot be resolved.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("there is no page present at address {address:#010x}: {cause}")]
pub struct TranslationFault {
    pub address: u32,
    pub cause: FaultCause,
}

impl From<AddressOutOfRange> for TranslationFault {
    fn from(e: AddressOutOfRange) -> Self {
        Self {
            address: e.address,
            cause: FaultCause::OutOfRange {
                vpn: e.vpn,
                limit: e.limit,
            },
        }
    }
}

pub struct Translator {
    config: Config,
    codec: AddressCodec,
    page_table: PageTable,
    tlb: Tlb,
    hits: u64,
    #[cfg(feature = "stat")]
    stat: stat::TranslationStat,
}

impl Translator {
    pub fn new(page_size: u32, num_tlb_rows: u32) -> Result<Self, ConfigError> {
        Ok(Self::with_config(Config::new(page_size, num_tlb_rows)?))
    }
    pub fn with_config(config: Config) -> Self {
        log::debug!(
            "translator: {} byte pages, {} TLB rows",
            config.page_size.bytes(),
            config.tlb_rows.count()
        );
        Self {
            codec: AddressCodec::new(&config),
            page_table: PageTable::new(config.page_size),
            tlb: Tlb::new(config.tlb_rows),
            hits: 0,
            config,
            #[cfg(feature = "stat")]
            stat: Default::default(),
        }
    }
    pub fn config(&self) -> &Config {
        &self.config
    }
    pub fn tlb(&self) -> &Tlb {
        &self.tlb
    }
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }
    /// number of TLB hits so far.
    pub fn number_of_hits(&self) -> u64 {
        self.hits
    }

    /// Maps `vpn` to `ppn`. Any translation of `vpn` already cached in the TLB
    /// is dropped, so the new entry is seen by the next [`Self::translate`].
    pub fn set_page_table_entry(
        &mut self,
        vpn: u32,
        ppn: u32,
        present: bool,
    ) -> Result<(), PageTableError> {
        self.page_table.set_entry(vpn, ppn, present)?;
        log::debug!("page table: vpn {vpn:#x} -> ppn {ppn:#x} (present: {present})");
        self.invalidate_page(vpn);
        Ok(())
    }

    /// Drops the cached translation of `vpn`, returning whether there was one.
    pub fn invalidate_page(&mut self, vpn: u32) -> bool {
        let (row_index, tag) = self.codec.locate(vpn);
        match self.tlb.invalidate(row_index, tag) {
            Some(slot) => {
                log::debug!("tlb invalidate: vpn {vpn:#x} (ppn {:#x})", slot.ppn);
                true
            }
            None => false,
        }
    }

    pub fn flush_tlb(&mut self) {
        log::debug!("tlb flush: {} translations dropped", self.tlb.occupancy());
        self.tlb.flush();
    }

    pub fn translate(&mut self, virtual_address: u32) -> Result<u32, TranslationFault> {
        let result = self.translate_inner(virtual_address);
        #[cfg(feature = "stat")]
        {
            if result.is_err() {
                self.stat.faults += 1;
            }
        }
        result
    }

    fn translate_inner(&mut self, virtual_address: u32) -> Result<u32, TranslationFault> {
        let d = self.codec.decompose(virtual_address)?;
        if let Some(ppn) = self.tlb.lookup(d.row_index, d.tag) {
            self.hits += 1;
            #[cfg(feature = "stat")]
            {
                self.stat.hits += 1;
            }
            log::debug!("tlb hit: {d} -> ppn {ppn:#x}");
            return Ok(self.codec.compose(ppn, d.offset));
        }
        #[cfg(feature = "stat")]
        {
            self.stat.misses += 1;
        }
        log::debug!("tlb miss: {d}");

        self.prefetch(virtual_address);

        let ppn = self.walk(virtual_address, &d)?;
        self.fill(&d, ppn);
        Ok(self.codec.compose(ppn, d.offset))
    }

    /// Warms the TLB with the page following `virtual_address`. The outcome,
    /// whether a fill or a fault, is discarded.
    fn prefetch(&mut self, virtual_address: u32) {
        let Some(next) = virtual_address.checked_add(self.config.page_size.bytes()) else {
            return;
        };
        match self.prefetch_page(next) {
            Ok(true) => {
                #[cfg(feature = "stat")]
                {
                    self.stat.prefetch_fills += 1;
                }
            }
            Ok(false) => (),
            Err(fault) => {
                #[cfg(feature = "stat")]
                {
                    self.stat.prefetch_discards += 1;
                }
                log::trace!("prefetch discarded: {fault}");
            }
        }
    }

    /// Single level: never prefetches further, never counts a hit and leaves
    /// the recency of an already cached page alone.
    fn prefetch_page(&mut self, virtual_address: u32) -> Result<bool, TranslationFault> {
        let d = self.codec.decompose(virtual_address)?;
        if self.tlb.contains(d.row_index, d.tag) {
            return Ok(false);
        }
        let ppn = self.walk(virtual_address, &d)?;
        log::trace!("prefetch: {d} -> ppn {ppn:#x}");
        self.fill(&d, ppn);
        Ok(true)
    }

    fn walk(&self, address: u32, d: &Decomposed) -> Result<u32, TranslationFault> {
        let entry = self
            .page_table
            .lookup(d.vpn)
            .map_err(|_| TranslationFault {
                address,
                cause: FaultCause::OutOfRange {
                    vpn: d.vpn,
                    limit: self.page_table.size() as u32,
                },
            })?;
        if !entry.present {
            return Err(TranslationFault {
                address,
                cause: FaultCause::NotPresent { vpn: d.vpn },
            });
        }
        Ok(entry.ppn)
    }

    fn fill(&mut self, d: &Decomposed, ppn: u32) {
        if let Some(evicted) = self.tlb.insert(d.row_index, d.tag, ppn) {
            #[cfg(feature = "stat")]
            {
                self.stat.evictions += 1;
            }
            log::debug!(
                "tlb evict: row {:#x}, tag {:#x} (ppn {:#x})",
                d.row_index,
                evicted.tag,
                evicted.ppn
            );
        }
    }
}

impl Translator {
    #[cfg(feature = "stat")]
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
}

#[cfg(feature = "stat")]
impl AddStats for Translator {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat.with_occupancy(self.tlb.occupancy())));
        self.page_table.add_stats(buf);
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use crate::stat::*;

    #[derive(Clone, Copy, Default)]
    pub struct TranslationStat {
        pub hits: u64,
        pub misses: u64,
        pub faults: u64,
        pub evictions: u64,
        pub prefetch_fills: u64,
        pub prefetch_discards: u64,
        occupancy: usize,
    }

    impl TranslationStat {
        pub fn with_occupancy(self, occupancy: usize) -> Self {
            Self { occupancy, ..self }
        }
        fn hit_ratio(&self) -> f64 {
            let lookups = self.hits + self.misses;
            if lookups == 0 {
                0.0
            } else {
                self.hits as f64 * 100.0 / lookups as f64
            }
        }
    }

    impl Stat for TranslationStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(self)
        }
    }

    impl StatView for &'_ TranslationStat {
        fn header(&self) -> &'static str {
            "translation"
        }
        fn width(&self) -> usize {
            36
        }
    }

    impl fmt::Display for &'_ TranslationStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            macro_rules! output {
                ($name:expr => $val:expr) => {
                    writeln!(f, "  {:>18}: {:>12}", $name, format!("#{}", $val))
                };
            }
            output!("tlb hits" => self.hits)?;
            output!("tlb misses" => self.misses)?;
            writeln!(f, "  {:>18}: {:>11.2}%", "hit ratio", self.hit_ratio())?;
            output!("faults" => self.faults)?;
            output!("evictions" => self.evictions)?;
            output!("prefetch fills" => self.prefetch_fills)?;
            output!("prefetch discards" => self.prefetch_discards)?;
            write!(f, "  {:>18}: {:>12}", "cached now", self.occupancy)
        }
    }
}
