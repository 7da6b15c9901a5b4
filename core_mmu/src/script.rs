//! Batch of translator operations read from JSON.
//!
//! ```json
//! { "page_size": 4096, "tlb_rows": 16,
//!   "ops": [ { "op": "map", "vpn": 1, "ppn": 5 },
//!            { "op": "translate", "address": 4100 } ] }
//! ```

use std::fmt;

use anyhow::Result;
use serde::Deserialize;

use crate::{
    config::Config, page_table::PageTableError, translator::TranslationFault, Translator,
};

#[derive(Deserialize)]
struct ScriptRaw {
    page_size: u32,
    tlb_rows: u32,
    #[serde(default)]
    ops: Vec<Op>,
}

fn present_by_default() -> bool {
    true
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Map {
        vpn: u32,
        ppn: u32,
        #[serde(default = "present_by_default")]
        present: bool,
    },
    Translate {
        address: u32,
    },
    Invalidate {
        vpn: u32,
    },
    Flush,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub config: Config,
    pub ops: Vec<Op>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Mapped {
        vpn: u32,
        ppn: u32,
        present: bool,
    },
    MapFailed(PageTableError),
    Translated {
        virtual_address: u32,
        physical_address: u32,
        hit: bool,
    },
    Faulted(TranslationFault),
    Invalidated {
        vpn: u32,
        removed: bool,
    },
    Flushed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Mapped { vpn, ppn, present } => {
                write!(f, "map       {vpn:#x} -> {ppn:#x}")?;
                if !present {
                    write!(f, " (absent)")?;
                }
                Ok(())
            }
            Outcome::MapFailed(e) => write!(f, "map       failed: {e}"),
            Outcome::Translated {
                virtual_address,
                physical_address,
                hit,
            } => write!(
                f,
                "translate {virtual_address:#010x} -> {physical_address:#010x} [{}]",
                if *hit { "hit" } else { "miss" }
            ),
            Outcome::Faulted(e) => write!(f, "translate {e}"),
            Outcome::Invalidated { vpn, removed } => write!(
                f,
                "invalidate {vpn:#x}: {}",
                if *removed { "dropped" } else { "not cached" }
            ),
            Outcome::Flushed => write!(f, "flush"),
        }
    }
}

impl Script {
    pub fn deser(file: impl std::io::Read) -> Result<Self> {
        let raw: ScriptRaw = serde_json::from_reader(file)?;
        Self::from_raw(raw)
    }
    pub fn parse(s: &str) -> Result<Self> {
        Self::from_raw(serde_json::from_str(s)?)
    }
    fn from_raw(raw: ScriptRaw) -> Result<Self> {
        Ok(Self {
            config: Config::new(raw.page_size, raw.tlb_rows)?,
            ops: raw.ops,
        })
    }
    pub fn translator(&self) -> Translator {
        Translator::with_config(self.config)
    }
    /// Applies every op in order. Failures are recorded, never fatal.
    pub fn execute(&self, translator: &mut Translator) -> Vec<Outcome> {
        self.ops.iter().map(|op| apply(translator, *op)).collect()
    }
}

pub fn apply(translator: &mut Translator, op: Op) -> Outcome {
    match op {
        Op::Map { vpn, ppn, present } => match translator.set_page_table_entry(vpn, ppn, present)
        {
            Ok(()) => Outcome::Mapped { vpn, ppn, present },
            Err(e) => Outcome::MapFailed(e),
        },
        Op::Translate { address } => {
            let hits = translator.number_of_hits();
            match translator.translate(address) {
                Ok(physical_address) => Outcome::Translated {
                    virtual_address: address,
                    physical_address,
                    hit: translator.number_of_hits() > hits,
                },
                Err(e) => Outcome::Faulted(e),
            }
        }
        Op::Invalidate { vpn } => Outcome::Invalidated {
            vpn,
            removed: translator.invalidate_page(vpn),
        },
        Op::Flush => {
            translator.flush_tlb();
            Outcome::Flushed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ConfigError, PageSize, TlbRows},
        FaultCause,
    };

    const SCRIPT: &str = r#"{
        "page_size": 4096,
        "tlb_rows": 16,
        "ops": [
            { "op": "map", "vpn": 1, "ppn": 5 },
            { "op": "map", "vpn": 2, "ppn": 6, "present": false },
            { "op": "map", "vpn": 1048575, "ppn": 1 },
            { "op": "translate", "address": 4100 },
            { "op": "translate", "address": 4100 },
            { "op": "translate", "address": 8192 },
            { "op": "invalidate", "vpn": 1 },
            { "op": "flush" }
        ]
    }"#;

    #[test]
    fn test_parse() {
        let s = Script::parse(SCRIPT).unwrap();
        assert_eq!(PageSize::Size4K, s.config.page_size);
        assert_eq!(TlbRows::Rows16, s.config.tlb_rows);
        assert_eq!(8, s.ops.len());
        assert_eq!(
            Op::Map {
                vpn: 1,
                ppn: 5,
                present: true
            },
            s.ops[0]
        );
        assert_eq!(Op::Flush, s.ops[7]);
    }
    #[test]
    fn test_rejects_bad_config() {
        let e = Script::parse(r#"{ "page_size": 2048, "tlb_rows": 16 }"#).unwrap_err();
        assert_eq!(
            Some(&ConfigError::InvalidPageSize(2048)),
            e.downcast_ref::<ConfigError>()
        );
        assert!(Script::parse(r#"{ "page_size": 4096 }"#).is_err());
        let unknown_op = r#"{ "page_size": 4096, "tlb_rows": 4, "ops": [{ "op": "jump" }] }"#;
        assert!(Script::parse(unknown_op).is_err());
    }
    #[test]
    fn test_execute() {
        let s = Script::parse(SCRIPT).unwrap();
        let mut t = s.translator();
        let out = s.execute(&mut t);
        assert!(matches!(out[2], Outcome::MapFailed(PageTableError::InvalidVpn { .. })));
        assert_eq!(
            Outcome::Translated {
                virtual_address: 4100,
                physical_address: 20484,
                hit: false
            },
            out[3]
        );
        assert_eq!(
            Outcome::Translated {
                virtual_address: 4100,
                physical_address: 20484,
                hit: true
            },
            out[4]
        );
        assert!(matches!(
            out[5],
            Outcome::Faulted(TranslationFault {
                cause: FaultCause::NotPresent { vpn: 2 },
                ..
            })
        ));
        assert_eq!(
            Outcome::Invalidated {
                vpn: 1,
                removed: true
            },
            out[6]
        );
        assert_eq!(1, t.number_of_hits());
        assert_eq!(0, t.tlb().occupancy());
    }
    #[test]
    fn test_outcome_display() {
        let o = Outcome::Translated {
            virtual_address: 4100,
            physical_address: 20484,
            hit: true,
        };
        assert_eq!("translate 0x00001004 -> 0x00005004 [hit]", o.to_string());
        let o = Outcome::Mapped {
            vpn: 2,
            ppn: 6,
            present: false,
        };
        assert_eq!("map       0x2 -> 0x6 (absent)", o.to_string());
    }
}
