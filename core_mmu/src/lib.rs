pub mod addr;
mod bin;
pub mod config;
pub mod page_table;
pub mod script;
pub mod shared;
pub mod tlb;
pub mod translator;

#[cfg(feature = "stat")]
pub mod stat;

pub use config::{Config, ConfigError, PageSize, TlbRows};
pub use page_table::PageTableError;
pub use shared::SharedTranslator;
pub use translator::{FaultCause, TranslationFault, Translator};
