use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{page_table::PageTableError, translator::TranslationFault, Translator};

/// Handle to one [`Translator`] usable from several threads.
///
/// Every operation runs under a single lock, so moving a slot to the head of
/// its row, evicting and counting a hit are never observed half done.
#[derive(Clone)]
pub struct SharedTranslator {
    inner: Arc<Mutex<Translator>>,
}

impl SharedTranslator {
    pub fn new(translator: Translator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(translator)),
        }
    }
    // operations never leave the translator half updated, so a poisoned lock
    // still guards a usable value
    fn lock(&self) -> MutexGuard<'_, Translator> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
    pub fn translate(&self, virtual_address: u32) -> Result<u32, TranslationFault> {
        self.lock().translate(virtual_address)
    }
    pub fn set_page_table_entry(
        &self,
        vpn: u32,
        ppn: u32,
        present: bool,
    ) -> Result<(), PageTableError> {
        self.lock().set_page_table_entry(vpn, ppn, present)
    }
    pub fn number_of_hits(&self) -> u64 {
        self.lock().number_of_hits()
    }
    /// Runs `f` with exclusive access, for sequences that must not interleave.
    pub fn with<R>(&self, f: impl FnOnce(&mut Translator) -> R) -> R {
        f(&mut self.lock())
    }
}

impl From<Translator> for SharedTranslator {
    fn from(translator: Translator) -> Self {
        Self::new(translator)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_concurrent_lookups_count_every_hit() {
        const THREADS: u64 = 8;
        const ROUNDS: u64 = 500;
        let shared = SharedTranslator::new(Translator::new(4096, 16).unwrap());
        shared.set_page_table_entry(1, 5, true).unwrap();
        thread::scope(|s| {
            for _ in 0..THREADS {
                let shared = shared.clone();
                s.spawn(move || {
                    for _ in 0..ROUNDS {
                        assert_eq!(Ok(20484), shared.translate(4100));
                    }
                });
            }
        });
        // only the very first lookup misses
        assert_eq!(THREADS * ROUNDS - 1, shared.number_of_hits());
    }
    #[test]
    fn test_with_runs_exclusively() {
        let shared: SharedTranslator = Translator::new(8192, 4).unwrap().into();
        let hits = shared.with(|t| {
            t.set_page_table_entry(2, 3, true).unwrap();
            t.translate(2 * 8192).unwrap();
            t.translate(2 * 8192).unwrap();
            t.number_of_hits()
        });
        assert_eq!(1, hits);
        assert_eq!(1, shared.number_of_hits());
    }
}
