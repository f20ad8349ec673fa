use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use super::MxHost;

type Slot = Arc<OnceLock<Arc<[MxHost]>>>;

/// Memoized MX answers keyed by the exact domain string.
///
/// Entries are never evicted. The map lock is only held to find or create a
/// domain's slot; the lookup itself runs inside the slot's `OnceLock`, so two
/// threads asking for the same domain share one lookup while different domains
/// resolve in parallel.
#[derive(Debug, Default)]
pub struct MxCache {
    entries: Mutex<HashMap<String, Slot>>,
}

impl MxCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached hosts for `domain`, running `resolve` on first use.
    pub fn get_or_resolve<F>(&self, domain: &str, resolve: F) -> Arc<[MxHost]>
    where
        F: FnOnce() -> Vec<MxHost>,
    {
        let slot = self.slot(domain);
        let mut miss = false;
        let hosts = slot.get_or_init(|| {
            miss = true;
            Arc::from(resolve())
        });
        if !miss {
            tracing::trace!(domain, "mx cache hit");
        }
        Arc::clone(hosts)
    }

    pub fn get(&self, domain: &str) -> Option<Arc<[MxHost]>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(domain).and_then(|slot| slot.get().cloned())
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|slot| slot.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, domain: &str) -> Slot {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(domain.to_string()).or_default())
    }
}
