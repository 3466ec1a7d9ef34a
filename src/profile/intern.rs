use std::sync::Arc;

use ahash::RandomState;
use indexmap::IndexSet;

/// Interns operation names into small dense ids.
///
/// Ids are assigned in first-seen order starting at 0, which makes them
/// directly usable as overlap-matrix indices. Interned names are shared
/// `Arc<str>`s so instants, infos and aggregates all alias one
/// allocation per distinct name.
#[derive(Debug, Default)]
pub(crate) struct NameTable {
    names: IndexSet<Arc<str>, RandomState>,
}

impl NameTable {
    /// Interns `name`, returning its dense id and the shared string.
    pub(crate) fn intern(&mut self, name: &str) -> (u32, Arc<str>) {
        if let Some((id, shared)) = self.names.get_full(name) {
            return (id as u32, Arc::clone(shared));
        }
        let shared: Arc<str> = Arc::from(name);
        let (id, _) = self.names.insert_full(Arc::clone(&shared));
        (id as u32, shared)
    }

    /// Shared name string for a given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was never handed out by [`NameTable::intern`].
    pub(crate) fn name(&self, id: u32) -> &Arc<str> {
        self.names
            .get_index(id as usize)
            .expect("name id handed out by intern")
    }

    /// Number of distinct names interned.
    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}
