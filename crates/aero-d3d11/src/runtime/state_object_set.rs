use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Deduplicates immutable objects built from a descriptor.
///
/// Lookup and creation happen under one lock, so concurrent requests for the
/// same descriptor create it once and all receive the same `Arc`.
#[derive(Debug)]
pub struct StateObjectSet<D, T> {
    objects: Mutex<HashMap<D, Arc<T>>>,
}

impl<D, T> Default for StateObjectSet<D, T> {
    fn default() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
        }
    }
}

impl<D: Eq + Hash + Clone, T> StateObjectSet<D, T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<D, Arc<T>>> {
        // Entries are only inserted fully built; a panic in `create` leaves
        // the map consistent.
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_or_create(&self, desc: &D, create: impl FnOnce(&D) -> T) -> Arc<T> {
        let mut objects = self.lock();
        if let Some(object) = objects.get(desc) {
            return object.clone();
        }
        let object = Arc::new(create(desc));
        objects.insert(desc.clone(), object.clone());
        object
    }

    /// Like [`Self::get_or_create`]; a failed creation inserts nothing.
    pub fn get_or_try_create<E>(
        &self,
        desc: &D,
        create: impl FnOnce(&D) -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        let mut objects = self.lock();
        if let Some(object) = objects.get(desc) {
            return Ok(object.clone());
        }
        let object = Arc::new(create(desc)?);
        objects.insert(desc.clone(), object.clone());
        Ok(object)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
