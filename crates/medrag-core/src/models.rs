//! Lazily-loaded, process-shared model handles.
//!
//! A `ModelSlot` holds at most one loaded model together with the name it was
//! loaded under. Asking for the same name returns the cached `Arc`; a different
//! name replaces it. Loading happens under the slot's lock, so concurrent first
//! callers load exactly once.

use std::sync::{Arc, Mutex, OnceLock};

use crate::error::{Error, Result};
use crate::traits::{CrossEncoder, Embedder};

pub struct ModelSlot<T: ?Sized> {
    inner: Mutex<Option<(String, Arc<T>)>>,
}

impl<T: ?Sized> Default for ModelSlot<T> {
    fn default() -> Self { Self { inner: Mutex::new(None) } }
}

impl<T: ?Sized> ModelSlot<T> {
    pub fn new() -> Self { Self::default() }

    /// Return the cached model for `name`, loading it with `load` on first use.
    pub fn get_or_load<F>(&self, name: &str, load: F) -> Result<Arc<T>>
    where
        F: FnOnce(&str) -> anyhow::Result<Arc<T>>,
    {
        let mut guard = self.inner.lock().map_err(|_| Error::Operation(format!("model cache for '{name}' is poisoned")))?;
        if let Some((loaded, model)) = guard.as_ref() {
            if loaded == name {
                return Ok(Arc::clone(model));
            }
            tracing::info!(previous = %loaded, requested = %name, "model name changed, reloading");
        }
        let model = load(name).map_err(|e| Error::ModelLoad { model: name.to_string(), message: format!("{e:#}") })?;
        *guard = Some((name.to_string(), Arc::clone(&model)));
        Ok(model)
    }

    /// Put an already-built model in the slot (used to substitute fakes).
    pub fn install(&self, name: &str, model: Arc<T>) {
        let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Some((name.to_string(), model));
    }

    pub fn reset(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = None;
    }

    pub fn loaded_name(&self) -> Option<String> {
        self.inner.lock().ok().and_then(|g| g.as_ref().map(|(n, _)| n.clone()))
    }
}

/// The model handles shared by all requests of a process.
#[derive(Default)]
pub struct ModelRegistry {
    pub embedder: ModelSlot<dyn Embedder>,
    pub cross_encoder: ModelSlot<dyn CrossEncoder>,
}

impl ModelRegistry {
    pub fn new() -> Self { Self::default() }

    /// Process-wide registry, created on first access.
    pub fn shared() -> Arc<ModelRegistry> {
        static SHARED: OnceLock<Arc<ModelRegistry>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(ModelRegistry::new())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn same_name_loads_once() {
        let slot: ModelSlot<String> = ModelSlot::new();
        let loads = AtomicUsize::new(0);
        let a = slot
            .get_or_load("m1", |n| {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(n.to_string()))
            })
            .unwrap();
        let b = slot.get_or_load("m1", |_| panic!("must not reload")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn different_name_replaces_and_reset_clears() {
        let slot: ModelSlot<String> = ModelSlot::new();
        slot.get_or_load("m1", |n| Ok(Arc::new(n.to_string()))).unwrap();
        let b = slot.get_or_load("m2", |n| Ok(Arc::new(n.to_string()))).unwrap();
        assert_eq!(b.as_str(), "m2");
        assert_eq!(slot.loaded_name().as_deref(), Some("m2"));
        slot.reset();
        assert!(slot.loaded_name().is_none());
    }

    #[test]
    fn load_failure_is_typed_and_not_cached() {
        let slot: ModelSlot<String> = ModelSlot::new();
        let err = slot.get_or_load("broken", |_| Err(anyhow::anyhow!("weights missing"))).unwrap_err();
        assert!(matches!(err, Error::ModelLoad { ref model, .. } if model == "broken"));
        assert!(slot.loaded_name().is_none());
    }
}
