//! Shared execution context with typed keys.
//!
//! The context is a key/value store shared by every command in a chain run.
//! Keys are typed: a [`Key<T>`] couples a name with the value type stored
//! under it, so commands cannot read a value back as the wrong type and key
//! names live in one registry instead of being scattered string literals.
//!
//! Presence is the whole story here. `contains` is true exactly when `get`
//! returns `Some`; there is no stored-but-null state. Clearing a value is
//! done with [`Context::remove`].
//!
//! A `Context` is a cheap handle: clones share the same underlying map,
//! which is what lets a [`crate::ParallelChain`] hand the context to every
//! worker. One context belongs to one chain run; never reuse it across
//! concurrent runs.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

/// A typed key into a [`Context`].
///
/// Construct keys as constants so the name set is fixed at compile time:
///
/// ```
/// use skuforge_chain::Key;
///
/// const RETRIES: Key<u32> = Key::new("retries");
/// ```
pub struct Key<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    /// Create a key with the given name.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.name).finish()
    }
}

type ValueMap = HashMap<&'static str, Arc<dyn Any + Send + Sync>>;

/// Shared key/value store for one chain run.
#[derive(Clone, Default)]
pub struct Context {
    values: Arc<RwLock<ValueMap>>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, overwriting any previous value.
    pub fn set<T: Any + Send + Sync>(&self, key: &Key<T>, value: T) {
        self.values.write().insert(key.name, Arc::new(value));
    }

    /// Fetch the value under `key`.
    ///
    /// Returns `None` when nothing is stored under the key's name or the
    /// stored value has a different type.
    pub fn get<T: Any + Send + Sync>(&self, key: &Key<T>) -> Option<Arc<T>> {
        let guard = self.values.read();
        let value = guard.get(key.name)?;
        Arc::clone(value).downcast::<T>().ok()
    }

    /// True exactly when [`Context::get`] would return `Some`.
    pub fn contains<T: Any + Send + Sync>(&self, key: &Key<T>) -> bool {
        self.get(key).is_some()
    }

    /// Remove the value under `key`, returning it if it was present with
    /// the key's type. Afterwards `contains` is false.
    pub fn remove<T: Any + Send + Sync>(&self, key: &Key<T>) -> Option<Arc<T>> {
        let mut guard = self.values.write();
        if !guard.get(key.name)?.is::<T>() {
            return None;
        }
        let value = guard.remove(key.name)?;
        value.downcast::<T>().ok()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&'static str> = self.values.read().keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("Context").field("keys", &names).finish()
    }
}
