//! Process-wide named slots.
//!
//! A value anchored under a name outlives whatever component created it, so
//! a component that is torn down and rebuilt inside the same process (a
//! reloaded router, a re-registered plugin) picks the existing value back up
//! instead of silently starting from scratch.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

type Slot = Arc<dyn Any + Send + Sync>;

static SLOTS: LazyLock<Mutex<HashMap<&'static str, Slot>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// The value anchored under `name`, created with `init` if the slot is empty.
///
/// A slot holding a value of another type is replaced. `init` runs with the
/// registry locked and must not anchor anything itself.
pub fn anchored<T, F>(name: &'static str, init: F) -> Arc<T>
where
    T: Any + Send + Sync,
    F: FnOnce() -> T,
{
    let mut slots = SLOTS.lock().unwrap_or_else(PoisonError::into_inner);

    if let Some(existing) = slots.get(name) {
        match Arc::clone(existing).downcast::<T>() {
            Ok(value) => return value,
            Err(_) => log::warn!("Anchored slot {name} held a different type, replacing it"),
        }
    }

    let value = Arc::new(init());
    slots.insert(name, Arc::clone(&value) as Slot);
    value
}

/// Remove the value anchored under `name`. Holders keep their `Arc`.
pub fn release(name: &'static str) -> bool {
    SLOTS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(name)
        .is_some()
}
