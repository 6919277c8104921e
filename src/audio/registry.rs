//! Which output devices already carry an analysis tap.
//!
//! The platform allows one tap per raw media source, so a second graph on the
//! same device must not even try. The registry is a cloneable handle: tests
//! create their own, the runtime uses the process-wide one.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

/// Identity of an output binding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default)]
pub struct TapRegistry {
    tapped: Arc<Mutex<HashSet<DeviceId>>>,
}

static GLOBAL: OnceLock<TapRegistry> = OnceLock::new();

impl TapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry shared by every graph in the process.
    pub fn global() -> Self {
        GLOBAL.get_or_init(TapRegistry::new).clone()
    }

    /// Mark `id` as tapped. Returns false when it already was.
    pub fn claim(&self, id: &DeviceId) -> bool {
        // A poisoned set is treated as "already tapped" so we degrade instead of double-tapping.
        self.tapped
            .lock()
            .map(|mut set| set.insert(id.clone()))
            .unwrap_or(false)
    }

    pub fn release(&self, id: &DeviceId) {
        if let Ok(mut set) = self.tapped.lock() {
            set.remove(id);
        }
    }

    #[cfg(test)]
    pub fn is_tapped(&self, id: &DeviceId) -> bool {
        self.tapped
            .lock()
            .map(|set| set.contains(id))
            .unwrap_or(true)
    }
}
