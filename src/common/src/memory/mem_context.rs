// Copyright 2025 RisingWave Labs
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use prometheus::IntGauge;

pub type MemoryContextRef = Arc<MemoryContext>;

/// Accounts the memory held by tables built for one query.
///
/// The host owns the root context and hands it to every operator through its execution context.
/// Operators only borrow it: tables report their size changes into it, nothing here allocates or
/// frees on its behalf.
pub struct MemoryContext {
    counter: MemCounter,
    parent: Option<MemoryContextRef>,
}

pub enum MemCounter {
    /// Plain counter, for contexts nobody scrapes.
    Local(AtomicI64),
    /// Counter exported by the host's metrics registry.
    Gauge(IntGauge),
}

impl From<IntGauge> for MemCounter {
    fn from(value: IntGauge) -> Self {
        MemCounter::Gauge(value)
    }
}

impl MemoryContext {
    pub fn new<C: Into<MemCounter>>(parent: Option<MemoryContextRef>, counter: C) -> Self {
        Self {
            counter: counter.into(),
            parent,
        }
    }

    /// A root context backed by a local counter.
    pub fn root() -> MemoryContextRef {
        Arc::new(Self {
            counter: MemCounter::Local(AtomicI64::new(0)),
            parent: None,
        })
    }

    /// A child context whose usage is also charged to `parent`.
    pub fn child(parent: &MemoryContextRef) -> MemoryContextRef {
        Arc::new(Self {
            counter: MemCounter::Local(AtomicI64::new(0)),
            parent: Some(parent.clone()),
        })
    }

    /// Context for tests and tables nobody accounts for.
    pub fn none() -> MemoryContextRef {
        Self::root()
    }

    /// Add `bytes` memory usage. Pass negative value to decrease memory usage.
    pub fn add(&self, bytes: i64) {
        match &self.counter {
            MemCounter::Local(c) => {
                c.fetch_add(bytes, Ordering::Relaxed);
            }
            MemCounter::Gauge(c) => c.add(bytes),
        }

        if let Some(parent) = &self.parent {
            parent.add(bytes);
        }
    }

    pub fn get_bytes_used(&self) -> i64 {
        match &self.counter {
            MemCounter::Local(c) => c.load(Ordering::Relaxed),
            MemCounter::Gauge(c) => c.get(),
        }
    }
}

impl Drop for MemoryContext {
    fn drop(&mut self) {
        if let Some(p) = &self.parent {
            p.add(-self.get_bytes_used())
        }
    }
}

impl std::fmt::Debug for MemoryContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryContext")
            .field("bytes_used", &self.get_bytes_used())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_propagates_to_parent() {
        let root = MemoryContext::root();
        let child = MemoryContext::child(&root);
        child.add(100);
        child.add(-30);
        assert_eq!(child.get_bytes_used(), 70);
        assert_eq!(root.get_bytes_used(), 70);
        drop(child);
        assert_eq!(root.get_bytes_used(), 0);
    }

    #[test]
    fn test_gauge_counter() {
        let gauge = IntGauge::new("tvf_memory_bytes", "bytes held by tvf tables").unwrap();
        let ctx = MemoryContext::new(None, gauge.clone());
        ctx.add(42);
        assert_eq!(gauge.get(), 42);
    }
}
