//! Block execution context
//!
//! A `Context` carries the block header fields the engine reads, the named
//! stores every module keeps its state in, and the events emitted so far.
//! Transactions run on a branch of the context; the branch is written back
//! only if the transaction succeeds. A branch shares every store's committed
//! data and only carries its own writes and events, so its cost follows what
//! the transaction touches.

use crate::error::Result;
use crate::store::KvStore;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn empty_store() -> &'static KvStore {
    static EMPTY: OnceLock<KvStore> = OnceLock::new();
    EMPTY.get_or_init(KvStore::new)
}

/// Typed event with string attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), attributes: Vec::new() }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    height: u64,
    /// Block time, unix seconds
    time: u64,
    stores: BTreeMap<String, KvStore>,
    events: Vec<Event>,
}

impl Context {
    pub fn new(height: u64, time: u64) -> Self {
        Self { height, time, ..Default::default() }
    }

    pub fn block_height(&self) -> u64 {
        self.height
    }

    pub fn block_time(&self) -> u64 {
        self.time
    }

    pub fn set_block(&mut self, height: u64, time: u64) {
        self.height = height;
        self.time = time;
    }

    /// Read access to a named store. A store nobody wrote to reads as empty.
    pub fn kv(&self, name: &str) -> &KvStore {
        self.stores.get(name).unwrap_or_else(|| empty_store())
    }

    pub fn kv_mut(&mut self, name: &str) -> &mut KvStore {
        self.stores.entry(name.to_string()).or_default()
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Fork sharing this context's stores. Writes and events on the branch
    /// are invisible here until [`Context::write`] is called with it.
    pub fn branch(&self) -> Context {
        Context {
            height: self.height,
            time: self.time,
            stores: self.stores.clone(),
            events: Vec::new(),
        }
    }

    /// Adopt a branch of this context, appending its events
    pub fn write(&mut self, branch: Context) {
        let Context { height, time, stores, events } = branch;
        self.height = height;
        self.time = time;
        self.stores = stores;
        self.events.extend(events);
        for store in self.stores.values_mut() {
            store.commit();
        }
    }

    /// Run `f` on a branch and keep its writes only if it returns `Ok`
    pub fn run_atomic<T>(&mut self, f: impl FnOnce(&mut Context) -> Result<T>) -> Result<T> {
        let mut branch = self.branch();
        let out = f(&mut branch)?;
        self.write(branch);
        Ok(out)
    }
}
