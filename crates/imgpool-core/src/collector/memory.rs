//! In-memory collector: committed outputs land in a shared map.

use dashmap::DashMap;
use std::io::{self, Write};
use std::sync::Arc;

use super::{Collector, CollectorSession};
use crate::error::{PipelineError, PipelineResult};
use crate::types::TaskContext;

/// Thread-safe mapping from task name to committed output bytes.
///
/// Cloning is cheap and every clone sees the same entries. Written only by
/// commits; read it after the pool has been joined.
#[derive(Debug, Clone, Default)]
pub struct ResultCollection {
    entries: Arc<DashMap<String, Vec<u8>>>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, name: String, bytes: Vec<u8>) {
        self.entries.insert(name, bytes);
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.entries.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Committed task names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Remove and return every entry, sorted by task name.
    pub fn drain_sorted(&self) -> Vec<(String, Vec<u8>)> {
        let mut out = Vec::with_capacity(self.entries.len());
        for name in self.names() {
            if let Some(entry) = self.entries.remove(&name) {
                out.push(entry);
            }
        }
        out
    }
}

/// Collector that buffers each task in memory and publishes to a
/// [`ResultCollection`] on commit.
#[derive(Debug, Clone, Default)]
pub struct MemoryCollector {
    collection: ResultCollection,
}

impl MemoryCollector {
    pub fn new(collection: ResultCollection) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> &ResultCollection {
        &self.collection
    }
}

impl Collector for MemoryCollector {
    fn acquire(&self, ctx: &TaskContext) -> PipelineResult<Box<dyn CollectorSession>> {
        Ok(Box::new(MemorySession {
            buf: Vec::new(),
            written: false,
            name: ctx.task.clone(),
            collection: self.collection.clone(),
        }))
    }
}

struct MemorySession {
    buf: Vec<u8>,
    written: bool,
    name: String,
    collection: ResultCollection,
}

impl Write for MemorySession {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written = true;
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CollectorSession for MemorySession {
    fn commit(&mut self) -> PipelineResult<()> {
        if !self.written {
            return Err(PipelineError::EmptyCommit {
                task: self.name.clone(),
            });
        }
        self.collection
            .insert(self.name.clone(), std::mem::take(&mut self.buf));
        Ok(())
    }

    fn abort(&mut self) -> PipelineResult<()> {
        self.buf = Vec::new();
        Ok(())
    }

    fn close(&mut self) -> PipelineResult<()> {
        self.buf = Vec::new();
        Ok(())
    }
}
