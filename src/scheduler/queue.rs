//! Chain queue: launches waiting on another job to finish

use crate::domain::ChainEntry;

/// Ordered list of deferred launches, each anchored on a job id
#[derive(Debug, Clone, Default)]
pub struct ChainQueue {
    entries: Vec<ChainEntry>,
}

impl ChainQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, returning the new queue length
    pub fn push(&mut self, entry: ChainEntry) -> usize {
        self.entries.push(entry);
        self.entries.len()
    }

    /// Remove and return the oldest entry anchored on `job_id`
    pub fn take_first_for(&mut self, job_id: &str) -> Option<ChainEntry> {
        let idx = self.entries.iter().position(|e| e.after_job_id == job_id)?;
        Some(self.entries.remove(idx))
    }

    /// Move every entry anchored on `from` onto `to`, returning how many moved
    pub fn repoint(&mut self, from: &str, to: &str) -> usize {
        let mut moved = 0;
        for entry in self.entries.iter_mut().filter(|e| e.after_job_id == from) {
            entry.after_job_id = to.to_string();
            moved += 1;
        }
        moved
    }

    /// Remove every entry anchored on `job_id`
    pub fn drain_for(&mut self, job_id: &str) -> Vec<ChainEntry> {
        let (dropped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.after_job_id == job_id);
        self.entries = kept;
        dropped
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
