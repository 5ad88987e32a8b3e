use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::{Result, SpoolerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Created,
    Running,
    Paused,
    Finished,
    Aborted,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Finished | JobStatus::Aborted)
    }
}

pub struct Job {
    pub id: usize,
    pub input_path: String,
    pub source_type: usize,
    pub assigned_printer: Option<usize>,
    pub status: JobStatus,
    pub supervisor_pgid: Option<i32>,
    pub created_at: Instant,
    pub status_changed_at: Instant,
}

/// Record of every known job, indexed by a stable `id` that survives
/// compaction of other entries (a plain map already gives this for free —
/// removing one key never perturbs another key's identity).
pub struct JobTable {
    jobs: HashMap<usize, Job>,
    next_id: usize,
    capacity: usize,
}

impl JobTable {
    pub fn new(capacity: usize) -> Self {
        Self { jobs: HashMap::new(), next_id: 0, capacity }
    }

    pub fn count(&self) -> usize {
        self.jobs.len()
    }

    /// Create a new `Created` job for `input_path`/`source_type`. Fails if
    /// the table is at capacity.
    pub fn insert(&mut self, input_path: String, source_type: usize) -> Result<usize> {
        if self.jobs.len() >= self.capacity {
            return Err(SpoolerError::Capacity("job"));
        }
        let id = self.next_id;
        self.next_id += 1;
        let now = Instant::now();
        self.jobs.insert(
            id,
            Job {
                id,
                input_path,
                source_type,
                assigned_printer: None,
                status: JobStatus::Created,
                supervisor_pgid: None,
                created_at: now,
                status_changed_at: now,
            },
        );
        Ok(id)
    }

    pub fn get(&self, id: usize) -> Option<&Job> {
        self.jobs.get(&id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Job> {
        self.jobs.get_mut(&id)
    }

    pub fn remove(&mut self, id: usize) -> Option<Job> {
        self.jobs.remove(&id)
    }

    /// Ids in ascending order, matching the order jobs were submitted.
    pub fn ids_sorted(&self) -> Vec<usize> {
        let mut ids: Vec<usize> = self.jobs.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Move `job` to `status`, stamping `status_changed_at`.
    pub fn set_status(&mut self, id: usize, status: JobStatus) {
        if let Some(job) = self.jobs.get_mut(&id) {
            job.status = status;
            job.status_changed_at = Instant::now();
        }
    }

    /// Ids whose terminal status is at least `grace` old, as of `now`.
    pub fn expired_ids(&self, now: Instant, grace: Duration) -> Vec<usize> {
        self.jobs
            .values()
            .filter(|j| j.status.is_terminal() && now.saturating_duration_since(j.status_changed_at) >= grace)
            .map(|j| j.id)
            .collect()
    }

    pub fn find_by_pgid(&self, pgid: i32) -> Option<usize> {
        self.jobs
            .values()
            .find(|j| j.supervisor_pgid == Some(pgid))
            .map(|j| j.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_stable_under_removal() {
        let mut table = JobTable::new(8);
        let a = table.insert("a.pdf".into(), 0).unwrap();
        let b = table.insert("b.pdf".into(), 0).unwrap();
        let c = table.insert("c.pdf".into(), 0).unwrap();
        table.remove(b);
        assert!(table.get(a).is_some());
        assert!(table.get(c).is_some());
        assert_eq!(table.get(a).unwrap().id, a);
        assert_eq!(table.get(c).unwrap().id, c);
    }

    #[test]
    fn capacity_enforced() {
        let mut table = JobTable::new(1);
        table.insert("a.pdf".into(), 0).unwrap();
        assert!(matches!(
            table.insert("b.pdf".into(), 0),
            Err(SpoolerError::Capacity("job"))
        ));
    }

    #[test]
    fn expired_ids_respects_grace_window() {
        let mut table = JobTable::new(8);
        let id = table.insert("a.pdf".into(), 0).unwrap();
        table.set_status(id, JobStatus::Finished);
        let job = table.get_mut(id).unwrap();
        job.status_changed_at = Instant::now().checked_sub(Duration::from_secs(11)).unwrap();

        let expired = table.expired_ids(Instant::now(), Duration::from_secs(10));
        assert_eq!(expired, vec![id]);
    }

    #[test]
    fn non_terminal_jobs_never_expire() {
        let mut table = JobTable::new(8);
        let id = table.insert("a.pdf".into(), 0).unwrap();
        let job = table.get_mut(id).unwrap();
        job.status_changed_at = Instant::now().checked_sub(Duration::from_secs(100)).unwrap();
        assert!(table.expired_ids(Instant::now(), Duration::from_secs(10)).is_empty());
    }
}
