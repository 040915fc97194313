//! Cooperative, time-sliced jobs.
//!
//! A [`Job`] is a resumable unit of work. The [`JobQueue`] resumes every pending job once per
//! [`JobQueue::process`] call, handing each resume a [`TimeSlice`]; jobs check
//! [`TimeSlice::should_yield`] at their own suspension points and return [`JobPoll::Pending`]
//! to continue on a later tick.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How much work a single resume may do.
///
/// `max_steps` counts job-defined units of work and makes slicing deterministic; `max_duration`
/// is a wall-clock bound. Either may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SliceBudget {
    pub max_duration: Option<Duration>,
    pub max_steps: Option<u32>,
}

impl SliceBudget {
    pub const fn unbounded() -> Self {
        Self {
            max_duration: None,
            max_steps: None,
        }
    }

    pub const fn from_duration(max_duration: Duration) -> Self {
        Self {
            max_duration: Some(max_duration),
            max_steps: None,
        }
    }

    pub const fn from_steps(max_steps: u32) -> Self {
        Self {
            max_duration: None,
            max_steps: Some(max_steps),
        }
    }
}

/// Budget tracker for one resume of a job.
#[derive(Debug, Clone)]
pub struct TimeSlice {
    started: Instant,
    deadline: Option<Instant>,
    max_steps: Option<u32>,
    steps: u32,
}

impl TimeSlice {
    pub fn new(budget: SliceBudget) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: budget.max_duration.map(|d| started + d),
            max_steps: budget.max_steps,
            steps: 0,
        }
    }

    fn clamped_to(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = match (self.deadline, deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self
    }

    /// True once the budget is spent. Always false before the first step so every resume makes
    /// progress.
    pub fn should_yield(&self) -> bool {
        if self.steps == 0 {
            return false;
        }
        if self.max_steps.is_some_and(|max| self.steps >= max) {
            return true;
        }
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub fn note_step(&mut self) {
        self.steps = self.steps.saturating_add(1);
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPoll<T> {
    Pending,
    Ready(T),
}

pub trait Job: Send + 'static {
    type Output: Send + 'static;

    fn resume(&mut self, slice: &mut TimeSlice) -> JobPoll<Self::Output>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Finished,
    Cancelled,
}

enum JobSlot<T> {
    Pending,
    Finished(Option<T>),
}

struct JobShared<T> {
    slot: Mutex<JobSlot<T>>,
    cancelled: AtomicBool,
}

/// Shared view of a queued job: status, cancellation and the result slot.
pub struct JobHandle<T> {
    shared: Arc<JobShared<T>>,
}

impl<T> Clone for JobHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for JobHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("status", &self.status())
            .finish()
    }
}

impl<T> JobHandle<T> {
    fn new() -> Self {
        Self {
            shared: Arc::new(JobShared {
                slot: Mutex::new(JobSlot::Pending),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    fn slot(&self) -> MutexGuard<'_, JobSlot<T>> {
        self.shared
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, value: T) {
        *self.slot() = JobSlot::Finished(Some(value));
    }

    pub fn status(&self) -> JobStatus {
        if self.is_cancelled() {
            return JobStatus::Cancelled;
        }
        match *self.slot() {
            JobSlot::Pending => JobStatus::Pending,
            JobSlot::Finished(_) => JobStatus::Finished,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status() == JobStatus::Finished
    }

    /// Request cancellation. The queue drops the job before its next resume and never fills the
    /// result slot.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Take the result of a finished job. Returns `None` while pending, after cancellation, or if
    /// the result was already taken.
    pub fn take_result(&self) -> Option<T> {
        if self.is_cancelled() {
            return None;
        }
        match &mut *self.slot() {
            JobSlot::Pending => None,
            JobSlot::Finished(result) => result.take(),
        }
    }
}

trait QueuedJob: Send {
    fn is_cancelled(&self) -> bool;

    /// Returns `true` when the job completed during this resume.
    fn resume(&mut self, deadline: Option<Instant>) -> bool;
}

struct QueueEntry<J: Job> {
    job: J,
    budget: SliceBudget,
    handle: JobHandle<J::Output>,
}

impl<J: Job> QueuedJob for QueueEntry<J> {
    fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }

    fn resume(&mut self, deadline: Option<Instant>) -> bool {
        let mut slice = TimeSlice::new(self.budget).clamped_to(deadline);
        match self.job.resume(&mut slice) {
            JobPoll::Pending => false,
            JobPoll::Ready(value) => {
                self.handle.finish(value);
                true
            }
        }
    }
}

/// FIFO queue of cooperative jobs sharing a per-`process` budget.
pub struct JobQueue {
    budget: SliceBudget,
    jobs: VecDeque<Box<dyn QueuedJob>>,
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("budget", &self.budget)
            .field("jobs", &self.jobs.len())
            .finish()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new(SliceBudget::unbounded())
    }
}

impl JobQueue {
    /// `budget.max_duration` bounds the wall-clock time of one `process` call across all jobs.
    pub fn new(budget: SliceBudget) -> Self {
        Self {
            budget,
            jobs: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Queue a job; each resume gets a fresh slice of `budget`.
    pub fn enqueue<J: Job>(&mut self, job: J, budget: SliceBudget) -> JobHandle<J::Output> {
        let handle = JobHandle::new();
        self.jobs.push_back(Box::new(QueueEntry {
            job,
            budget,
            handle: handle.clone(),
        }));
        handle
    }

    /// Resume each queued job at most once. Finished and cancelled jobs leave the queue; pending
    /// jobs keep their order. Returns the number of jobs resumed.
    pub fn process(&mut self) -> usize {
        let deadline = self.budget.max_duration.map(|d| Instant::now() + d);
        let mut resumed = 0usize;
        let mut remaining = VecDeque::with_capacity(self.jobs.len());

        while let Some(mut job) = self.jobs.pop_front() {
            if job.is_cancelled() {
                tracing::trace!("dropping cancelled job");
                continue;
            }

            let out_of_time = deadline.is_some_and(|d| Instant::now() >= d);
            if resumed > 0 && out_of_time {
                remaining.push_back(job);
                continue;
            }

            resumed += 1;
            if !job.resume(deadline) {
                remaining.push_back(job);
            }
        }

        self.jobs = remaining;
        tracing::trace!(resumed, pending = self.jobs.len(), "processed job queue");
        resumed
    }
}

/// Run a job to completion on the calling thread, one unbounded slice per resume.
pub fn run_to_completion<J: Job>(mut job: J) -> J::Output {
    loop {
        let mut slice = TimeSlice::new(SliceBudget::unbounded());
        if let JobPoll::Ready(value) = job.resume(&mut slice) {
            return value;
        }
    }
}
