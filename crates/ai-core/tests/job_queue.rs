use ai_core::{run_to_completion, Job, JobPoll, JobQueue, JobStatus, SliceBudget, TimeSlice};

/// Counts to `target`, treating every increment as one step.
struct CountJob {
    current: u32,
    target: u32,
    resumes: u32,
}

impl CountJob {
    fn new(target: u32) -> Self {
        Self {
            current: 0,
            target,
            resumes: 0,
        }
    }
}

impl Job for CountJob {
    type Output = (u32, u32);

    fn resume(&mut self, slice: &mut TimeSlice) -> JobPoll<Self::Output> {
        self.resumes += 1;
        while self.current < self.target {
            if slice.should_yield() {
                return JobPoll::Pending;
            }
            slice.note_step();
            self.current += 1;
        }
        JobPoll::Ready((self.current, self.resumes))
    }
}

#[test]
fn step_budget_spreads_work_across_process_calls() {
    let mut queue = JobQueue::default();
    let handle = queue.enqueue(CountJob::new(5), SliceBudget::from_steps(2));

    assert_eq!(queue.process(), 1);
    assert_eq!(handle.status(), JobStatus::Pending);
    assert_eq!(queue.process(), 1);
    assert_eq!(handle.status(), JobStatus::Pending);
    assert_eq!(queue.process(), 1);
    assert_eq!(handle.status(), JobStatus::Finished);
    assert!(queue.is_empty());

    assert_eq!(handle.take_result(), Some((5, 3)));
    assert_eq!(handle.take_result(), None, "result is taken once");
}

#[test]
fn zero_step_budget_still_makes_progress() {
    let mut queue = JobQueue::default();
    let handle = queue.enqueue(CountJob::new(2), SliceBudget::from_steps(0));

    queue.process();
    queue.process();
    queue.process();
    assert!(handle.is_finished());
}

#[test]
fn cancelled_job_is_dropped_without_result() {
    let mut queue = JobQueue::default();
    let handle = queue.enqueue(CountJob::new(10), SliceBudget::from_steps(1));

    queue.process();
    handle.cancel();
    assert_eq!(handle.status(), JobStatus::Cancelled);

    assert_eq!(queue.process(), 0);
    assert!(queue.is_empty());
    assert_eq!(handle.take_result(), None);
}

#[test]
fn jobs_are_resumed_in_fifo_order() {
    let mut queue = JobQueue::default();
    let first = queue.enqueue(CountJob::new(1), SliceBudget::unbounded());
    let second = queue.enqueue(CountJob::new(3), SliceBudget::from_steps(1));
    let third = queue.enqueue(CountJob::new(1), SliceBudget::unbounded());

    assert_eq!(queue.process(), 3);
    assert!(first.is_finished());
    assert!(!second.is_finished());
    assert!(third.is_finished());
    assert_eq!(queue.len(), 1);
}

#[test]
fn run_to_completion_ignores_budgets() {
    assert_eq!(run_to_completion(CountJob::new(100)), (100, 1));
}
