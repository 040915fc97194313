//! Deterministic, engine-agnostic AI kernel primitives.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod blackboard;
pub mod job;
pub mod tick;

pub use agent::{sort_by_stable_id, AgentId};
pub use blackboard::{BbKey, BbValue, Blackboard, BlackboardError, BlackboardValue, Effects};
pub use job::{
    run_to_completion, Job, JobHandle, JobPoll, JobQueue, JobStatus, SliceBudget, TimeSlice,
};
pub use tick::TickContext;
