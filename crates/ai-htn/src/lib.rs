//! Hierarchical task network planning and execution for NPC agents.
//!
//! A [`TaskLibrary`] holds the resolved task network. [`HtnPlanner`] decomposes a root compound
//! task into an [`HtnPlan`] as a time-sliced [`ai_core::Job`], working on a blackboard snapshot.
//! [`HtnSystem`] runs planning jobs off a shared queue and steps every agent's running plan.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod config;
pub mod debug;
pub mod domain;
pub mod driver;
pub mod operator;
pub mod plan;
pub mod planner;
pub mod precondition;
pub mod task;

pub use config::HtnConfig;
pub use debug::{describe_domain, describe_plan};
pub use domain::{TaskDefinitions, TaskDomain, TaskLibrary, UnresolvedTask};
pub use driver::{HtnAgent, HtnSystem};
pub use operator::{HtnOperator, OperatorStatus};
pub use plan::{BranchTraversalRecord, HtnPlan};
pub use planner::{HtnPlanner, HtnPlannerConfig, PlanOutcome, PlanningJob};
pub use precondition::{
    FnPrecondition, KeyEquals, KeyExists, Not, Precondition, PreconditionError,
};
pub use task::{Branch, CompoundIdx, CompoundTask, PrimitiveIdx, PrimitiveTask, TaskId, TaskRef};

#[derive(Debug, thiserror::Error)]
pub enum HtnError {
    #[error("unknown root task `{0}`")]
    UnknownRootTask(TaskId),

    #[error("root task `{0}` is primitive; planning needs a compound root")]
    RootNotCompound(TaskId),
}

pub type Result<T> = std::result::Result<T, HtnError>;
