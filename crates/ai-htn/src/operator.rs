use std::fmt;

use ai_core::{Blackboard, Effects};

/// Result of one operator update, and the reason handed to [`HtnOperator::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorStatus {
    Continuing,
    Finished,
    Failed,
    /// The plan running this operator was replaced by a better one.
    BetterPlan,
}

/// Behaviour bound to a primitive task.
///
/// Operators are shared by every agent running the same task definition, so per-agent state
/// belongs on the blackboard. Lifecycle per plan step:
/// `startup -> update* -> shutdown(final status)`.
pub trait HtnOperator: Send + Sync + fmt::Debug {
    /// Called once while planning, against the planner's private snapshot. The returned effects
    /// are applied to that snapshot and captured on the plan.
    fn plan_update(&self, _blackboard: &Blackboard) -> Option<Effects> {
        None
    }

    fn startup(&self, _blackboard: &mut Blackboard) {}

    fn update(&self, blackboard: &mut Blackboard, dt_seconds: f32) -> OperatorStatus;

    fn shutdown(&self, _blackboard: &mut Blackboard, _status: OperatorStatus) {}
}
