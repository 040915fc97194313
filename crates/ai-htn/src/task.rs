use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::{HtnOperator, Precondition};

/// Unique identifier of a compound or primitive task definition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CompoundIdx(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimitiveIdx(pub(crate) usize);

/// A resolved reference into a [`TaskDomain`](crate::TaskDomain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskRef {
    Compound(CompoundIdx),
    Primitive(PrimitiveIdx),
}

/// A directly executable task: preconditions gate it during planning, the operator runs it.
#[derive(Debug, Clone)]
pub struct PrimitiveTask {
    id: TaskId,
    preconditions: Vec<Arc<dyn Precondition>>,
    operator: Arc<dyn HtnOperator>,
    apply_effects_on_startup: bool,
}

impl PrimitiveTask {
    pub fn new(id: impl Into<TaskId>, operator: impl HtnOperator + 'static) -> Self {
        Self::with_shared_operator(id, Arc::new(operator))
    }

    pub fn with_shared_operator(id: impl Into<TaskId>, operator: Arc<dyn HtnOperator>) -> Self {
        Self {
            id: id.into(),
            preconditions: Vec::new(),
            operator,
            apply_effects_on_startup: true,
        }
    }

    pub fn with_precondition(mut self, precondition: impl Precondition + 'static) -> Self {
        self.preconditions.push(Arc::new(precondition));
        self
    }

    pub fn with_shared_precondition(mut self, precondition: Arc<dyn Precondition>) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// Whether the effects captured during planning are written to the live blackboard right
    /// before the operator starts. Defaults to `true`.
    pub fn with_apply_effects_on_startup(mut self, apply: bool) -> Self {
        self.apply_effects_on_startup = apply;
        self
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn preconditions(&self) -> &[Arc<dyn Precondition>] {
        &self.preconditions
    }

    pub fn operator(&self) -> &dyn HtnOperator {
        self.operator.as_ref()
    }

    pub fn apply_effects_on_startup(&self) -> bool {
        self.apply_effects_on_startup
    }
}

/// One method of a compound task. Sub-tasks are referenced by id and resolved when the
/// definitions are loaded.
#[derive(Debug, Clone, Default)]
pub struct Branch {
    preconditions: Vec<Arc<dyn Precondition>>,
    tasks: Vec<TaskId>,
}

impl Branch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_precondition(mut self, precondition: impl Precondition + 'static) -> Self {
        self.preconditions.push(Arc::new(precondition));
        self
    }

    pub fn with_shared_precondition(mut self, precondition: Arc<dyn Precondition>) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub fn with_task(mut self, id: impl Into<TaskId>) -> Self {
        self.tasks.push(id.into());
        self
    }

    pub fn with_tasks<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TaskId>,
    {
        self.tasks.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn preconditions(&self) -> &[Arc<dyn Precondition>] {
        &self.preconditions
    }

    pub fn task_ids(&self) -> &[TaskId] {
        &self.tasks
    }
}

/// A task decomposed by the first branch (in declaration order) whose preconditions hold.
#[derive(Debug, Clone)]
pub struct CompoundTask {
    id: TaskId,
    branches: Vec<Branch>,
}

impl CompoundTask {
    pub fn new(id: impl Into<TaskId>) -> Self {
        Self {
            id: id.into(),
            branches: Vec::new(),
        }
    }

    pub fn with_branch(mut self, branch: Branch) -> Self {
        self.branches.push(branch);
        self
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }
}
