use std::fmt;
use std::sync::Arc;

use ai_core::Effects;

use crate::PrimitiveTask;

/// Branch index chosen at every compound task entered while building a plan, in decomposition
/// order. Lower is more preferred.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BranchTraversalRecord(Vec<usize>);

impl BranchTraversalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, branch: usize) {
        self.0.push(branch);
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Whether a plan with this record should replace a running plan with record `old`.
    ///
    /// Only the first index where both records have an entry and differ decides. Equal records,
    /// and records where one is a prefix of the other, are not better.
    pub fn is_better_than(&self, old: &Self) -> bool {
        self.0
            .iter()
            .zip(old.0.iter())
            .find(|(new, old)| new != old)
            .is_some_and(|(new, old)| new < old)
    }
}

impl From<Vec<usize>> for BranchTraversalRecord {
    fn from(value: Vec<usize>) -> Self {
        Self(value)
    }
}

impl fmt::Display for BranchTraversalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, branch) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{branch}")?;
        }
        Ok(())
    }
}

/// Output of a successful decomposition, plus the execution cursor.
#[derive(Debug, Clone)]
pub struct HtnPlan {
    tasks: Vec<Arc<PrimitiveTask>>,
    effects: Vec<Option<Effects>>,
    index: usize,
    btr: BranchTraversalRecord,
}

impl HtnPlan {
    pub(crate) fn new(
        tasks: Vec<Arc<PrimitiveTask>>,
        effects: Vec<Option<Effects>>,
        btr: BranchTraversalRecord,
    ) -> Self {
        debug_assert_eq!(tasks.len(), effects.len());
        Self {
            tasks,
            effects,
            index: 0,
            btr,
        }
    }

    pub fn tasks(&self) -> &[Arc<PrimitiveTask>] {
        &self.tasks
    }

    pub fn effects(&self) -> &[Option<Effects>] {
        &self.effects
    }

    pub fn btr(&self) -> &BranchTraversalRecord {
        &self.btr
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.tasks.len()
    }

    pub fn current_task(&self) -> Option<&Arc<PrimitiveTask>> {
        self.tasks.get(self.index)
    }

    pub fn current_effects(&self) -> Option<&Effects> {
        self.effects.get(self.index)?.as_ref()
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.tasks.iter().map(|t| t.id().as_str())
    }

    /// Move the cursor to the next task. Returns `false` once the plan is exhausted.
    pub fn advance(&mut self) -> bool {
        self.index = (self.index + 1).min(self.tasks.len());
        !self.is_complete()
    }
}
