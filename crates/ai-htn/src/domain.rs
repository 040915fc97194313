use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{CompoundIdx, CompoundTask, PrimitiveIdx, PrimitiveTask, TaskId, TaskRef};

/// Task definitions as loaded, with sub-tasks still referenced by id.
#[derive(Debug, Clone, Default)]
pub struct TaskDefinitions {
    compounds: BTreeMap<TaskId, CompoundTask>,
    primitives: BTreeMap<TaskId, PrimitiveTask>,
}

impl TaskDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_compound(&mut self, task: CompoundTask) -> &mut Self {
        if let Some(previous) = self.compounds.insert(task.id().clone(), task) {
            tracing::warn!(task = %previous.id(), "compound task redefined, keeping the latest");
        }
        self
    }

    pub fn add_primitive(&mut self, task: PrimitiveTask) -> &mut Self {
        if let Some(previous) = self.primitives.insert(task.id().clone(), task) {
            tracing::warn!(task = %previous.id(), "primitive task redefined, keeping the latest");
        }
        self
    }

    pub fn len(&self) -> usize {
        self.compounds.len() + self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compounds.is_empty() && self.primitives.is_empty()
    }

    /// Resolve every branch's sub-task ids against these definitions.
    ///
    /// Ids are looked up as compound tasks first, then primitives. Entries that match neither
    /// are logged and left out of the branch.
    pub fn resolve(&self) -> TaskDomain {
        let compounds: Vec<Arc<CompoundTask>> =
            self.compounds.values().cloned().map(Arc::new).collect();
        let primitives: Vec<Arc<PrimitiveTask>> =
            self.primitives.values().cloned().map(Arc::new).collect();

        let mut index = BTreeMap::new();
        for (i, primitive) in primitives.iter().enumerate() {
            index.insert(primitive.id().clone(), TaskRef::Primitive(PrimitiveIdx(i)));
        }
        for (i, compound) in compounds.iter().enumerate() {
            index.insert(compound.id().clone(), TaskRef::Compound(CompoundIdx(i)));
        }

        let mut unresolved = Vec::new();
        let branches: Vec<Vec<Vec<TaskRef>>> = compounds
            .iter()
            .map(|compound| {
                compound
                    .branches()
                    .iter()
                    .enumerate()
                    .map(|(branch, def)| {
                        def.task_ids()
                            .iter()
                            .filter_map(|id| {
                                let found = index.get(id).copied();
                                if found.is_none() {
                                    tracing::error!(
                                        task = %id,
                                        compound = %compound.id(),
                                        branch,
                                        "unable to find task referenced by branch"
                                    );
                                    unresolved.push(UnresolvedTask {
                                        compound: compound.id().clone(),
                                        branch,
                                        task: id.clone(),
                                    });
                                }
                                found
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        TaskDomain {
            compounds,
            primitives,
            index,
            branches,
            unresolved,
        }
    }
}

/// A branch entry that named no known task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedTask {
    pub compound: TaskId,
    pub branch: usize,
    pub task: TaskId,
}

/// Immutable, resolved task network shared by every planning job.
#[derive(Debug)]
pub struct TaskDomain {
    compounds: Vec<Arc<CompoundTask>>,
    primitives: Vec<Arc<PrimitiveTask>>,
    index: BTreeMap<TaskId, TaskRef>,
    branches: Vec<Vec<Vec<TaskRef>>>,
    unresolved: Vec<UnresolvedTask>,
}

impl Default for TaskDomain {
    fn default() -> Self {
        TaskDefinitions::default().resolve()
    }
}

impl TaskDomain {
    pub fn lookup(&self, id: &str) -> Option<TaskRef> {
        self.index.get(id).copied()
    }

    pub fn compound(&self, idx: CompoundIdx) -> &CompoundTask {
        &self.compounds[idx.0]
    }

    pub fn primitive(&self, idx: PrimitiveIdx) -> &Arc<PrimitiveTask> {
        &self.primitives[idx.0]
    }

    /// Resolved sub-tasks of `branch` on `compound`.
    pub fn branch_tasks(&self, compound: CompoundIdx, branch: usize) -> &[TaskRef] {
        &self.branches[compound.0][branch]
    }

    pub fn compound_count(&self) -> usize {
        self.compounds.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    pub fn unresolved(&self) -> &[UnresolvedTask] {
        &self.unresolved
    }
}

#[derive(Debug)]
struct LibraryState {
    domain: Arc<TaskDomain>,
    generation: u64,
}

/// Hot-reloadable holder of the current [`TaskDomain`].
///
/// Readers clone the current `Arc`. A reload holds the write lock while it resolves the new
/// definitions, so no planning request can start against a half-loaded network, then swaps the
/// fresh table in. Jobs keep the domain they started with.
#[derive(Debug)]
pub struct TaskLibrary {
    state: RwLock<LibraryState>,
}

impl Default for TaskLibrary {
    fn default() -> Self {
        Self::new(TaskDomain::default())
    }
}

impl TaskLibrary {
    pub fn new(domain: TaskDomain) -> Self {
        Self {
            state: RwLock::new(LibraryState {
                domain: Arc::new(domain),
                generation: 0,
            }),
        }
    }

    pub fn from_definitions(definitions: &TaskDefinitions) -> Self {
        Self::new(definitions.resolve())
    }

    pub fn current(&self) -> Arc<TaskDomain> {
        self.current_with_generation().0
    }

    pub fn generation(&self) -> u64 {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    pub fn current_with_generation(&self) -> (Arc<TaskDomain>, u64) {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        (Arc::clone(&state.domain), state.generation)
    }

    /// Replace the task network. Returns the new generation.
    pub fn reload(&self, definitions: &TaskDefinitions) -> u64 {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.domain = Arc::new(definitions.resolve());
        state.generation = state.generation.wrapping_add(1);
        tracing::info!(
            generation = state.generation,
            compounds = state.domain.compound_count(),
            primitives = state.domain.primitive_count(),
            "reloaded htn task library"
        );
        state.generation
    }
}
