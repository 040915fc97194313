use std::collections::VecDeque;
use std::sync::Arc;

use ai_core::{run_to_completion, Blackboard, Effects, Job, JobPoll, TimeSlice};

use crate::precondition::all_met;
use crate::{
    BranchTraversalRecord, CompoundIdx, HtnError, HtnPlan, PrimitiveIdx, TaskDomain, TaskId,
    TaskRef,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtnPlannerConfig {
    /// Max compound tasks entered at once along the current decomposition (the backtracking
    /// stack depth). A compound past this depth is a dead end and is backtracked out of, which
    /// bounds recursive task networks without cutting short the search of finite ones.
    pub max_depth: usize,

    /// Optional cap on dequeued tasks, backtracked retries included. Exceeding it fails the job.
    pub max_expansions: Option<usize>,
}

impl Default for HtnPlannerConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_expansions: None,
        }
    }
}

/// What a finished planning job hands back.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: Option<HtnPlan>,
    pub expansions: usize,
}

/// Everything needed to retry a compound task with its next branch.
#[derive(Debug)]
struct DecompositionState {
    blackboard: Blackboard,
    compound: CompoundIdx,
    branch: usize,
    pending: VecDeque<TaskRef>,
    plan_len: usize,
    btr_len: usize,
}

/// Depth-first decomposition with backtracking, written as a resumable state machine.
///
/// The job owns its blackboard snapshot and only ever suspends right before a compound task's
/// branches are evaluated.
#[derive(Debug)]
pub struct PlanningJob {
    domain: Arc<TaskDomain>,
    config: HtnPlannerConfig,
    blackboard: Blackboard,
    pending: VecDeque<TaskRef>,
    stack: Vec<DecompositionState>,
    tasks: Vec<PrimitiveIdx>,
    effects: Vec<Option<Effects>>,
    btr: BranchTraversalRecord,
    branch_cursor: usize,
    expansions: usize,
}

impl PlanningJob {
    pub fn new(
        domain: Arc<TaskDomain>,
        root: CompoundIdx,
        blackboard: Blackboard,
        config: HtnPlannerConfig,
    ) -> Self {
        Self {
            domain,
            config,
            blackboard,
            pending: VecDeque::from([TaskRef::Compound(root)]),
            stack: Vec::new(),
            tasks: Vec::new(),
            effects: Vec::new(),
            btr: BranchTraversalRecord::new(),
            branch_cursor: 0,
            expansions: 0,
        }
    }

    /// Depth of the backtracking stack.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// The job's private blackboard as of the last resume.
    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn expansions(&self) -> usize {
        self.expansions
    }

    fn expand_compound(&mut self, idx: CompoundIdx) -> bool {
        let domain = Arc::clone(&self.domain);
        let compound = domain.compound(idx);
        let start = std::mem::take(&mut self.branch_cursor);

        if self.stack.len() >= self.config.max_depth {
            tracing::debug!(
                compound = %compound.id(),
                max_depth = self.config.max_depth,
                "htn decomposition too deep, backtracking"
            );
            return false;
        }

        let selected = compound
            .branches()
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, branch)| all_met(branch.preconditions(), &self.blackboard, compound.id()))
            .map(|(i, _)| i);

        let Some(branch) = selected else {
            tracing::trace!(compound = %compound.id(), start, "no satisfiable branch");
            return false;
        };

        self.stack.push(DecompositionState {
            blackboard: self.blackboard.snapshot(),
            compound: idx,
            branch,
            pending: self.pending.clone(),
            plan_len: self.tasks.len(),
            btr_len: self.btr.len(),
        });
        self.btr.push(branch);
        for task in domain.branch_tasks(idx, branch).iter().rev() {
            self.pending.push_front(*task);
        }
        true
    }

    fn apply_primitive(&mut self, idx: PrimitiveIdx) -> bool {
        let domain = Arc::clone(&self.domain);
        let primitive = domain.primitive(idx);
        if !all_met(primitive.preconditions(), &self.blackboard, primitive.id()) {
            return false;
        }

        let effects = primitive.operator().plan_update(&self.blackboard);
        if let Some(effects) = effects.as_ref() {
            self.blackboard.apply(effects);
        }
        self.tasks.push(idx);
        self.effects.push(effects);
        true
    }

    /// Roll back to the most recent compound entry and retry it from its next branch.
    fn backtrack(&mut self) -> bool {
        let Some(state) = self.stack.pop() else {
            return false;
        };

        self.tasks.truncate(state.plan_len);
        self.effects.truncate(state.plan_len);
        self.btr.truncate(state.btr_len);
        self.blackboard = state.blackboard;
        self.pending = state.pending;
        self.pending.push_front(TaskRef::Compound(state.compound));
        self.branch_cursor = state.branch + 1;
        true
    }

    fn finish(&mut self, success: bool) -> PlanOutcome {
        let plan = success.then(|| {
            let tasks = self
                .tasks
                .iter()
                .map(|idx| Arc::clone(self.domain.primitive(*idx)))
                .collect();
            HtnPlan::new(
                tasks,
                std::mem::take(&mut self.effects),
                std::mem::take(&mut self.btr),
            )
        });
        if !success {
            self.stack.clear();
        }
        PlanOutcome {
            plan,
            expansions: self.expansions,
        }
    }
}

impl Job for PlanningJob {
    type Output = PlanOutcome;

    fn resume(&mut self, slice: &mut TimeSlice) -> JobPoll<PlanOutcome> {
        while let Some(task) = self.pending.front().copied() {
            if let TaskRef::Compound(_) = task {
                if slice.should_yield() {
                    return JobPoll::Pending;
                }
                slice.note_step();
            }
            self.pending.pop_front();

            self.expansions = self.expansions.saturating_add(1);
            if let Some(max_expansions) = self.config.max_expansions {
                if self.expansions > max_expansions {
                    tracing::warn!(max_expansions, "htn decomposition exceeded its expansion limit");
                    return JobPoll::Ready(self.finish(false));
                }
            }

            let progressed = match task {
                TaskRef::Compound(idx) => self.expand_compound(idx),
                TaskRef::Primitive(idx) => self.apply_primitive(idx),
            };
            if !progressed && !self.backtrack() {
                return JobPoll::Ready(self.finish(false));
            }
        }

        JobPoll::Ready(self.finish(true))
    }
}

/// Entry point for building planning jobs against one task network.
#[derive(Debug, Clone)]
pub struct HtnPlanner {
    domain: Arc<TaskDomain>,
    config: HtnPlannerConfig,
}

impl HtnPlanner {
    pub fn new(domain: Arc<TaskDomain>) -> Self {
        Self {
            domain,
            config: HtnPlannerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: HtnPlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn domain(&self) -> &Arc<TaskDomain> {
        &self.domain
    }

    /// Build a job that decomposes `root` against a snapshot of `blackboard`.
    pub fn job(&self, root: &str, blackboard: &Blackboard) -> Result<PlanningJob, HtnError> {
        let root = match self.domain.lookup(root) {
            Some(TaskRef::Compound(idx)) => idx,
            Some(TaskRef::Primitive(_)) => return Err(HtnError::RootNotCompound(TaskId::from(root))),
            None => return Err(HtnError::UnknownRootTask(TaskId::from(root))),
        };
        Ok(PlanningJob::new(
            Arc::clone(&self.domain),
            root,
            blackboard.snapshot(),
            self.config,
        ))
    }

    /// Plan synchronously. The caller's blackboard is never modified.
    pub fn plan(&self, root: &str, blackboard: &Blackboard) -> Result<Option<HtnPlan>, HtnError> {
        let job = self.job(root, blackboard)?;
        Ok(run_to_completion(job).plan)
    }
}
