//! Per-tick execution of HTN plans.
//!
//! Every tick an agent:
//! 1. adopts the result of its finished planning job if it beats the running plan,
//! 2. requests a new plan when its cooldown has elapsed (one job in flight at most),
//! 3. steps the running operator, moving through as many instantly finished tasks as it can.

use std::sync::Arc;

use ai_core::{sort_by_stable_id, AgentId, Blackboard, JobHandle, JobQueue, JobStatus, TickContext};
use ai_tools::{emit as trace_emit, TraceEvent};

use crate::{
    describe_domain, HtnConfig, HtnError, HtnPlan, HtnPlanner, OperatorStatus, PlanOutcome,
    TaskDefinitions, TaskDomain, TaskId, TaskLibrary,
};

/// HTN state owned by one agent.
#[derive(Debug)]
pub struct HtnAgent {
    root: TaskId,
    blackboard: Blackboard,
    plan: Option<HtnPlan>,
    planning: Option<JobHandle<PlanOutcome>>,
    plan_accumulator: f32,
    plan_cooldown: f32,
    generation: u64,
}

impl HtnAgent {
    pub fn new(root: impl Into<TaskId>) -> Self {
        Self {
            root: root.into(),
            blackboard: Blackboard::new(),
            plan: None,
            planning: None,
            plan_accumulator: 0.0,
            plan_cooldown: HtnConfig::default().plan_cooldown_seconds,
            generation: 0,
        }
    }

    pub fn with_plan_cooldown(mut self, seconds: f32) -> Self {
        self.plan_cooldown = seconds.max(0.0);
        self
    }

    pub fn with_blackboard(mut self, blackboard: Blackboard) -> Self {
        self.blackboard = blackboard;
        self
    }

    pub fn root(&self) -> &TaskId {
        &self.root
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    pub fn plan(&self) -> Option<&HtnPlan> {
        self.plan.as_ref()
    }

    pub fn is_planning(&self) -> bool {
        self.planning.is_some()
    }

    /// Request a new plan on the next update, even while a plan is running.
    pub fn replan(&mut self) {
        self.plan_accumulator = 0.0;
    }

    /// Cancel the in-flight planning job, if any. The live blackboard is untouched.
    pub fn cancel_planning(&mut self) {
        if let Some(job) = self.planning.take() {
            job.cancel();
        }
    }

    /// Cancel planning and abandon the running plan, shutting its operator down as failed.
    /// Use when the agent's AI is disabled or the agent is about to be destroyed.
    pub fn stop(&mut self) {
        self.cancel_planning();
        self.abandon_plan(OperatorStatus::Failed);
    }

    fn abandon_plan(&mut self, status: OperatorStatus) {
        let Some(plan) = self.plan.take() else {
            return;
        };
        if let Some(task) = plan.current_task() {
            task.operator().shutdown(&mut self.blackboard, status);
        }
    }

    fn offer_plan(&mut self, ctx: &TickContext, agent: u64, plan: HtnPlan) {
        if let Some(current) = self.plan.as_ref() {
            if !plan.btr().is_better_than(current.btr()) {
                tracing::debug!(
                    agent,
                    running = %current.btr(),
                    candidate = %plan.btr(),
                    "keeping running htn plan"
                );
                trace_emit(
                    &mut self.blackboard,
                    TraceEvent::new(ctx.tick, "htn.plan.rejected").with_a(plan.len() as u64),
                );
                return;
            }
        }

        self.abandon_plan(OperatorStatus::BetterPlan);
        tracing::debug!(agent, btr = %plan.btr(), tasks = plan.len(), "adopting htn plan");
        trace_emit(
            &mut self.blackboard,
            TraceEvent::new(ctx.tick, "htn.plan.adopt")
                .with_a(plan.len() as u64)
                .with_b(plan.btr().len() as u64),
        );
        self.plan = Some(plan);
        self.start_current_task();
    }

    /// Start the task under the plan cursor, applying its captured effects first when asked to.
    fn start_current_task(&mut self) {
        let Some(plan) = self.plan.as_ref() else {
            return;
        };
        let Some(task) = plan.current_task().cloned() else {
            self.plan = None;
            return;
        };
        if task.apply_effects_on_startup() {
            if let Some(effects) = plan.current_effects() {
                self.blackboard.apply(effects);
            }
        }
        task.operator().startup(&mut self.blackboard);
    }

    fn execute(&mut self, ctx: &TickContext, agent: u64) {
        loop {
            let Some(plan) = self.plan.as_ref() else {
                return;
            };
            let index = plan.index();
            let Some(task) = plan.current_task().cloned() else {
                self.plan = None;
                return;
            };

            match task.operator().update(&mut self.blackboard, ctx.dt_seconds) {
                OperatorStatus::Continuing => return,
                OperatorStatus::Finished => {
                    task.operator()
                        .shutdown(&mut self.blackboard, OperatorStatus::Finished);
                    trace_emit(
                        &mut self.blackboard,
                        TraceEvent::new(ctx.tick, "htn.task.finished").with_a(index as u64),
                    );

                    let more = self.plan.as_mut().is_some_and(HtnPlan::advance);
                    if !more {
                        tracing::trace!(agent, "htn plan complete");
                        self.plan = None;
                        self.plan_accumulator = 0.0;
                        trace_emit(
                            &mut self.blackboard,
                            TraceEvent::new(ctx.tick, "htn.plan.complete"),
                        );
                        return;
                    }
                    self.start_current_task();
                }
                OperatorStatus::Failed | OperatorStatus::BetterPlan => {
                    task.operator()
                        .shutdown(&mut self.blackboard, OperatorStatus::Failed);
                    tracing::debug!(agent, task = %task.id(), "htn operator failed, dropping plan");
                    self.plan = None;
                    self.plan_accumulator = 0.0;
                    trace_emit(
                        &mut self.blackboard,
                        TraceEvent::new(ctx.tick, "htn.task.failed").with_a(index as u64),
                    );
                    return;
                }
            }
        }
    }
}

impl Drop for HtnAgent {
    fn drop(&mut self) {
        self.cancel_planning();
    }
}

/// Drives every [`HtnAgent`] and owns the shared planning queue.
#[derive(Debug)]
pub struct HtnSystem {
    library: Arc<TaskLibrary>,
    queue: JobQueue,
    config: HtnConfig,
}

impl HtnSystem {
    pub fn new(library: Arc<TaskLibrary>, config: HtnConfig) -> Self {
        Self {
            library,
            queue: JobQueue::new(config.queue_budget()),
            config,
        }
    }

    pub fn from_definitions(definitions: &TaskDefinitions, config: HtnConfig) -> Self {
        Self::new(Arc::new(TaskLibrary::from_definitions(definitions)), config)
    }

    pub fn library(&self) -> &Arc<TaskLibrary> {
        &self.library
    }

    pub fn config(&self) -> &HtnConfig {
        &self.config
    }

    pub fn pending_jobs(&self) -> usize {
        self.queue.len()
    }

    /// A new agent using this system's plan cooldown.
    pub fn spawn_agent(&self, root: impl Into<TaskId>) -> HtnAgent {
        HtnAgent::new(root).with_plan_cooldown(self.config.plan_cooldown_seconds)
    }

    /// Swap in new task definitions. Agents drop plans and jobs built from the old network on
    /// their next update.
    pub fn reload(&self, definitions: &TaskDefinitions) -> u64 {
        self.library.reload(definitions)
    }

    pub fn describe_domain(&self, root: &str) -> Result<String, HtnError> {
        describe_domain(&self.library.current(), root)
    }

    /// Advance planning work, then drive up to `max_updates_per_tick` agents in stable id order.
    /// Returns the number of agents driven.
    pub fn update<'a, A, I>(&mut self, ctx: &TickContext, agents: I) -> usize
    where
        A: AgentId,
        I: IntoIterator<Item = (A, &'a mut HtnAgent)>,
    {
        self.queue.process();

        let mut agents: Vec<(A, &'a mut HtnAgent)> = agents.into_iter().collect();
        sort_by_stable_id(&mut agents);

        let mut driven = 0usize;
        for (id, agent) in agents.into_iter().take(self.config.max_updates_per_tick) {
            self.drive(ctx, id.stable_id(), agent);
            driven += 1;
        }
        driven
    }

    fn drive(&mut self, ctx: &TickContext, id: u64, agent: &mut HtnAgent) {
        let (domain, generation) = self.library.current_with_generation();
        if agent.generation != generation {
            let stale = agent.plan.is_some() || agent.planning.is_some();
            agent.stop();
            agent.generation = generation;
            if stale {
                tracing::debug!(agent = id, generation, "dropping htn plan from an old task library");
                agent.plan_accumulator = 0.0;
                trace_emit(
                    &mut agent.blackboard,
                    TraceEvent::new(ctx.tick, "htn.plan.stale").with_a(generation),
                );
            }
        }

        self.poll_planning(ctx, id, agent);

        if agent.planning.is_none() {
            agent.plan_accumulator -= ctx.dt_seconds;
        }
        if agent.plan_accumulator <= 0.0 {
            self.request_plan(ctx, id, agent, domain);
        }

        agent.execute(ctx, id);
    }

    fn poll_planning(&mut self, ctx: &TickContext, id: u64, agent: &mut HtnAgent) {
        let Some(job) = agent.planning.as_ref() else {
            return;
        };
        let outcome = match job.status() {
            JobStatus::Pending => return,
            JobStatus::Cancelled => None,
            JobStatus::Finished => job.take_result(),
        };
        agent.planning = None;

        match outcome.and_then(|outcome| outcome.plan) {
            Some(plan) => agent.offer_plan(ctx, id, plan),
            None => {
                tracing::debug!(agent = id, root = %agent.root, "no htn plan found");
                trace_emit(
                    &mut agent.blackboard,
                    TraceEvent::new(ctx.tick, "htn.plan.none"),
                );
            }
        }
    }

    fn request_plan(
        &mut self,
        ctx: &TickContext,
        id: u64,
        agent: &mut HtnAgent,
        domain: Arc<TaskDomain>,
    ) {
        if agent.planning.is_some() {
            return;
        }
        agent.plan_accumulator += agent.plan_cooldown;

        let planner = HtnPlanner::new(domain).with_config(self.config.planner());
        match planner.job(agent.root.as_str(), &agent.blackboard) {
            Ok(job) => {
                agent.planning = Some(self.queue.enqueue(job, self.config.job_budget()));
                tracing::trace!(agent = id, root = %agent.root, "requested htn plan");
                trace_emit(
                    &mut agent.blackboard,
                    TraceEvent::new(ctx.tick, "htn.plan.request").with_a(self.queue.len() as u64),
                );
            }
            Err(err) => {
                tracing::error!(agent = id, error = %err, "unable to request htn plan");
            }
        }
    }
}
