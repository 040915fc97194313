use ai_core::{BbKey, Blackboard, Effects, TickContext};
use ai_htn::{
    Branch, CompoundTask, HtnConfig, HtnOperator, HtnSystem, KeyExists, OperatorStatus,
    PrimitiveTask, TaskDefinitions,
};
use ai_tools::{TraceLog, TRACE_LOG};
use tracing_subscriber::{fmt, EnvFilter};

const ENEMY: BbKey<bool> = BbKey::new("enemy");
const ARRIVED: BbKey<bool> = BbKey::new("arrived");

#[derive(Debug)]
struct MoveToEnemy;

impl HtnOperator for MoveToEnemy {
    fn plan_update(&self, _blackboard: &Blackboard) -> Option<Effects> {
        Some(Effects::new().with(ARRIVED, true))
    }

    fn update(&self, _blackboard: &mut Blackboard, _dt_seconds: f32) -> OperatorStatus {
        OperatorStatus::Finished
    }
}

#[derive(Debug)]
struct Shoot;

impl HtnOperator for Shoot {
    fn update(&self, blackboard: &mut Blackboard, _dt_seconds: f32) -> OperatorStatus {
        blackboard.remove(ENEMY);
        OperatorStatus::Finished
    }
}

#[derive(Debug)]
struct Idle;

impl HtnOperator for Idle {
    fn update(&self, _blackboard: &mut Blackboard, _dt_seconds: f32) -> OperatorStatus {
        OperatorStatus::Continuing
    }
}

fn definitions() -> TaskDefinitions {
    let mut defs = TaskDefinitions::new();
    defs.add_primitive(PrimitiveTask::new("MoveToEnemy", MoveToEnemy))
        .add_primitive(PrimitiveTask::new("Shoot", Shoot).with_precondition(KeyExists("arrived")))
        .add_primitive(PrimitiveTask::new("Idle", Idle))
        .add_compound(
            CompoundTask::new("Guard")
                .with_branch(
                    Branch::new()
                        .with_precondition(KeyExists("enemy"))
                        .with_tasks(["MoveToEnemy", "Shoot"]),
                )
                .with_branch(Branch::new().with_task("Idle")),
        );
    defs
}

fn main() {
    fmt()
        .with_env_filter(EnvFilter::new("ai_htn=debug"))
        .with_target(false)
        .init();

    let mut system = HtnSystem::from_definitions(&definitions(), HtnConfig::default());
    let mut agent = system.spawn_agent("Guard");
    agent.blackboard_mut().set(TRACE_LOG, TraceLog::default());

    if let Ok(text) = system.describe_domain("Guard") {
        print!("{text}");
    }

    let mut ctx = TickContext::new(0, 0.1);
    for tick in 0..12u64 {
        if tick == 4 {
            agent.blackboard_mut().set(ENEMY, true);
            agent.replan();
        }
        system.update(&ctx, [(1u64, &mut agent)]);
        ctx = ctx.next();
    }

    if let Some(log) = agent.blackboard().get(TRACE_LOG) {
        for e in &log.events {
            println!("[tick={}] {} a={} b={}", e.tick, e.tag, e.a, e.b);
        }
    }
}
