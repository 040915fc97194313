use std::sync::Arc;

use ai_core::{run_to_completion, Blackboard, JobQueue, JobStatus, SliceBudget};
use ai_htn::{
    Branch, CompoundTask, HtnOperator, HtnPlanner, OperatorStatus, PrimitiveTask, TaskDefinitions,
};

#[derive(Debug)]
struct Noop;

impl HtnOperator for Noop {
    fn update(&self, _blackboard: &mut Blackboard, _dt_seconds: f32) -> OperatorStatus {
        OperatorStatus::Finished
    }
}

/// Root -> [L0, L1, L2, L3], each layer a compound wrapping one primitive.
fn layered_planner() -> HtnPlanner {
    let mut defs = TaskDefinitions::new();
    let mut root = Branch::new();
    for layer in 0..4 {
        let step = format!("Step{layer}");
        let compound = format!("L{layer}");
        defs.add_primitive(PrimitiveTask::new(step.as_str(), Noop))
            .add_compound(CompoundTask::new(compound.as_str()).with_branch(Branch::new().with_task(step)));
        root = root.with_task(compound);
    }
    defs.add_compound(CompoundTask::new("Root").with_branch(root));
    HtnPlanner::new(Arc::new(defs.resolve()))
}

#[test]
fn step_budget_suspends_once_per_compound() {
    let planner = layered_planner();
    let mut queue = JobQueue::default();
    let handle = queue.enqueue(
        planner.job("Root", &Blackboard::new()).unwrap(),
        SliceBudget::from_steps(1),
    );

    // Five compounds, one per resume.
    for _ in 0..4 {
        assert_eq!(queue.process(), 1);
        assert_eq!(handle.status(), JobStatus::Pending);
    }
    queue.process();
    assert_eq!(handle.status(), JobStatus::Finished);
    assert!(queue.is_empty());

    let sliced = handle.take_result().and_then(|o| o.plan).expect("plan");
    let whole = run_to_completion(planner.job("Root", &Blackboard::new()).unwrap())
        .plan
        .expect("plan");
    assert_eq!(
        sliced.task_ids().collect::<Vec<_>>(),
        whole.task_ids().collect::<Vec<_>>()
    );
    assert_eq!(sliced.btr(), whole.btr());
    assert_eq!(sliced.btr().as_slice(), &[0, 0, 0, 0, 0]);
}

#[test]
fn cancelled_job_is_dropped_without_a_result() {
    let planner = layered_planner();
    let mut queue = JobQueue::default();
    let handle = queue.enqueue(
        planner.job("Root", &Blackboard::new()).unwrap(),
        SliceBudget::from_steps(1),
    );

    queue.process();
    handle.cancel();
    assert_eq!(handle.status(), JobStatus::Cancelled);

    assert_eq!(queue.process(), 0);
    assert!(queue.is_empty());
    assert!(handle.take_result().is_none());
}

#[test]
fn planning_job_works_on_its_own_snapshot() {
    use ai_core::{BbKey, Effects};

    const LOOT: BbKey<u32> = BbKey::new("loot");

    #[derive(Debug)]
    struct Pickup;

    impl HtnOperator for Pickup {
        fn plan_update(&self, blackboard: &Blackboard) -> Option<Effects> {
            let loot = blackboard.get(LOOT).copied().unwrap_or(0);
            Some(Effects::new().with(LOOT, loot + 1))
        }

        fn update(&self, _blackboard: &mut Blackboard, _dt_seconds: f32) -> OperatorStatus {
            OperatorStatus::Finished
        }
    }

    let mut defs = TaskDefinitions::new();
    defs.add_primitive(PrimitiveTask::new("Pickup", Pickup))
        .add_compound(
            CompoundTask::new("Root").with_branch(Branch::new().with_tasks(["Pickup", "Pickup"])),
        );
    let planner = HtnPlanner::new(Arc::new(defs.resolve()));

    let mut live = Blackboard::new();
    live.set(LOOT, 1);
    let mut job = planner.job("Root", &live).unwrap();

    // Writes to the live blackboard after submission stay invisible to the job.
    live.set(LOOT, 100);
    let mut slice = ai_core::TimeSlice::new(SliceBudget::unbounded());
    let plan = match ai_core::Job::resume(&mut job, &mut slice) {
        ai_core::JobPoll::Ready(outcome) => outcome.plan.expect("plan"),
        ai_core::JobPoll::Pending => panic!("unbounded slice should finish"),
    };

    assert_eq!(job.blackboard().get(LOOT), Some(&3));
    assert_eq!(plan.effects()[1].as_ref().and_then(|e| e.get(LOOT)), Some(&3));
    assert_eq!(live.get(LOOT), Some(&100));
}
