use std::sync::Arc;

use ai_core::Blackboard;
use ai_htn::{
    describe_domain, describe_plan, Branch, CompoundTask, HtnError, HtnOperator, HtnPlanner,
    KeyExists, OperatorStatus, PrimitiveTask, TaskDefinitions, TaskLibrary, TaskRef,
};

#[derive(Debug)]
struct Noop;

impl HtnOperator for Noop {
    fn update(&self, _blackboard: &mut Blackboard, _dt_seconds: f32) -> OperatorStatus {
        OperatorStatus::Finished
    }
}

fn patrol_definitions() -> TaskDefinitions {
    let mut defs = TaskDefinitions::new();
    defs.add_primitive(PrimitiveTask::new("MoveTo", Noop))
        .add_primitive(PrimitiveTask::new("Shoot", Noop))
        .add_primitive(PrimitiveTask::new("Idle", Noop))
        .add_compound(
            CompoundTask::new("Combat")
                .with_branch(
                    Branch::new()
                        .with_precondition(KeyExists("enemy"))
                        .with_tasks(["MoveTo", "Shoot"]),
                )
                .with_branch(Branch::new().with_task("Idle")),
        )
        .add_compound(
            CompoundTask::new("Root").with_branch(Branch::new().with_tasks(["Combat", "Idle"])),
        );
    defs
}

#[test]
fn compound_definitions_shadow_primitives_with_the_same_id() {
    let mut defs = TaskDefinitions::new();
    defs.add_primitive(PrimitiveTask::new("Work", Noop))
        .add_primitive(PrimitiveTask::new("Rest", Noop))
        .add_compound(CompoundTask::new("Work").with_branch(Branch::new().with_task("Rest")))
        .add_compound(CompoundTask::new("Root").with_branch(Branch::new().with_task("Work")));

    let domain = defs.resolve();
    assert!(matches!(domain.lookup("Work"), Some(TaskRef::Compound(_))));
    assert!(matches!(domain.lookup("Rest"), Some(TaskRef::Primitive(_))));

    let plan = HtnPlanner::new(Arc::new(domain))
        .plan("Root", &Blackboard::new())
        .unwrap()
        .expect("plan");
    assert_eq!(plan.task_ids().collect::<Vec<_>>(), ["Rest"]);
    assert_eq!(plan.btr().as_slice(), &[0, 0]);
}

#[test]
fn unknown_subtasks_are_reported_and_skipped() {
    let mut defs = TaskDefinitions::new();
    defs.add_primitive(PrimitiveTask::new("A", Noop))
        .add_compound(CompoundTask::new("Root").with_branch(Branch::new().with_tasks(["A", "Ghost"])));

    let domain = defs.resolve();
    assert_eq!(domain.unresolved().len(), 1);
    assert_eq!(domain.unresolved()[0].task.as_str(), "Ghost");
    assert_eq!(domain.unresolved()[0].compound.as_str(), "Root");
    assert_eq!(domain.unresolved()[0].branch, 0);

    let plan = HtnPlanner::new(Arc::new(domain))
        .plan("Root", &Blackboard::new())
        .unwrap()
        .expect("plan");
    assert_eq!(plan.task_ids().collect::<Vec<_>>(), ["A"]);
}

#[test]
fn library_reload_swaps_the_domain_and_bumps_generation() {
    let library = TaskLibrary::from_definitions(&patrol_definitions());
    let (before, generation) = library.current_with_generation();
    assert_eq!(generation, 0);
    assert_eq!(before.compound_count(), 2);

    let mut next = TaskDefinitions::new();
    next.add_compound(CompoundTask::new("Root").with_branch(Branch::new()));
    assert_eq!(library.reload(&next), 1);

    assert_eq!(library.generation(), 1);
    assert_eq!(library.current().compound_count(), 1);
    // Holders of the old domain keep it intact.
    assert_eq!(before.primitive_count(), 3);
}

#[test]
fn describe_domain_lists_every_branch() {
    let domain = patrol_definitions().resolve();
    let text = describe_domain(&domain, "Root").unwrap();

    let expected = "\
Compound Root
  branch 0
    Compound Combat
      branch 0
        Primitive MoveTo (Noop)
        Primitive Shoot (Noop)
      branch 1
        Primitive Idle (Noop)
    Primitive Idle (Noop)
";
    assert_eq!(text, expected);
}

#[test]
fn describe_domain_marks_recursion() {
    let mut defs = TaskDefinitions::new();
    defs.add_primitive(PrimitiveTask::new("Step", Noop))
        .add_compound(CompoundTask::new("Root").with_branch(Branch::new().with_tasks(["Step", "Root"])));

    let text = describe_domain(&defs.resolve(), "Root").unwrap();
    assert!(text.contains("    Compound Root (recursive)\n"));
}

#[test]
fn describe_domain_rejects_bad_roots() {
    let domain = patrol_definitions().resolve();
    assert!(matches!(
        describe_domain(&domain, "Nope"),
        Err(HtnError::UnknownRootTask(_))
    ));
    assert!(matches!(
        describe_domain(&domain, "Idle"),
        Err(HtnError::RootNotCompound(_))
    ));
}

#[test]
fn describe_plan_replays_the_branch_traversal_record() {
    let domain = Arc::new(patrol_definitions().resolve());
    let mut bb = Blackboard::new();
    bb.set(ai_core::BbKey::<bool>::new("enemy"), true);

    let mut plan = HtnPlanner::new(Arc::clone(&domain))
        .plan("Root", &bb)
        .unwrap()
        .expect("plan");
    assert!(plan.advance());

    let text = describe_plan(&domain, "Root", &plan).unwrap();
    let expected = "\
BTR: 0, 0
Compound Root (branch 0)
  Compound Combat (branch 0)
    Primitive MoveTo
    Primitive Shoot <-
  Primitive Idle
";
    assert_eq!(text, expected);
}
