//! Human-readable dumps of task networks and running plans.

use std::fmt::Write as _;

use crate::{CompoundIdx, HtnError, HtnPlan, TaskDomain, TaskId, TaskRef};

const INDENT: &str = "  ";

fn root_compound(domain: &TaskDomain, root: &str) -> Result<CompoundIdx, HtnError> {
    match domain.lookup(root) {
        Some(TaskRef::Compound(idx)) => Ok(idx),
        Some(TaskRef::Primitive(_)) => Err(HtnError::RootNotCompound(TaskId::from(root))),
        None => Err(HtnError::UnknownRootTask(TaskId::from(root))),
    }
}

/// Every branch reachable from `root`, one task per line, indented by depth.
///
/// A compound that appears inside its own expansion is printed once more and marked
/// `(recursive)` instead of being expanded again.
pub fn describe_domain(domain: &TaskDomain, root: &str) -> Result<String, HtnError> {
    let root = root_compound(domain, root)?;
    let mut out = String::new();
    let mut path = Vec::new();
    write_task(domain, TaskRef::Compound(root), 0, &mut path, &mut out);
    Ok(out)
}

fn write_task(
    domain: &TaskDomain,
    task: TaskRef,
    depth: usize,
    path: &mut Vec<CompoundIdx>,
    out: &mut String,
) {
    let pad = INDENT.repeat(depth);
    match task {
        TaskRef::Primitive(idx) => {
            let primitive = domain.primitive(idx);
            let _ = writeln!(
                out,
                "{pad}Primitive {} ({:?})",
                primitive.id(),
                primitive.operator()
            );
        }
        TaskRef::Compound(idx) => {
            let compound = domain.compound(idx);
            if path.contains(&idx) {
                let _ = writeln!(out, "{pad}Compound {} (recursive)", compound.id());
                return;
            }
            let _ = writeln!(out, "{pad}Compound {}", compound.id());

            path.push(idx);
            for branch in 0..compound.branches().len() {
                let _ = writeln!(out, "{pad}{INDENT}branch {branch}");
                for sub in domain.branch_tasks(idx, branch) {
                    write_task(domain, *sub, depth + 2, path, out);
                }
            }
            path.pop();
        }
    }
}

/// The plan's branch traversal record followed by the decomposition it describes, replayed from
/// `root`. The task under the execution cursor is marked with `<-`.
pub fn describe_plan(domain: &TaskDomain, root: &str, plan: &HtnPlan) -> Result<String, HtnError> {
    let root = root_compound(domain, root)?;
    let mut out = String::new();
    let _ = writeln!(out, "BTR: {}", plan.btr());

    let mut replay = Replay {
        domain,
        btr: plan.btr().as_slice(),
        next_branch: 0,
        next_primitive: 0,
        current: plan.index(),
        out: &mut out,
    };
    replay.task(TaskRef::Compound(root), 0);
    Ok(out)
}

struct Replay<'a> {
    domain: &'a TaskDomain,
    btr: &'a [usize],
    next_branch: usize,
    next_primitive: usize,
    current: usize,
    out: &'a mut String,
}

impl Replay<'_> {
    fn task(&mut self, task: TaskRef, depth: usize) {
        let pad = INDENT.repeat(depth);
        match task {
            TaskRef::Primitive(idx) => {
                let marker = if self.next_primitive == self.current {
                    " <-"
                } else {
                    ""
                };
                let _ = writeln!(
                    self.out,
                    "{pad}Primitive {}{marker}",
                    self.domain.primitive(idx).id()
                );
                self.next_primitive += 1;
            }
            TaskRef::Compound(idx) => {
                let compound = self.domain.compound(idx);
                let Some(branch) = self.btr.get(self.next_branch).copied() else {
                    let _ = writeln!(self.out, "{pad}Compound {} (not expanded)", compound.id());
                    return;
                };
                self.next_branch += 1;
                let _ = writeln!(self.out, "{pad}Compound {} (branch {branch})", compound.id());
                if branch >= compound.branches().len() {
                    return;
                }
                for sub in self.domain.branch_tasks(idx, branch) {
                    self.task(*sub, depth + 1);
                }
            }
        }
    }
}
