use core::fmt::Debug;

/// Stable identifier for an agent.
///
/// Deterministic simulation requires:
/// - stable ordering (`Ord`)
/// - a stable numeric ID (`stable_id`) for logs and trace events
pub trait AgentId: Copy + Ord + Eq + Debug {
    fn stable_id(self) -> u64;
}

impl AgentId for u64 {
    fn stable_id(self) -> u64 {
        self
    }
}

impl AgentId for u32 {
    fn stable_id(self) -> u64 {
        self as u64
    }
}

impl AgentId for usize {
    fn stable_id(self) -> u64 {
        self as u64
    }
}

/// Order `(agent, state)` pairs by stable id so per-tick work never depends on storage order.
pub fn sort_by_stable_id<A: AgentId, T>(agents: &mut [(A, T)]) {
    agents.sort_by_key(|(agent, _)| agent.stable_id());
}
