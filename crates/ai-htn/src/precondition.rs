use std::fmt;
use std::sync::Arc;

use ai_core::{BbKey, Blackboard, BlackboardError};
use thiserror::Error;

use crate::TaskId;

#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error(transparent)]
    Blackboard(#[from] BlackboardError),

    #[error("{0}")]
    Other(String),
}

/// A side-effect free predicate over a blackboard.
///
/// Whatever services a precondition needs are handed to its constructor by whoever builds the
/// task definitions. An `Err` is treated by the planner exactly like `Ok(false)`.
pub trait Precondition: Send + Sync + fmt::Debug {
    fn is_met(&self, blackboard: &Blackboard) -> Result<bool, PreconditionError>;
}

/// Left-to-right, short-circuiting evaluation; errors count as unsatisfied.
pub(crate) fn all_met(
    preconditions: &[Arc<dyn Precondition>],
    blackboard: &Blackboard,
    owner: &TaskId,
) -> bool {
    preconditions.iter().all(|precondition| {
        match precondition.is_met(blackboard) {
            Ok(met) => met,
            Err(err) => {
                tracing::debug!(
                    task = %owner,
                    precondition = ?precondition,
                    error = %err,
                    "precondition errored, treating as unsatisfied"
                );
                false
            }
        }
    })
}

/// Holds when `key` is present and equal to `expected`.
#[derive(Debug, Clone)]
pub struct KeyEquals<T: 'static> {
    key: BbKey<T>,
    expected: T,
}

impl<T> KeyEquals<T>
where
    T: PartialEq + fmt::Debug + Send + Sync + 'static,
{
    pub fn new(key: BbKey<T>, expected: T) -> Self {
        Self { key, expected }
    }
}

impl<T> Precondition for KeyEquals<T>
where
    T: PartialEq + fmt::Debug + Send + Sync + 'static,
{
    fn is_met(&self, blackboard: &Blackboard) -> Result<bool, PreconditionError> {
        Ok(blackboard.try_get(self.key)? == Some(&self.expected))
    }
}

/// Holds when the blackboard has any value under `key`.
#[derive(Debug, Clone)]
pub struct KeyExists(pub &'static str);

impl Precondition for KeyExists {
    fn is_met(&self, blackboard: &Blackboard) -> Result<bool, PreconditionError> {
        Ok(blackboard.contains_key(self.0))
    }
}

#[derive(Debug, Clone)]
pub struct Not(pub Arc<dyn Precondition>);

impl Not {
    pub fn new(inner: impl Precondition + 'static) -> Self {
        Self(Arc::new(inner))
    }
}

impl Precondition for Not {
    fn is_met(&self, blackboard: &Blackboard) -> Result<bool, PreconditionError> {
        Ok(!self.0.is_met(blackboard)?)
    }
}

/// A named predicate backed by a plain function.
#[derive(Clone, Copy)]
pub struct FnPrecondition {
    name: &'static str,
    check: fn(&Blackboard) -> Result<bool, PreconditionError>,
}

impl FnPrecondition {
    pub fn new(name: &'static str, check: fn(&Blackboard) -> Result<bool, PreconditionError>) -> Self {
        Self { name, check }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for FnPrecondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnPrecondition").field(&self.name).finish()
    }
}

impl Precondition for FnPrecondition {
    fn is_met(&self, blackboard: &Blackboard) -> Result<bool, PreconditionError> {
        (self.check)(blackboard)
    }
}
