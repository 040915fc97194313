use std::any::Any;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlackboardError {
    #[error("blackboard type mismatch for key `{key}` (stored {stored}, requested {requested})")]
    TypeMismatch {
        key: String,
        stored: &'static str,
        requested: &'static str,
    },
}

/// Typed handle for a named blackboard entry.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbKey<T: 'static> {
    name: &'static str,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _phantom: PhantomData,
        }
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}

/// Anything that can live on a blackboard.
///
/// Values are cloned when a blackboard is snapshotted. Store shared handles (`Arc<_>`, entity
/// ids) rather than large owned structures so a snapshot stays shallow.
pub trait BlackboardValue: Any + Send + Sync + fmt::Debug {
    fn clone_value(&self) -> Box<dyn BlackboardValue>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn type_name(&self) -> &'static str;
}

impl<T> BlackboardValue for T
where
    T: Any + Clone + Send + Sync + fmt::Debug,
{
    fn clone_value(&self) -> Box<dyn BlackboardValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A dynamically typed blackboard value.
#[derive(Debug)]
pub struct BbValue(Box<dyn BlackboardValue>);

impl BbValue {
    pub fn new<T: BlackboardValue>(value: T) -> Self {
        Self(Box::new(value))
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.0.as_any().is::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.0.as_any_mut().downcast_mut::<T>()
    }

    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        if !self.is::<T>() {
            return Err(self);
        }
        match self.0.into_any().downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => unreachable!("type checked above"),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.0.type_name()
    }
}

impl Clone for BbValue {
    fn clone(&self) -> Self {
        Self(self.0.clone_value())
    }
}

fn mismatch<T: 'static>(key: &str, stored: &BbValue) -> BlackboardError {
    BlackboardError::TypeMismatch {
        key: key.to_string(),
        stored: stored.type_name(),
        requested: std::any::type_name::<T>(),
    }
}

/// Plan-time writes captured for one primitive task.
#[derive(Debug, Clone, Default)]
pub struct Effects {
    values: BTreeMap<String, BbValue>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: BlackboardValue>(&mut self, key: BbKey<T>, value: T) {
        self.values.insert(key.name.to_string(), BbValue::new(value));
    }

    pub fn with<T: BlackboardValue>(mut self, key: BbKey<T>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert_value(&mut self, key: impl Into<String>, value: BbValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get<T: 'static>(&self, key: BbKey<T>) -> Option<&T> {
        self.values.get(key.name)?.downcast_ref::<T>()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, BbValue> {
        self.values.iter()
    }
}

/// Per-agent key/value view of the world.
///
/// `Clone` is a shallow snapshot: the map is copied and every value is cloned, so writes to the
/// snapshot never reach the original.
#[derive(Debug, Clone, Default)]
pub struct Blackboard {
    values: BTreeMap<String, BbValue>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn contains<T: 'static>(&self, key: BbKey<T>) -> bool {
        self.values.contains_key(key.name)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(|k| k.as_str())
    }

    pub fn set<T: BlackboardValue>(&mut self, key: BbKey<T>, value: T) {
        self.values.insert(key.name.to_string(), BbValue::new(value));
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: BbValue) {
        self.values.insert(key.into(), value);
    }

    pub fn value(&self, key: &str) -> Option<&BbValue> {
        self.values.get(key)
    }

    pub fn try_get<T: 'static>(&self, key: BbKey<T>) -> Result<Option<&T>, BlackboardError> {
        let Some(value) = self.values.get(key.name) else {
            return Ok(None);
        };
        value
            .downcast_ref::<T>()
            .map(Some)
            .ok_or_else(|| mismatch::<T>(key.name, value))
    }

    pub fn get<T: 'static>(&self, key: BbKey<T>) -> Option<&T> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn get_mut<T: 'static>(&mut self, key: BbKey<T>) -> Option<&mut T> {
        let value = self.values.get_mut(key.name)?;
        if !value.is::<T>() {
            panic!("{}", mismatch::<T>(key.name, value));
        }
        value.downcast_mut::<T>()
    }

    pub fn remove<T: 'static>(&mut self, key: BbKey<T>) -> Option<T> {
        let value = self.values.remove(key.name)?;
        match value.downcast::<T>() {
            Ok(value) => Some(value),
            Err(value) => panic!("{}", mismatch::<T>(key.name, &value)),
        }
    }

    /// Copy every captured effect onto this blackboard, overwriting existing entries.
    pub fn apply(&mut self, effects: &Effects) {
        for (key, value) in effects.iter() {
            self.values.insert(key.clone(), value.clone());
        }
    }
}
