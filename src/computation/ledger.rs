//! ledger.rs
//! Per-call storage for bound values and the warnings recorded while binding them.

use crate::validation::Diagnostics;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

/// Why a validator did not pass cleanly without aborting the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A `Warn`-importance validator returned `passes = false`.
    Failed,
    /// The validator does not apply to the node's result type and was skipped.
    Inapplicable,
}

/// A non-fatal note recorded during execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationWarning {
    pub node: String,
    pub validator: String,
    pub kind: WarningKind,
    pub message: String,
    pub diagnostics: Diagnostics,
}

/// The outcome of a successful call.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExecutionReport {
    /// Exactly the requested outputs.
    pub outputs: HashMap<String, Value>,
    /// Warnings in plan order.
    pub warnings: Vec<ValidationWarning>,
}

/// The overrides in effect for one call: per-call values shadow the driver's
/// defaults. Read-only for the whole call.
#[derive(Debug, Clone, Copy)]
pub struct Overrides<'a> {
    call: &'a HashMap<String, Value>,
    defaults: &'a HashMap<String, Value>,
}

impl<'a> Overrides<'a> {
    pub fn new(call: &'a HashMap<String, Value>, defaults: &'a HashMap<String, Value>) -> Self {
        Self { call, defaults }
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.call.get(name).or_else(|| self.defaults.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.call.contains_key(name) || self.defaults.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'a str> + 'a {
        let (call, defaults) = (self.call, self.defaults);
        call.keys()
            .chain(defaults.keys().filter(move |k| !call.contains_key(*k)))
            .map(String::as_str)
    }
}

/// Dense storage of bound values, indexed by plan step.
///
/// Override values are borrowed, computed values are owned. Dropping the
/// ledger discards everything bound so far.
#[derive(Debug, Default)]
pub struct Ledger<'o> {
    values: Vec<Option<Cow<'o, Value>>>,
    warnings: Vec<ValidationWarning>,
}

impl<'o> Ledger<'o> {
    pub fn with_steps(count: usize) -> Self {
        let mut values = Vec::with_capacity(count);
        values.resize_with(count, || None);
        Self { values, warnings: Vec::new() }
    }

    #[inline(always)]
    pub fn get(&self, step: usize) -> Option<&Value> {
        self.values.get(step)?.as_deref()
    }

    #[inline(always)]
    pub fn insert(&mut self, step: usize, value: Cow<'o, Value>) {
        if step >= self.values.len() {
            self.values.resize_with(step + 1, || None);
        }
        self.values[step] = Some(value);
    }

    pub fn take(&mut self, step: usize) -> Option<Value> {
        self.values.get_mut(step)?.take().map(Cow::into_owned)
    }

    pub fn record(&mut self, warnings: impl IntoIterator<Item = ValidationWarning>) {
        self.warnings.extend(warnings);
    }

    pub fn into_warnings(self) -> Vec<ValidationWarning> {
        self.warnings
    }
}
