//! Query Execution Context (C5, §4.5): the per-request object exposed
//! to SQL templates and imperative models.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use marten_core::capability::User;
use marten_core::text_value::PlaceholderScope;
use marten_params::ParameterSet;

/// §4.5: `prms`, `configurables`, `user`, and (only during SQL
/// rendering) `ref`. `ref`'s dependency set is local to one compilation
/// frame (§9: "not as global state") — the executor drains it right
/// after compiling each node.
///
/// The user is held as `Arc<dyn User>` rather than a generic type
/// parameter: this context is shared, as-is, between `Dag::build`
/// (template rendering) and `Dag::execute` (imperative model calls),
/// and an `ImperativeModel` trait object can't take a generic
/// `ctx: &QueryExecutionContext<U>` — the method would no longer be
/// object-safe.
#[derive(Clone)]
pub struct QueryExecutionContext {
    pub prms: ParameterSet,
    configurables: HashMap<String, String>,
    pub user: Option<Arc<dyn User>>,
    /// Populated by `ref()` calls during the node currently being
    /// rendered; drained by the compiler after each render. `Arc`-wrapped
    /// so the template engine's function closure (which must be
    /// `'static`) can hold a handle onto it without borrowing `self`.
    referenced: Arc<Mutex<Vec<String>>>,
}

impl QueryExecutionContext {
    pub fn new(prms: ParameterSet, configurables: HashMap<String, String>, user: Option<Arc<dyn User>>) -> Self {
        QueryExecutionContext {
            prms,
            configurables,
            user,
            referenced: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn configurable(&self, name: &str) -> Option<&str> {
        self.configurables.get(name).map(String::as_str)
    }

    /// A cloneable handle onto this context's per-render dependency set,
    /// for a template engine function closure to capture without
    /// borrowing `self` (§4.4, §9: "local to the compilation frame ...
    /// not as global state" — the handle is still per-context, just
    /// `'static`-capturable).
    pub fn ref_sink(&self) -> Arc<Mutex<Vec<String>>> {
        self.referenced.clone()
    }

    /// Drains and returns the dependency set recorded by `ref()` calls
    /// since the last drain, for the compiler to turn into DAG edges.
    pub fn take_referenced(&self) -> Vec<String> {
        std::mem::take(&mut *self.referenced.lock().expect("referenced lock poisoned"))
    }

    /// §4.5, §9: a fresh, single-query-scoped placeholder sink. Values
    /// bound here never leak into another node's query.
    pub fn new_placeholder_scope(&self) -> PlaceholderScope {
        PlaceholderScope::new()
    }
}
