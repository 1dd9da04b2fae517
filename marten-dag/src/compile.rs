//! §4.4 compilation: SQL template rendering (exposing `ref`, project and
//! environment variables, resolved parameters, the user, configurables)
//! and imperative dependency discovery.

use std::collections::HashMap;

use minijinja::{context, Environment};

use crate::context::QueryExecutionContext;
use crate::error::DagError;
use crate::node::QueryArtifact;

/// §9 "Template rendering": a sandboxed render whose context is a
/// read-only record, with `ref` wired as a callback that mutates the
/// per-render dependency set on `ctx` rather than any global state.
pub fn compile_sql(
    model_name: &str,
    template: &str,
    ctx: &QueryExecutionContext,
    project_vars: &HashMap<String, String>,
    env_vars: &HashMap<String, String>,
) -> Result<(String, Vec<String>), DagError> {
    let mut env = Environment::new();
    env.add_template(model_name, template)
        .map_err(|e| DagError::execution(model_name, format!("template parse error: {e}")))?;

    // `ref(name)` returns the bare identifier and records the dependency
    // into `ctx`'s per-render sink; the environment is local to this
    // call, so the recorded set below is exactly this node's references.
    let ref_sink = ctx.ref_sink();
    env.add_function("ref", move |name: String| -> String {
        ref_sink.lock().expect("ref sink poisoned").push(name.clone());
        name
    });

    let prms_wire: HashMap<String, serde_json::Value> = ctx
        .prms
        .iter()
        .map(|p| (p.name().to_string(), p.to_wire()))
        .collect();
    let user_wire = ctx.user.as_ref().map(|u| {
        serde_json::json!({
            "identity": u.identity(),
            "access_level": u.access_level(),
        })
    });

    let tmpl = env
        .get_template(model_name)
        .map_err(|e| DagError::execution(model_name, format!("template lookup error: {e}")))?;
    let rendered = tmpl
        .render(context! {
            vars => project_vars,
            env => env_vars,
            prms => prms_wire,
            user => user_wire,
        })
        .map_err(|e| DagError::execution(model_name, format!("template render error: {e}")))?;

    let referenced = ctx.take_referenced();
    Ok((rendered, referenced))
}

/// §4.4: imperative dependency discovery, invoking the model's declared
/// `dependencies(ctx)` callable.
pub fn discover_imperative_dependencies(
    artifact: &QueryArtifact,
    ctx: &QueryExecutionContext,
) -> Vec<String> {
    match artifact {
        QueryArtifact::Imperative(model) => model.dependencies(ctx),
        QueryArtifact::Sql(_) => Vec::new(),
    }
}
