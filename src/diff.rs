//! Schema-driven planning.
//!
//! Computes the attribute-level changes between prior and proposed state
//! for one resource instance. Only attributes the schema enumerates take
//! part; a change to a force-new attribute marks the whole plan as
//! requiring replacement, which the host turns into destroy + create.

use serde_json::Value;

use crate::schema::Schema;
use crate::types::{AttributeChange, PlanResult};

/// Plan the transition from `prior` to `proposed`.
///
/// `prior` of `None` plans a create; a null `proposed` plans a destroy.
/// Defaults are filled in and normalization applied before comparison, so
/// vendor-normalized values ("West US" vs "westus") never produce a diff.
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    if proposed.is_null() {
        return match prior {
            Some(prior) if !prior.is_null() => destroy_plan(schema, prior),
            _ => PlanResult::no_change(Value::Null),
        };
    }

    let mut planned = proposed.clone();
    schema.apply_defaults(&mut planned);
    normalize(schema, &mut planned);

    match prior {
        None => create_plan(schema, planned),
        Some(prior) if prior.is_null() => create_plan(schema, planned),
        Some(prior) => update_plan(schema, prior, planned),
    }
}

/// Apply attribute state functions to a configuration in place.
fn normalize(schema: &Schema, config: &mut Value) {
    let Some(obj) = config.as_object_mut() else {
        return;
    };
    for (name, attr) in &schema.block.attributes {
        if attr.state_func.is_some() {
            if let Some(value) = obj.get(name) {
                let normalized = attr.normalize(value);
                obj.insert(name.clone(), normalized);
            }
        }
    }
}

fn non_null<'a>(value: Option<&'a Value>) -> Option<&'a Value> {
    value.filter(|v| !v.is_null())
}

fn create_plan(schema: &Schema, planned: Value) -> PlanResult {
    let mut changes = Vec::new();

    for name in schema
        .block
        .attributes
        .keys()
        .chain(schema.block.blocks.keys())
    {
        if let Some(value) = non_null(planned.get(name)) {
            changes.push(AttributeChange::added(name.clone(), value.clone()));
        }
    }
    changes.sort_by(|a, b| a.path.cmp(&b.path));

    PlanResult::with_changes(planned, changes, false)
}

fn destroy_plan(schema: &Schema, prior: &Value) -> PlanResult {
    let mut changes = Vec::new();

    for name in schema
        .block
        .attributes
        .keys()
        .chain(schema.block.blocks.keys())
    {
        if let Some(value) = non_null(prior.get(name)) {
            changes.push(AttributeChange::removed(name.clone(), value.clone()));
        }
    }
    changes.sort_by(|a, b| a.path.cmp(&b.path));

    PlanResult::with_changes(Value::Null, changes, false)
}

fn update_plan(schema: &Schema, prior: &Value, mut planned: Value) -> PlanResult {
    let mut changes = Vec::new();
    let mut requires_replace = false;
    // Computed values carried forward from prior state into the plan.
    let mut carry: Vec<(String, Value)> = Vec::new();

    for (name, attr) in &schema.block.attributes {
        let computed_only = attr.flags.computed && !attr.flags.optional && !attr.flags.required;
        let prior_value = non_null(prior.get(name)).map(|v| attr.normalize(v));
        let planned_value = non_null(planned.get(name)).cloned();

        if computed_only {
            // The user never sets these; keep whatever the last Read saw.
            if planned_value.is_none() {
                if let Some(value) = prior_value {
                    carry.push((name.clone(), value));
                }
            }
            continue;
        }

        match (prior_value, planned_value) {
            (None, None) => {},
            (None, Some(after)) => {
                if attr.force_new {
                    requires_replace = true;
                }
                changes.push(AttributeChange::added(name.clone(), after));
            },
            (Some(before), None) => {
                if attr.flags.computed {
                    // Optional+computed and absent from config: the
                    // service-chosen value stands.
                    carry.push((name.clone(), before));
                } else {
                    if attr.force_new {
                        requires_replace = true;
                    }
                    changes.push(AttributeChange::removed(name.clone(), before));
                }
            },
            (Some(before), Some(after)) => {
                if before != after {
                    if attr.force_new {
                        requires_replace = true;
                    }
                    changes.push(AttributeChange::modified(name.clone(), before, after));
                }
            },
        }
    }

    for name in schema.block.blocks.keys() {
        let prior_value = non_null(prior.get(name));
        let planned_value = non_null(planned.get(name));
        match (prior_value, planned_value) {
            (None, None) => {},
            (None, Some(after)) => {
                changes.push(AttributeChange::added(name.clone(), after.clone()));
            },
            (Some(before), None) => {
                changes.push(AttributeChange::removed(name.clone(), before.clone()));
            },
            (Some(before), Some(after)) => {
                if before != after {
                    changes.push(AttributeChange::modified(
                        name.clone(),
                        before.clone(),
                        after.clone(),
                    ));
                }
            },
        }
    }

    if changes.is_empty() {
        return PlanResult::no_change(prior.clone());
    }

    if let Some(obj) = planned.as_object_mut() {
        for (name, value) in carry {
            obj.entry(name).or_insert(value);
        }
    }
    changes.sort_by(|a, b| a.path.cmp(&b.path));

    PlanResult::with_changes(planned, changes, requires_replace)
}
