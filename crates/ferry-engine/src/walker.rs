//! Schema walker: derives a population plan from a content-type schema.
//!
//! The plan mirrors the schema's shape and marks which attributes a store
//! must fetch eagerly: media always, relations always (identifying fields
//! only), fragments and fragment unions recursively. Recursion is bounded
//! by a depth limit; past the limit the plan degrades to "fetch everything"
//! for the remaining subtree. That fallback bounds self-referential
//! fragment schemas but is not a cycle detector: schemas recursing past
//! the limit will under-populate.

use std::collections::BTreeMap;

use ferry_core::{Attribute, Error, FieldSelect, PopulationPlan, Result, SchemaRegistry};

/// Build the population plan for a content type.
pub fn build_plan(
    registry: &SchemaRegistry,
    type_name: &str,
    max_depth: usize,
) -> Result<PopulationPlan> {
    let schema = registry
        .content_type(type_name)
        .ok_or_else(|| Error::UnknownContentType(type_name.to_string()))?;
    Ok(plan_for_attributes(&schema.attributes, registry, max_depth))
}

fn plan_for_attributes(
    attributes: &BTreeMap<String, Attribute>,
    registry: &SchemaRegistry,
    depth: usize,
) -> PopulationPlan {
    let mut plan = PopulationPlan::default();
    for (name, attribute) in attributes {
        match attribute {
            // Scalars come back with the base row; nothing to populate.
            Attribute::Scalar => {}
            Attribute::Media { .. } => {
                plan.fields.insert(name.clone(), FieldSelect::Media);
            }
            Attribute::Relation { .. } => {
                plan.fields.insert(name.clone(), FieldSelect::RelationKeys);
            }
            Attribute::Fragment { fragment, .. } => {
                plan.fields
                    .insert(name.clone(), fragment_select(fragment, registry, depth));
            }
            Attribute::FragmentUnion { members } => {
                if depth == 0 {
                    plan.fields.insert(name.clone(), FieldSelect::All);
                    continue;
                }
                let mut per_member = BTreeMap::new();
                for member in members {
                    per_member.insert(member.clone(), fragment_select(member, registry, depth));
                }
                plan.fields.insert(name.clone(), FieldSelect::Union(per_member));
            }
        }
    }
    plan
}

fn fragment_select(fragment: &str, registry: &SchemaRegistry, depth: usize) -> FieldSelect {
    if depth == 0 {
        return FieldSelect::All;
    }
    match registry.fragment(fragment) {
        Some(schema) => FieldSelect::Fragment(plan_for_attributes(
            &schema.attributes,
            registry,
            depth - 1,
        )),
        // Fragment not in the registry: let the store fetch it whole
        // rather than guessing a shape.
        None => FieldSelect::All,
    }
}
