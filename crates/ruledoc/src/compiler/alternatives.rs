//! Alternatives kind and conditional (`when`) expansion

use serde_json::Value;

use ruledoc_core::schema::{Schema, SchemaRef};

use super::{compile_node, dedup_schemas};
use crate::error::Result;
use crate::node::{MatchMode, NodeRef, SchemaNode};
use crate::registry::BuildContext;

/// Side-channel marker for branches whose own presence is required
pub const REQUIRED_MARKER: &str = "x-required";

/// Compile branch nodes, drop forbidden ones and collapse equal shapes.
///
/// A surviving shape is marked required when any node that produced it was.
fn compile_branches<'a>(
    nodes: impl IntoIterator<Item = &'a NodeRef>,
    ctx: &mut BuildContext,
) -> Result<Vec<SchemaRef>> {
    let mut compiled: Vec<(SchemaRef, bool)> = Vec::new();
    for node in nodes {
        let Some(schema) = compile_node(node, ctx, false)? else {
            continue;
        };
        let required = node.is_required();
        match compiled.iter_mut().find(|(existing, _)| *existing == schema) {
            Some((_, seen_required)) => *seen_required |= required,
            None => compiled.push((schema, required)),
        }
    }

    Ok(compiled
        .into_iter()
        .map(|(schema, required)| {
            if required {
                mark_required(schema)
            } else {
                schema
            }
        })
        .collect())
}

fn mark_required(schema: SchemaRef) -> SchemaRef {
    let mut schema = schema.into_schema();
    schema.set_extension(REQUIRED_MARKER, Value::Bool(true));
    SchemaRef::inline(schema)
}

pub(super) fn alternatives(node: &SchemaNode, ctx: &mut BuildContext) -> Result<Schema> {
    let candidates = compile_branches(&node.alternatives, ctx)?;
    let mut schema = Schema::default();
    if candidates.is_empty() {
        return Ok(schema);
    }
    match node.flags.match_mode {
        MatchMode::One => schema.one_of = Some(candidates),
        MatchMode::Any => schema.any_of = Some(candidates),
    }
    Ok(schema)
}

/// Expand every `when` clause of the node into `oneOf` (a single contributing
/// clause) or `anyOf` (several) on the already compiled schema. A combinator
/// the schema already carries is extended instead.
pub(super) fn merge_conditionals(
    node: &SchemaNode,
    schema: &mut Schema,
    ctx: &mut BuildContext,
) -> Result<()> {
    let mut branches: Vec<&NodeRef> = Vec::new();
    let mut contributing_clauses = 0;
    for conditional in &node.conditionals {
        let before = branches.len();
        branches.extend(conditional.branches());
        if branches.len() > before {
            contributing_clauses += 1;
        }
    }

    let expanded = compile_branches(branches, ctx)?;
    if expanded.is_empty() {
        return Ok(());
    }

    // An existing combinator absorbs the branches so the schema never
    // requires both `oneOf` and `anyOf` at once.
    let slot = if schema.one_of.is_some() {
        &mut schema.one_of
    } else if schema.any_of.is_some() || contributing_clauses > 1 {
        &mut schema.any_of
    } else {
        &mut schema.one_of
    };
    *slot = Some(match slot.take() {
        Some(mut existing) => {
            existing.extend(expanded);
            dedup_schemas(existing)
        }
        None => expanded,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::compiler::compile;
    use crate::node::{Conditional, MatchMode, Rule, SchemaNode};
    use crate::registry::BuildContext;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn render(node: &SchemaNode) -> Value {
        let mut ctx = BuildContext::default();
        serde_json::to_value(compile(Some(node), &mut ctx).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn alternatives_default_to_any_of() {
        let node = SchemaNode::alternatives()
            .try_node(SchemaNode::string())
            .try_node(SchemaNode::number().rule(Rule::Integer));
        assert_eq!(
            render(&node),
            json!({"anyOf": [{"type": "string"}, {"type": "integer"}]})
        );
    }

    #[test]
    fn alternatives_match_one_uses_one_of() {
        let node = SchemaNode::alternatives()
            .match_mode(MatchMode::One)
            .try_node(SchemaNode::string())
            .try_node(SchemaNode::boolean());
        assert_eq!(
            render(&node),
            json!({"oneOf": [{"type": "string"}, {"type": "boolean"}]})
        );
    }

    #[test]
    fn empty_alternatives_compile_to_empty_schema() {
        let node = SchemaNode::alternatives().try_node(SchemaNode::string().forbidden());
        assert_eq!(render(&node), json!({}));
    }

    #[test]
    fn single_when_clause_uses_one_of_and_marks_required_branch() {
        let node = SchemaNode::any().when(
            Conditional::when("kind")
                .then(SchemaNode::string().required())
                .otherwise(SchemaNode::number().rule(Rule::Integer)),
        );
        assert_eq!(
            render(&node),
            json!({
                "oneOf": [
                    {"type": "string", "x-required": true},
                    {"type": "integer"}
                ]
            })
        );
    }

    #[test]
    fn several_contributing_clauses_use_any_of() {
        let node = SchemaNode::any()
            .when(Conditional::when("a").then(SchemaNode::string()))
            .when(Conditional::when("b").then(SchemaNode::boolean()))
            .when(Conditional::when("c"));
        assert_eq!(
            render(&node),
            json!({"anyOf": [{"type": "string"}, {"type": "boolean"}]})
        );
    }

    #[test]
    fn switch_branches_are_flattened_and_deduplicated() {
        let node = SchemaNode::any().when(
            Conditional::when("mode")
                .case("a", Some(SchemaNode::string().into_ref()), None)
                .case(
                    "b",
                    Some(SchemaNode::string().into_ref()),
                    Some(SchemaNode::boolean().into_ref()),
                ),
        );
        assert_eq!(
            render(&node),
            json!({"oneOf": [{"type": "string"}, {"type": "boolean"}]})
        );
    }

    #[test]
    fn conditional_without_surviving_branches_adds_nothing() {
        let node = SchemaNode::string().when(
            Conditional::when("flag").then(SchemaNode::string().forbidden()),
        );
        assert_eq!(render(&node), json!({"type": "string"}));
    }

    #[test]
    fn required_marker_wraps_component_refs() {
        let named = SchemaNode::object()
            .key("id", SchemaNode::string())
            .class_name("Named")
            .required();
        let node = SchemaNode::alternatives().try_node(named);
        assert_eq!(
            render(&node),
            json!({"anyOf": [{"$ref": "#/components/schemas/Named", "x-required": true}]})
        );
    }

    #[test]
    fn several_clauses_extend_existing_one_of() {
        let node = SchemaNode::alternatives()
            .match_mode(MatchMode::One)
            .try_node(SchemaNode::number())
            .when(Conditional::when("a").then(SchemaNode::string()))
            .when(Conditional::when("b").then(SchemaNode::boolean()));
        assert_eq!(
            render(&node),
            json!({
                "oneOf": [
                    {"type": "number", "format": "float"},
                    {"type": "string"},
                    {"type": "boolean"}
                ]
            })
        );
    }

    #[test]
    fn single_clause_extends_existing_any_of() {
        let node = SchemaNode::alternatives()
            .try_node(SchemaNode::number())
            .when(Conditional::when("a").then(SchemaNode::string()));
        assert_eq!(
            render(&node),
            json!({"anyOf": [{"type": "number", "format": "float"}, {"type": "string"}]})
        );
    }

    #[test]
    fn conditionals_merge_into_existing_alternatives() {
        let node = SchemaNode::alternatives()
            .match_mode(MatchMode::One)
            .try_node(SchemaNode::string())
            .when(
                Conditional::when("kind")
                    .then(SchemaNode::string())
                    .otherwise(SchemaNode::boolean()),
            );
        assert_eq!(
            render(&node),
            json!({"oneOf": [{"type": "string"}, {"type": "boolean"}]})
        );
    }
}
