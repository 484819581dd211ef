//! Object and array kinds

use std::collections::BTreeMap;

use serde_json::Value;

use ruledoc_core::schema::{Schema, SchemaRef};

use super::{compile_node, dedup_schemas};
use crate::error::Result;
use crate::node::{Rule, SchemaNode};
use crate::registry::BuildContext;
use crate::rules::resolve_count;

pub(super) fn object(node: &SchemaNode, ctx: &mut BuildContext) -> Result<Schema> {
    let mut properties = BTreeMap::new();
    let mut required = Vec::new();

    // Children compile in declaration order so later keys see components
    // registered by earlier ones.
    for (key, child) in &node.children {
        let Some(compiled) = compile_node(child, ctx, false)? else {
            continue;
        };
        if child.is_required() {
            required.push(key.clone());
        }
        properties.insert(key.clone(), compiled);
    }

    let mut schema = Schema {
        properties: Some(properties),
        ..Schema::object()
    };
    if !required.is_empty() {
        schema.required = Some(required);
    }

    match &node.key_pattern {
        Some(pattern) if node.children.is_empty() => {
            let additional = match compile_node(pattern, ctx, false)? {
                Some(compiled) => serde_json::to_value(compiled)?,
                None => Value::Bool(false),
            };
            schema.additional_properties = Some(additional);
        }
        _ if !node.flags.unknown_keys_allowed => {
            schema.additional_properties = Some(Value::Bool(false));
        }
        _ => {}
    }

    for rule in &node.rules {
        match rule {
            Rule::Min(limit) => schema.min_properties = Some(resolve_count(limit, &node.metadata)),
            Rule::Max(limit) => schema.max_properties = Some(resolve_count(limit, &node.metadata)),
            Rule::Length(limit) => {
                let count = resolve_count(limit, &node.metadata);
                schema.min_properties = Some(count);
                schema.max_properties = Some(count);
            }
            _ => {}
        }
    }

    Ok(schema)
}

pub(super) fn array(node: &SchemaNode, ctx: &mut BuildContext) -> Result<Schema> {
    let mut alternatives = Vec::with_capacity(node.items.len());
    for item in &node.items {
        if let Some(compiled) = compile_node(item, ctx, false)? {
            alternatives.push(compiled);
        }
    }
    let mut alternatives = dedup_schemas(alternatives);

    let items = match alternatives.len() {
        0 => SchemaRef::inline(Schema::default()),
        1 => alternatives.remove(0),
        _ => SchemaRef::inline(Schema {
            one_of: Some(alternatives),
            ..Schema::default()
        }),
    };

    let mut schema = Schema::array(items);
    for rule in &node.rules {
        match rule {
            Rule::Min(limit) => schema.min_items = Some(resolve_count(limit, &node.metadata)),
            Rule::Max(limit) => schema.max_items = Some(resolve_count(limit, &node.metadata)),
            Rule::Length(limit) => {
                let count = resolve_count(limit, &node.metadata);
                schema.min_items = Some(count);
                schema.max_items = Some(count);
            }
            Rule::Unique => schema.unique_items = Some(true),
            _ => {}
        }
    }

    Ok(schema)
}

#[cfg(test)]
mod tests {
    use crate::compiler::compile;
    use crate::node::{Limit, Rule, SchemaNode};
    use crate::registry::BuildContext;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn render(node: &SchemaNode) -> Value {
        let mut ctx = BuildContext::default();
        serde_json::to_value(compile(Some(node), &mut ctx).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn object_required_follows_declaration_order_and_skips_forbidden() {
        let node = SchemaNode::object()
            .key("zeta", SchemaNode::string().required())
            .key("secret", SchemaNode::string().required().forbidden())
            .key("alpha", SchemaNode::boolean().required())
            .key("note", SchemaNode::string());
        assert_eq!(
            render(&node),
            json!({
                "type": "object",
                "properties": {
                    "zeta": {"type": "string"},
                    "alpha": {"type": "boolean"},
                    "note": {"type": "string"}
                },
                "required": ["zeta", "alpha"],
                "additionalProperties": false
            })
        );
    }

    #[test]
    fn object_unknown_keys_left_permissive() {
        let node = SchemaNode::object()
            .key("id", SchemaNode::string())
            .unknown(true);
        assert_eq!(
            render(&node),
            json!({"type": "object", "properties": {"id": {"type": "string"}}})
        );
    }

    #[test]
    fn object_key_pattern_becomes_additional_properties() {
        let node = SchemaNode::object().pattern_keys(SchemaNode::number().rule(Rule::Integer));
        assert_eq!(
            render(&node),
            json!({
                "type": "object",
                "properties": {},
                "additionalProperties": {"type": "integer"}
            })
        );
    }

    #[test]
    fn object_key_pattern_ignored_when_children_declared() {
        let node = SchemaNode::object()
            .key("id", SchemaNode::string())
            .pattern_keys(SchemaNode::number());
        assert_eq!(render(&node)["additionalProperties"], json!(false));
    }

    #[test]
    fn object_property_count_rules() {
        let node = SchemaNode::object()
            .unknown(true)
            .rule(Rule::min(1))
            .rule(Rule::max(4));
        assert_eq!(
            render(&node),
            json!({"type": "object", "properties": {}, "minProperties": 1, "maxProperties": 4})
        );
    }

    #[test]
    fn array_without_items_is_unconstrained() {
        assert_eq!(
            render(&SchemaNode::array()),
            json!({"type": "array", "items": {}})
        );
    }

    #[test]
    fn array_single_item_inlines_schema() {
        let node = SchemaNode::array()
            .item(SchemaNode::string())
            .rule(Rule::min(1))
            .rule(Rule::max(3))
            .rule(Rule::Unique);
        assert_eq!(
            render(&node),
            json!({
                "type": "array",
                "items": {"type": "string"},
                "minItems": 1,
                "maxItems": 3,
                "uniqueItems": true
            })
        );
    }

    #[rstest]
    #[case(SchemaNode::array().rule(Rule::length(2)), 2)]
    #[case(
        SchemaNode::array()
            .rule(Rule::Length(Limit::Ref("pair".into())))
            .ref_value("pair", 2.0),
        2
    )]
    #[case(SchemaNode::array().rule(Rule::Length(Limit::Ref("unset".into()))), 0)]
    fn array_length_sets_equal_bounds(#[case] node: SchemaNode, #[case] count: usize) {
        let rendered = render(&node.item(SchemaNode::boolean()));
        assert_eq!(rendered["minItems"], json!(count));
        assert_eq!(rendered["maxItems"], json!(count));
    }

    #[test]
    fn array_alternatives_dedup_then_one_of() {
        let node = SchemaNode::array()
            .item(SchemaNode::string())
            .item(SchemaNode::number().rule(Rule::Integer))
            .item(SchemaNode::string())
            .item(SchemaNode::boolean().forbidden());
        assert_eq!(
            render(&node),
            json!({
                "type": "array",
                "items": {"oneOf": [{"type": "string"}, {"type": "integer"}]}
            })
        );
    }

    #[test]
    fn array_duplicate_items_collapse_to_single_schema() {
        let node = SchemaNode::array()
            .item(SchemaNode::string())
            .item(SchemaNode::string());
        assert_eq!(render(&node)["items"], json!({"type": "string"}));
    }
}
