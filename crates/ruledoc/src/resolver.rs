//! Component naming for schemas referenced from request and response bodies.
//!
//! Bodies are always emitted as `$ref`s. A node gets its component name, in
//! order of preference, from:
//! 1. an earlier resolution of the very same node
//! 2. its own `class_name` registration
//! 3. an already registered component with the same canonical shape
//! 4. its label, which becomes a new component (or reuses an identical one)

use tracing::debug;

use ruledoc_core::schema::{SCHEMAS_BUCKET, SchemaRef};

use crate::compiler::compile_node;
use crate::error::{CompileError, Result};
use crate::node::NodeRef;
use crate::registry::{BuildContext, untitled_shape};

/// Resolve the component name of a body schema, registering it if needed.
///
/// Returns `Ok(None)` when the node is forbidden and the body must be omitted.
pub fn name_for(node: &NodeRef, ctx: &mut BuildContext) -> Result<Option<String>> {
    if let Some(name) = ctx.registry().name_of_node(node) {
        debug!(component = name, "reusing component bound to node");
        return Ok(Some(name.to_string()));
    }

    let mut schema = match compile_node(node, ctx, false)? {
        None => return Ok(None),
        Some(SchemaRef::Ref(reference)) => match reference.name_in(SCHEMAS_BUCKET) {
            Some(name) => {
                let name = name.to_string();
                ctx.registry_mut().bind_node(node, &name);
                return Ok(Some(name));
            }
            None => SchemaRef::Ref(reference).into_schema(),
        },
        Some(SchemaRef::Inline(schema)) => *schema,
    };

    let label = schema.title.take();
    let shape = untitled_shape(&schema)?;
    if let Some(name) = ctx.registry().name_of_shape(&shape) {
        let name = name.to_string();
        debug!(component = %name, "reusing component with identical shape");
        ctx.registry_mut().bind_node(node, &name);
        return Ok(Some(name));
    }

    let name = label.ok_or(CompileError::MissingLabel)?;
    // An identical shape under this name is reused, a different one conflicts
    ctx.registry_mut().register_schema(&name, schema)?;
    ctx.registry_mut().bind_node(node, &name);
    Ok(Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Rule, SchemaNode};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn user(label: Option<&str>) -> NodeRef {
        let mut node = SchemaNode::object()
            .key("id", SchemaNode::string().rule(Rule::Guid).required())
            .key("name", SchemaNode::string());
        if let Some(label) = label {
            node = node.label(label);
        }
        node.into_ref()
    }

    #[test]
    fn labelled_node_registers_without_title() {
        let mut ctx = BuildContext::default();
        let name = name_for(&user(Some("User")), &mut ctx).unwrap();
        assert_eq!(name.as_deref(), Some("User"));

        let registered = ctx.registry().schema("User").unwrap();
        assert_eq!(registered.title, None);
        assert_eq!(
            serde_json::to_value(registered).unwrap()["required"],
            json!(["id"])
        );
    }

    #[test]
    fn unlabelled_node_without_match_is_an_error() {
        let mut ctx = BuildContext::default();
        assert!(matches!(
            name_for(&user(None), &mut ctx),
            Err(CompileError::MissingLabel)
        ));
    }

    #[test]
    fn structurally_equal_node_reuses_name() {
        let mut ctx = BuildContext::default();
        name_for(&user(Some("User")), &mut ctx).unwrap();
        let name = name_for(&user(None), &mut ctx).unwrap();
        assert_eq!(name.as_deref(), Some("User"));
    }

    #[test]
    fn same_node_resolves_from_identity_table() {
        let mut ctx = BuildContext::default();
        let node = user(Some("User"));
        name_for(&node, &mut ctx).unwrap();
        assert_eq!(ctx.registry().name_of_node(&node), Some("User"));
        assert_eq!(name_for(&node, &mut ctx).unwrap().as_deref(), Some("User"));
    }

    #[test]
    fn same_label_different_shape_conflicts() {
        let mut ctx = BuildContext::default();
        name_for(&user(Some("User")), &mut ctx).unwrap();

        let other = SchemaNode::object()
            .key("id", SchemaNode::string().rule(Rule::Guid).required())
            .key("name", SchemaNode::string().required())
            .label("User")
            .into_ref();
        let err = name_for(&other, &mut ctx).unwrap_err();
        assert!(matches!(err, CompileError::LabelConflict { name } if name == "User"));
    }

    #[test]
    fn class_named_node_uses_its_class() {
        let mut ctx = BuildContext::default();
        let node = SchemaNode::string().class_name("Token").into_ref();
        assert_eq!(name_for(&node, &mut ctx).unwrap().as_deref(), Some("Token"));
        assert!(ctx.registry().has_component("schemas", "Token"));
    }

    #[test]
    fn forbidden_body_has_no_name() {
        let mut ctx = BuildContext::default();
        let node = SchemaNode::object().forbidden().into_ref();
        assert_eq!(name_for(&node, &mut ctx).unwrap(), None);
    }
}
