//! Schema node to OpenAPI schema compilation.
//!
//! # Overview
//!
//! [`compile`] walks one node depth-first and produces either a schema (inline
//! or a `$ref` to a registered component) or `None` when the node is forbidden
//! and the caller must leave the field out entirely.
//!
//! Per node the dispatcher runs, in order:
//! 1. `schema_override` replacement (overrides do not nest)
//! 2. verbatim `swagger` override
//! 3. `$ref` short-circuit for an already registered `class_name`
//! 4. forbidden presence
//! 5. kind dispatch (scalar rules, object, array, alternatives)
//! 6. conditional (`when`) expansion
//! 7. nullable / description / examples / title / default / `swagger` merge
//! 8. `class_name` registration
//!
//! # Module Structure
//!
//! - `composite` - object and array kinds
//! - `alternatives` - alternatives kind and conditional expansion

mod alternatives;
mod composite;

use serde_json::Value;
use tracing::trace;

use ruledoc_core::schema::{Reference, Schema, SchemaRef};

use crate::error::{CompileError, Result};
use crate::node::{DefaultValue, Kind, SchemaNode};
use crate::options::BuildOptions;
use crate::registry::BuildContext;
use crate::rules;

/// Compile a node against the build's registry.
///
/// Returns `Ok(None)` for a forbidden node.
pub fn compile(node: Option<&SchemaNode>, ctx: &mut BuildContext) -> Result<Option<SchemaRef>> {
    let node = node.ok_or(CompileError::NoSchemaProvided)?;
    compile_node(node, ctx, false)
}

/// Compile a node in a fresh build and return the schema with every component
/// the compilation registered.
pub fn compile_standalone(
    node: Option<&SchemaNode>,
    options: BuildOptions,
) -> Result<(Option<SchemaRef>, ruledoc_core::schema::Components)> {
    let mut ctx = BuildContext::new(options);
    let schema = compile(node, &mut ctx)?;
    Ok((schema, ctx.into_components()))
}

pub(crate) fn compile_node(
    node: &SchemaNode,
    ctx: &mut BuildContext,
    overridden: bool,
) -> Result<Option<SchemaRef>> {
    ctx.descend()?;
    let result = dispatch(node, ctx, overridden);
    ctx.ascend();
    result
}

fn dispatch(
    node: &SchemaNode,
    ctx: &mut BuildContext,
    overridden: bool,
) -> Result<Option<SchemaRef>> {
    trace!(kind = %node.kind, "compiling schema node");
    let metadata = &node.metadata;

    if let Some(replacement) = &metadata.schema_override {
        if overridden {
            return Err(CompileError::NestedOverride);
        }
        return compile_node(replacement, ctx, true);
    }

    if metadata.swagger_override
        && let Some(literal) = &metadata.swagger
    {
        let schema: Schema = serde_json::from_value(literal.clone())?;
        return Ok(Some(SchemaRef::inline(schema)));
    }

    if let Some(class_name) = &metadata.class_name {
        let bucket = metadata.class_target();
        if ctx.registry().has_component(bucket, class_name) {
            trace!(bucket, component = %class_name, "reusing class component");
            return Ok(Some(SchemaRef::Ref(Reference::component(bucket, class_name))));
        }
    }

    if node.is_forbidden() {
        return Ok(None);
    }

    let mut schema = match &node.kind {
        Kind::Object => composite::object(node, ctx)?,
        Kind::Array => composite::array(node, ctx)?,
        Kind::Alternatives => alternatives::alternatives(node, ctx)?,
        Kind::Custom(kind) => {
            return Err(CompileError::UnrecognizedType { kind: kind.clone() });
        }
        scalar => rules::extract(node, ctx.options()).ok_or_else(|| {
            CompileError::UnrecognizedType {
                kind: scalar.to_string(),
            }
        })?,
    };

    if !node.conditionals.is_empty() {
        alternatives::merge_conditionals(node, &mut schema, ctx)?;
    }

    decorate(node, &mut schema)?;

    if let Some(class_name) = &metadata.class_name {
        let bucket = metadata.class_target();
        ctx.registry_mut()
            .register_class(bucket, class_name, schema)?;
        return Ok(Some(SchemaRef::Ref(Reference::component(bucket, class_name))));
    }

    Ok(Some(SchemaRef::inline(schema)))
}

/// Node-level documentation keywords, attached after the kind-specific ones
fn decorate(node: &SchemaNode, schema: &mut Schema) -> Result<()> {
    if node.valid_values.iter().any(Value::is_null) {
        schema.nullable = Some(true);
    }
    if let Some(description) = &node.flags.description {
        schema.description = Some(description.clone());
    }
    match node.examples.as_slice() {
        [] => {}
        [single] => schema.example = Some(single.clone()),
        many => schema.examples = Some(many.to_vec()),
    }
    if let Some(label) = &node.flags.label {
        schema.title = Some(label.clone());
    }
    // Generated defaults have no static value
    if let Some(DefaultValue::Value(value)) = &node.flags.default {
        schema.default = Some(value.clone());
    }
    if !node.metadata.swagger_override
        && let Some(overlay) = &node.metadata.swagger
    {
        *schema = merge_shallow(schema, overlay)?;
    }
    Ok(())
}

/// Top-level keys of `overlay` replace those of `schema`
fn merge_shallow(schema: &Schema, overlay: &Value) -> Result<Schema> {
    let Value::Object(overlay) = overlay else {
        return Err(CompileError::InvalidOverride(serde::de::Error::custom(
            "swagger metadata must be a JSON object",
        )));
    };
    let mut merged = serde_json::to_value(schema)?;
    if let Value::Object(base) = &mut merged {
        for (key, value) in overlay {
            base.insert(key.clone(), value.clone());
        }
    }
    Ok(serde_json::from_value(merged)?)
}

/// Keep the first occurrence of every structurally equal schema
pub(crate) fn dedup_schemas(schemas: Vec<SchemaRef>) -> Vec<SchemaRef> {
    let mut unique: Vec<SchemaRef> = Vec::with_capacity(schemas.len());
    for schema in schemas {
        if !unique.contains(&schema) {
            unique.push(schema);
        }
    }
    unique
}
