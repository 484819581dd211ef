//! Per-build component registry.
//!
//! Holds the named components of one document build together with the two
//! deduplication tables: node identity to name, and canonical shape to name.
//! A name is bound to exactly one shape for the lifetime of a build.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use ruledoc_core::route::Parameter;
use ruledoc_core::schema::{Components, PARAMETERS_BUCKET, SCHEMAS_BUCKET, Schema};

use crate::error::{CompileError, Result};
use crate::node::NodeRef;
use crate::options::BuildOptions;

/// Deterministic serialized form of a schema used for structural equality.
///
/// Object keys come out sorted, so two schemas with the same content always
/// produce the same string.
pub fn canonical_shape(schema: &Schema) -> Result<String> {
    Ok(serde_json::to_value(schema)?.to_string())
}

/// Canonical shape ignoring the inline `title`, which only carries the
/// component name candidate.
pub(crate) fn untitled_shape(schema: &Schema) -> Result<String> {
    if schema.title.is_none() {
        return canonical_shape(schema);
    }
    let untitled = Schema {
        title: None,
        ..schema.clone()
    };
    canonical_shape(&untitled)
}

#[derive(Debug, Default)]
pub struct ComponentRegistry {
    /// Keyed by `Arc` address; the stored handle keeps the address from being reused
    by_identity: HashMap<usize, (NodeRef, String)>,
    by_shape: HashMap<String, String>,
    schemas: BTreeMap<String, Schema>,
    parameters: BTreeMap<String, Parameter>,
    buckets: BTreeMap<String, BTreeMap<String, Schema>>,
}

fn identity_key(node: &NodeRef) -> usize {
    Arc::as_ptr(node) as usize
}

impl ComponentRegistry {
    #[must_use]
    pub fn has_component(&self, bucket: &str, name: &str) -> bool {
        match bucket {
            SCHEMAS_BUCKET => self.schemas.contains_key(name),
            PARAMETERS_BUCKET => self.parameters.contains_key(name),
            other => self
                .buckets
                .get(other)
                .is_some_and(|bucket| bucket.contains_key(name)),
        }
    }

    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Name bound to this exact node, if any
    #[must_use]
    pub fn name_of_node(&self, node: &NodeRef) -> Option<&str> {
        self.by_identity
            .get(&identity_key(node))
            .map(|(_, name)| name.as_str())
    }

    /// Name bound to a canonical shape, if any
    #[must_use]
    pub fn name_of_shape(&self, shape: &str) -> Option<&str> {
        self.by_shape.get(shape).map(String::as_str)
    }

    pub fn bind_node(&mut self, node: &NodeRef, name: &str) {
        self.by_identity
            .insert(identity_key(node), (Arc::clone(node), name.to_string()));
    }

    /// Register a schema under an explicit name.
    ///
    /// Re-registering an identical shape is a no-op; a different shape under
    /// a name that is already taken is a naming conflict.
    pub fn register_schema(&mut self, name: &str, schema: Schema) -> Result<()> {
        let shape = untitled_shape(&schema)?;
        if let Some(existing) = self.schemas.get(name) {
            if untitled_shape(existing)? == shape {
                return Ok(());
            }
            return Err(CompileError::LabelConflict {
                name: name.to_string(),
            });
        }

        debug!(component = name, "registering schema component");
        self.by_shape
            .entry(shape)
            .or_insert_with(|| name.to_string());
        self.schemas.insert(name.to_string(), schema);
        Ok(())
    }

    /// Register a schema produced by a `class_name` node into its target bucket
    pub fn register_class(&mut self, bucket: &str, name: &str, schema: Schema) -> Result<()> {
        match bucket {
            SCHEMAS_BUCKET => self.register_schema(name, schema),
            PARAMETERS_BUCKET => Err(CompileError::ReservedClassTarget {
                name: bucket.to_string(),
            }),
            other => {
                debug!(bucket = other, component = name, "registering class component");
                self.buckets
                    .entry(other.to_string())
                    .or_default()
                    .entry(name.to_string())
                    .or_insert(schema);
                Ok(())
            }
        }
    }

    pub fn register_parameter(&mut self, name: &str, parameter: Parameter) {
        debug!(component = name, parameter = %parameter.name, "registering parameter component");
        self.parameters.insert(name.to_string(), parameter);
    }

    #[must_use]
    pub fn into_components(self) -> Components {
        Components {
            schemas: self.schemas,
            parameters: self.parameters,
            buckets: self.buckets,
        }
    }
}

/// Mutable state of one document build, passed explicitly through the
/// recursive compiler.
#[derive(Debug, Default)]
pub struct BuildContext {
    options: BuildOptions,
    registry: ComponentRegistry,
    depth: usize,
}

impl BuildContext {
    #[must_use]
    pub fn new(options: BuildOptions) -> Self {
        Self {
            options,
            registry: ComponentRegistry::default(),
            depth: 0,
        }
    }

    #[must_use]
    pub const fn options(&self) -> &BuildOptions {
        &self.options
    }

    #[must_use]
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn into_components(self) -> Components {
        self.registry.into_components()
    }

    pub(crate) fn descend(&mut self) -> Result<()> {
        if self.depth >= self.options.max_depth {
            return Err(CompileError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SchemaNode;
    use insta::assert_snapshot;

    fn integer_min_one() -> Schema {
        Schema {
            minimum: Some(1.0),
            ..Schema::integer()
        }
    }

    #[test]
    fn canonical_shape_sorts_keys() {
        assert_snapshot!(canonical_shape(&integer_min_one()).unwrap(), @r#"{"minimum":1,"type":"integer"}"#);
    }

    #[test]
    fn untitled_shape_ignores_title() {
        let titled = Schema {
            title: Some("Foo".to_string()),
            ..integer_min_one()
        };
        assert_eq!(
            untitled_shape(&titled).unwrap(),
            canonical_shape(&integer_min_one()).unwrap()
        );
    }

    #[test]
    fn register_schema_records_shape_once() {
        let mut registry = ComponentRegistry::default();
        registry.register_schema("First", integer_min_one()).unwrap();
        registry.register_schema("Second", integer_min_one()).unwrap();

        let shape = canonical_shape(&integer_min_one()).unwrap();
        assert_eq!(registry.name_of_shape(&shape), Some("First"));
        assert!(registry.has_component("schemas", "Second"));
    }

    #[test]
    fn register_schema_rejects_different_shape_under_same_name() {
        let mut registry = ComponentRegistry::default();
        registry.register_schema("Thing", Schema::string()).unwrap();
        registry.register_schema("Thing", Schema::string()).unwrap();

        let err = registry.register_schema("Thing", Schema::boolean()).unwrap_err();
        assert!(matches!(err, CompileError::LabelConflict { name } if name == "Thing"));
    }

    #[test]
    fn class_components_land_in_their_bucket() {
        let mut registry = ComponentRegistry::default();
        registry
            .register_class("requestBodies", "Upload", Schema::string())
            .unwrap();
        assert!(registry.has_component("requestBodies", "Upload"));
        assert!(!registry.has_component("schemas", "Upload"));

        let components = registry.into_components();
        assert!(components.buckets["requestBodies"].contains_key("Upload"));
    }

    #[test]
    fn parameters_bucket_is_reserved_for_classes() {
        let mut registry = ComponentRegistry::default();
        let err = registry
            .register_class("parameters", "Key", Schema::string())
            .unwrap_err();
        assert!(matches!(err, CompileError::ReservedClassTarget { .. }));
    }

    #[test]
    fn node_identity_is_pointer_identity() {
        let mut registry = ComponentRegistry::default();
        let node = SchemaNode::string().into_ref();
        let twin = SchemaNode::string().into_ref();

        registry.bind_node(&node, "Name");
        assert_eq!(registry.name_of_node(&Arc::clone(&node)), Some("Name"));
        assert_eq!(registry.name_of_node(&twin), None);
    }

    #[test]
    fn depth_guard_trips_at_limit() {
        let mut ctx = BuildContext::new(BuildOptions {
            max_depth: 2,
            ..BuildOptions::default()
        });
        ctx.descend().unwrap();
        ctx.descend().unwrap();
        assert!(matches!(
            ctx.descend(),
            Err(CompileError::DepthExceeded { limit: 2 })
        ));
        ctx.ascend();
        assert!(ctx.descend().is_ok());
    }
}
