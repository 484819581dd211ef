//! Pre-declared, reusable definitions fed to the assembler

use std::collections::BTreeMap;

use ruledoc_core::openapi::Tag;

use crate::node::NodeRef;

/// Supplier of the tags and named components of a document.
///
/// Schemas and parameters are registered under their given keys before any
/// route is assembled. Each parameter node is an object with exactly one key:
/// the parameter's wire name.
pub trait ComponentSource {
    fn tags(&self) -> Vec<Tag>;
    fn schemas(&self) -> Vec<(String, NodeRef)>;
    fn parameters(&self) -> Vec<(String, NodeRef)>;
}

/// In-memory [`ComponentSource`] built by registration calls
#[derive(Debug, Clone, Default)]
pub struct ComponentCatalog {
    tags: Vec<Tag>,
    schemas: BTreeMap<String, NodeRef>,
    parameters: BTreeMap<String, NodeRef>,
}

impl ComponentCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tag(mut self, name: impl Into<String>, description: Option<&str>) -> Self {
        self.tags.push(Tag::new(name, description));
        self
    }

    #[must_use]
    pub fn schema(mut self, name: impl Into<String>, node: impl Into<NodeRef>) -> Self {
        self.schemas.insert(name.into(), node.into());
        self
    }

    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, node: impl Into<NodeRef>) -> Self {
        self.parameters.insert(name.into(), node.into());
        self
    }
}

impl ComponentSource for ComponentCatalog {
    fn tags(&self) -> Vec<Tag> {
        self.tags.clone()
    }

    fn schemas(&self) -> Vec<(String, NodeRef)> {
        self.schemas
            .iter()
            .map(|(name, node)| (name.clone(), NodeRef::clone(node)))
            .collect()
    }

    fn parameters(&self) -> Vec<(String, NodeRef)> {
        self.parameters
            .iter()
            .map(|(name, node)| (name.clone(), NodeRef::clone(node)))
            .collect()
    }
}
