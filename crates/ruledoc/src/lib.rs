//! Compile validation-rule trees into OpenAPI 3.0 documents.
//!
//! A build takes a [`ComponentSource`] of pre-declared schemas and parameters
//! plus a list of [`RouteDefinition`]s and produces the `tags`, `paths` and
//! `components` of a document. Structurally identical schemas are emitted
//! once under `#/components/schemas` and referenced everywhere else.
//!
//! ```ignore
//! let user = SchemaNode::object()
//!     .key("id", SchemaNode::string().rule(Rule::Guid).required())
//!     .label("User")
//!     .into_ref();
//! let routes = [RouteDefinition::get("/users/{id}")
//!     .response(200, ResponseDefinition::json(user))];
//! let doc = build_document(&ComponentCatalog::new(), &routes)?;
//! ```

pub mod assembler;
pub mod compiler;
pub mod error;
pub mod node;
pub mod options;
pub mod registry;
pub mod resolver;
pub mod routes;
pub mod rules;
pub mod source;

pub use assembler::{AssembledDocument, Definition, assemble};
pub use compiler::{compile, compile_standalone};
pub use error::{CompileError, ConfigError, Result};
pub use node::{Conditional, Kind, NodeRef, Rule, SchemaNode};
pub use options::BuildOptions;
pub use registry::{BuildContext, ComponentRegistry};
pub use resolver::name_for;
pub use routes::{ResponseDefinition, RouteDefinition};
pub use source::{ComponentCatalog, ComponentSource};

pub use ruledoc_core;

/// Build a document with default [`BuildOptions`]
pub fn build_document(
    source: &impl ComponentSource,
    routes: &[RouteDefinition],
) -> Result<AssembledDocument> {
    assemble(source, routes, BuildOptions::default())
}
