//! OpenAPI document assembler

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, instrument, warn};

use ruledoc_core::{
    openapi::{Info, OpenApi, OpenApiVersion, Server, Tag},
    route::{
        MediaType, Operation, Parameter, ParameterLocation, ParameterRef, PathItem, RequestBody,
        Response,
    },
    schema::{Components, Reference, SchemaRef},
};

use crate::compiler::compile;
use crate::error::{CompileError, Result};
use crate::node::{NodeRef, SchemaNode};
use crate::options::BuildOptions;
use crate::registry::BuildContext;
use crate::resolver::name_for;
use crate::routes::{RouteDefinition, reason_phrase};
use crate::source::ComponentSource;

/// Assembled `tags`/`paths`/`components` fragment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub tags: Vec<Tag>,
    pub paths: BTreeMap<String, PathItem>,
    pub components: Components,
}

/// Result of one document build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledDocument {
    pub definition: Definition,
}

impl AssembledDocument {
    /// Wrap the fragment into a complete OpenAPI 3.0 document
    #[must_use]
    pub fn into_openapi(self, info: Info, servers: Option<Vec<Server>>) -> OpenApi {
        let Definition {
            tags,
            paths,
            components,
        } = self.definition;
        OpenApi {
            openapi: OpenApiVersion::V3_0_3,
            info,
            servers,
            tags,
            paths,
            components: Some(components),
        }
    }
}

/// Build the document for `routes` using the components declared by `source`.
///
/// Each call owns a fresh registry; nothing is shared between builds.
#[instrument(skip_all, fields(routes = routes.len()))]
pub fn assemble(
    source: &impl ComponentSource,
    routes: &[RouteDefinition],
    options: BuildOptions,
) -> Result<AssembledDocument> {
    let mut assembler = DocumentAssembler::new(options);
    assembler.register_schemas(source)?;
    assembler.register_parameters(source)?;

    let mut paths: BTreeMap<String, PathItem> = BTreeMap::new();
    for route in routes {
        let operation = assembler.build_operation(route)?;
        debug!(method = %route.method, path = %route.path, "assembled route");
        paths
            .entry(route.path.clone())
            .or_default()
            .set_operation(route.method, operation);
    }

    Ok(AssembledDocument {
        definition: Definition {
            tags: source.tags(),
            paths,
            components: assembler.ctx.into_components(),
        },
    })
}

struct DocumentAssembler {
    ctx: BuildContext,
    /// Parameter wire name to component key
    declared_parameters: HashMap<String, String>,
}

impl DocumentAssembler {
    fn new(options: BuildOptions) -> Self {
        Self {
            ctx: BuildContext::new(options),
            declared_parameters: HashMap::new(),
        }
    }

    fn register_schemas(&mut self, source: &impl ComponentSource) -> Result<()> {
        for (name, node) in source.schemas() {
            let Some(compiled) = compile(Some(&*node), &mut self.ctx)? else {
                debug!(component = %name, "skipping forbidden schema component");
                continue;
            };
            // A class_name equal to the key has already registered itself
            let registered = matches!(
                &compiled,
                SchemaRef::Ref(reference) if *reference == Reference::schema(&name)
            );
            if !registered {
                self.ctx
                    .registry_mut()
                    .register_schema(&name, compiled.into_schema())?;
            }
            self.ctx.registry_mut().bind_node(&node, &name);
        }
        Ok(())
    }

    fn register_parameters(&mut self, source: &impl ComponentSource) -> Result<()> {
        for (name, node) in source.parameters() {
            let Some(compiled) = compile(Some(&*node), &mut self.ctx)? else {
                debug!(component = %name, "skipping forbidden parameter component");
                continue;
            };
            let Some(parameter) = self.parameter_envelope(&name, &node, compiled)? else {
                debug!(component = %name, "skipping parameter component with a forbidden key");
                continue;
            };
            self.declared_parameters
                .insert(parameter.name.clone(), name.clone());
            self.ctx.registry_mut().register_parameter(&name, parameter);
        }
        Ok(())
    }

    /// Lift the single property of a compiled parameter object into a parameter.
    ///
    /// `None` when the only declared key is forbidden.
    fn parameter_envelope(
        &self,
        name: &str,
        node: &SchemaNode,
        compiled: SchemaRef,
    ) -> Result<Option<Parameter>> {
        let invalid = |reason: &str| CompileError::InvalidParameter {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let SchemaRef::Inline(schema) = compiled else {
            return Err(invalid("parameter schemas must compile inline"));
        };
        let schema = *schema;
        let mut properties = schema.properties.unwrap_or_default();
        if properties.is_empty()
            && !node.children.is_empty()
            && node.children.iter().all(|(_, child)| child.is_forbidden())
        {
            return Ok(None);
        }
        if properties.len() != 1 {
            return Err(invalid("expected an object with exactly one key"));
        }
        let Some((wire_name, property)) = properties.pop_first() else {
            return Err(invalid("expected an object with exactly one key"));
        };

        let required = schema
            .required
            .as_ref()
            .is_some_and(|keys| keys.contains(&wire_name));
        let (description, property) = match property {
            SchemaRef::Inline(mut inner) => {
                let description = inner.description.take();
                (description, SchemaRef::Inline(inner))
            }
            reference @ SchemaRef::Ref(_) => (None, reference),
        };
        let location = if self.ctx.options().is_header_name(&wire_name) {
            ParameterLocation::Header
        } else {
            ParameterLocation::Query
        };

        Ok(Some(Parameter {
            name: wire_name,
            r#in: location,
            description,
            required,
            schema: Some(property),
        }))
    }

    fn build_operation(&mut self, route: &RouteDefinition) -> Result<Operation> {
        let mut parameters = Vec::new();
        for node in [&route.headers, &route.query].into_iter().flatten() {
            for (key, child) in &node.children {
                if child.is_forbidden() {
                    continue;
                }
                parameters.push(self.parameter_ref(key)?);
            }
        }

        let request_body = if route.body.is_empty() {
            None
        } else {
            let content = self.content(&route.body)?;
            let required = route.body.values().any(|node| node.is_required());
            Some(RequestBody {
                description: None,
                required: required.then_some(true),
                content,
            })
        };

        let mut responses = BTreeMap::new();
        for (status, response) in &route.responses {
            let content = if *status == 204 {
                BTreeMap::new()
            } else {
                self.content(&response.content)?
            };
            let description = response
                .description
                .clone()
                .unwrap_or_else(|| reason_phrase(*status).to_string());
            responses.insert(
                status.to_string(),
                Response {
                    description,
                    content,
                },
            );
        }

        Ok(Operation {
            tags: route.tags.clone(),
            summary: route.summary.clone(),
            description: route.description.clone(),
            parameters,
            request_body,
            responses,
        })
    }

    fn parameter_ref(&self, key: &str) -> Result<ParameterRef> {
        if let Some(component) = self.declared_parameters.get(key) {
            return Ok(ParameterRef::Ref(Reference::parameter(component)));
        }
        if self.ctx.options().strict_parameters {
            return Err(CompileError::UndeclaredParameter {
                name: key.to_string(),
            });
        }
        warn!(parameter = key, "route parameter is not declared; referencing raw key");
        Ok(ParameterRef::Ref(Reference::parameter(key)))
    }

    fn content(
        &mut self,
        declared: &BTreeMap<String, NodeRef>,
    ) -> Result<BTreeMap<String, MediaType>> {
        let mut content = BTreeMap::new();
        for (mime, node) in declared {
            if let Some(name) = name_for(node, &mut self.ctx)? {
                content.insert(
                    mime.clone(),
                    MediaType {
                        schema: Some(SchemaRef::Ref(Reference::schema(&name))),
                    },
                );
            }
        }
        Ok(content)
    }
}
