//! Route definitions supplied to the assembler.
//!
//! Routes are registered explicitly; nothing is discovered at runtime.

use std::collections::BTreeMap;

use ruledoc_core::route::HttpMethod;

use crate::node::NodeRef;

pub const JSON_MIME: &str = "application/json";

/// One documented response of a route
#[derive(Debug, Clone, Default)]
pub struct ResponseDefinition {
    pub description: Option<String>,
    /// MIME type to body schema
    pub content: BTreeMap<String, NodeRef>,
}

impl ResponseDefinition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON response with the given body schema
    #[must_use]
    pub fn json(node: impl Into<NodeRef>) -> Self {
        Self::new().content(JSON_MIME, node)
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn content(mut self, mime: impl Into<String>, node: impl Into<NodeRef>) -> Self {
        self.content.insert(mime.into(), node.into());
        self
    }
}

/// A path + method with the schemas of its inputs and outputs
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    pub path: String,
    pub method: HttpMethod,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    /// Object node whose keys are header parameters
    pub headers: Option<NodeRef>,
    /// Object node whose keys are query parameters
    pub query: Option<NodeRef>,
    /// MIME type to request body schema
    pub body: BTreeMap<String, NodeRef>,
    pub responses: BTreeMap<u16, ResponseDefinition>,
}

impl RouteDefinition {
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            summary: None,
            description: None,
            tags: Vec::new(),
            headers: None,
            query: None,
            body: BTreeMap::new(),
            responses: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn headers(mut self, node: impl Into<NodeRef>) -> Self {
        self.headers = Some(node.into());
        self
    }

    #[must_use]
    pub fn query(mut self, node: impl Into<NodeRef>) -> Self {
        self.query = Some(node.into());
        self
    }

    #[must_use]
    pub fn body(mut self, mime: impl Into<String>, node: impl Into<NodeRef>) -> Self {
        self.body.insert(mime.into(), node.into());
        self
    }

    #[must_use]
    pub fn json_body(self, node: impl Into<NodeRef>) -> Self {
        self.body(JSON_MIME, node)
    }

    #[must_use]
    pub fn response(mut self, status: u16, response: ResponseDefinition) -> Self {
        self.responses.insert(status, response);
        self
    }
}

/// Reason phrase used when a response declares no description
#[must_use]
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        _ => "Response",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SchemaNode;
    use rstest::rstest;

    #[test]
    fn builder_collects_route_parts() {
        let route = RouteDefinition::post("/users")
            .summary("Create user")
            .tag("users")
            .json_body(SchemaNode::object().label("NewUser"))
            .response(201, ResponseDefinition::json(SchemaNode::object().label("User")))
            .response(204, ResponseDefinition::new());

        assert_eq!(route.method, HttpMethod::Post);
        assert_eq!(route.tags, vec!["users"]);
        assert!(route.body.contains_key(JSON_MIME));
        assert_eq!(route.responses.keys().copied().collect::<Vec<_>>(), vec![201, 204]);
        assert!(route.responses[&204].content.is_empty());
    }

    #[rstest]
    #[case(200, "OK")]
    #[case(204, "No Content")]
    #[case(422, "Unprocessable Entity")]
    #[case(299, "Response")]
    fn reason_phrases(#[case] status: u16, #[case] expected: &str) {
        assert_eq!(reason_phrase(status), expected);
    }
}
