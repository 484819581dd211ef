//! Validation-rule tree that the compiler consumes.
//!
//! A [`SchemaNode`] describes the shape of one value: its kind, the rules a
//! validator enforces on it, presence and documentation flags, children for
//! composite kinds and free-form compiler metadata. Nodes are immutable once
//! shared through [`NodeRef`], and the compiler uses `Arc` pointer identity
//! to recognise exact reuse of a node across routes.
//!
//! Because a node can only reference nodes that already exist when it is
//! built, a node cannot become its own descendant: schema graphs handed to
//! the compiler are always finite and acyclic.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use ruledoc_core::schema::SCHEMAS_BUCKET;

/// Shared handle to an immutable schema node
pub type NodeRef = Arc<SchemaNode>;

/// Value kind of a schema node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    String,
    Number,
    Boolean,
    Date,
    Binary,
    Object,
    Array,
    Alternatives,
    Any,
    /// Validator type without an OpenAPI rendering (e.g. `symbol`, `function`)
    Custom(String),
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Date => write!(f, "date"),
            Self::Binary => write!(f, "binary"),
            Self::Object => write!(f, "object"),
            Self::Array => write!(f, "array"),
            Self::Alternatives => write!(f, "alternatives"),
            Self::Any => write!(f, "any"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// Rule limit: a literal, or a reference to a sibling field resolved through
/// [`Metadata::ref_values`]
#[derive(Debug, Clone, PartialEq)]
pub enum Limit {
    Value(f64),
    Ref(String),
}

impl From<f64> for Limit {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}

impl From<i64> for Limit {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Value(value as f64)
    }
}

impl From<i32> for Limit {
    fn from(value: i32) -> Self {
        Self::Value(f64::from(value))
    }
}

impl From<u32> for Limit {
    fn from(value: u32) -> Self {
        Self::Value(f64::from(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Lower,
    Upper,
}

/// One validation rule, in declaration order on the node
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    Min(Limit),
    Max(Limit),
    Length(Limit),
    /// Exclusive lower bound
    Greater(Limit),
    /// Exclusive upper bound
    Less(Limit),
    Multiple(f64),
    Integer,
    Precision(u32),
    Sign(Sign),
    Alphanum,
    Token,
    Case(Case),
    Email,
    IsoDate,
    Guid,
    Pattern(String),
    Unique,
}

impl Rule {
    pub fn min(limit: impl Into<Limit>) -> Self {
        Self::Min(limit.into())
    }

    pub fn max(limit: impl Into<Limit>) -> Self {
        Self::Max(limit.into())
    }

    pub fn length(limit: impl Into<Limit>) -> Self {
        Self::Length(limit.into())
    }

    pub fn pattern(source: impl Into<String>) -> Self {
        Self::Pattern(source.into())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Presence {
    Required,
    #[default]
    Optional,
    Forbidden,
}

/// How an `alternatives` node combines its candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    #[default]
    Any,
    One,
}

/// Declared default of a field.
///
/// Generated defaults are evaluated per request by the validator, so they
/// have no static value to document.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Dynamic(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(<fn>)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Flags {
    pub presence: Presence,
    pub label: Option<String>,
    pub description: Option<String>,
    pub default: Option<DefaultValue>,
    pub encoding: Option<String>,
    pub date_format: Option<String>,
    pub unknown_keys_allowed: bool,
    pub match_mode: MatchMode,
    /// `valid_values` is the exhaustive allow-list
    pub only: bool,
    /// Validator coerces input before checking rules
    pub convert: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            presence: Presence::default(),
            label: None,
            description: None,
            default: None,
            encoding: None,
            date_format: None,
            unknown_keys_allowed: false,
            match_mode: MatchMode::default(),
            only: false,
            convert: true,
        }
    }
}

/// Compiler-facing metadata attached to a node
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Register the compiled schema as a named component
    pub class_name: Option<String>,
    /// Component bucket for `class_name`, `schemas` when unset
    pub class_target: Option<String>,
    /// Use `swagger` verbatim instead of compiling the node
    pub swagger_override: bool,
    /// Literal schema keys merged over (or replacing) the compiled schema
    pub swagger: Option<Value>,
    /// Node compiled in place of this one
    pub schema_override: Option<NodeRef>,
    /// Values of sibling fields referenced by rule limits
    pub ref_values: BTreeMap<String, f64>,
    pub swagger_type: Option<String>,
}

impl Metadata {
    #[must_use]
    pub fn class_target(&self) -> &str {
        self.class_target.as_deref().unwrap_or(SCHEMAS_BUCKET)
    }
}

/// One `switch` branch of a conditional
#[derive(Debug, Clone, Default)]
pub struct Branch {
    pub condition: Option<String>,
    pub then: Option<NodeRef>,
    pub otherwise: Option<NodeRef>,
}

/// A `when` clause: the value takes one of several shapes depending on a condition
#[derive(Debug, Clone, Default)]
pub struct Conditional {
    pub condition: Option<String>,
    pub then: Option<NodeRef>,
    pub otherwise: Option<NodeRef>,
    pub switch: Vec<Branch>,
}

impl Conditional {
    pub fn when(condition: impl Into<String>) -> Self {
        Self {
            condition: Some(condition.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn then(mut self, node: impl Into<NodeRef>) -> Self {
        self.then = Some(node.into());
        self
    }

    #[must_use]
    pub fn otherwise(mut self, node: impl Into<NodeRef>) -> Self {
        self.otherwise = Some(node.into());
        self
    }

    #[must_use]
    pub fn case(
        mut self,
        condition: impl Into<String>,
        then: Option<NodeRef>,
        otherwise: Option<NodeRef>,
    ) -> Self {
        self.switch.push(Branch {
            condition: Some(condition.into()),
            then,
            otherwise,
        });
        self
    }

    /// Every branch node in declaration order: `then`, `otherwise`, then each
    /// switch branch's `then`/`otherwise`
    pub fn branches(&self) -> impl Iterator<Item = &NodeRef> {
        self.then
            .iter()
            .chain(self.otherwise.iter())
            .chain(
                self.switch
                    .iter()
                    .flat_map(|branch| branch.then.iter().chain(branch.otherwise.iter())),
            )
    }
}

/// A validation-rule tree node
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub kind: Kind,
    pub rules: Vec<Rule>,
    pub flags: Flags,
    pub valid_values: Vec<Value>,
    pub invalid_values: Vec<Value>,
    /// Object keys in declaration order
    pub children: Vec<(String, NodeRef)>,
    /// Schema for undeclared object keys
    pub key_pattern: Option<NodeRef>,
    /// Array item alternatives
    pub items: Vec<NodeRef>,
    /// Candidates of an `alternatives` node
    pub alternatives: Vec<NodeRef>,
    pub conditionals: Vec<Conditional>,
    pub examples: Vec<Value>,
    pub metadata: Metadata,
}

impl SchemaNode {
    #[must_use]
    pub fn new(kind: Kind) -> Self {
        Self {
            kind,
            rules: Vec::new(),
            flags: Flags::default(),
            valid_values: Vec::new(),
            invalid_values: Vec::new(),
            children: Vec::new(),
            key_pattern: None,
            items: Vec::new(),
            alternatives: Vec::new(),
            conditionals: Vec::new(),
            examples: Vec::new(),
            metadata: Metadata::default(),
        }
    }

    #[must_use]
    pub fn string() -> Self {
        Self::new(Kind::String)
    }

    #[must_use]
    pub fn number() -> Self {
        Self::new(Kind::Number)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::new(Kind::Boolean)
    }

    #[must_use]
    pub fn date() -> Self {
        Self::new(Kind::Date)
    }

    #[must_use]
    pub fn binary() -> Self {
        Self::new(Kind::Binary)
    }

    #[must_use]
    pub fn object() -> Self {
        Self::new(Kind::Object)
    }

    #[must_use]
    pub fn array() -> Self {
        Self::new(Kind::Array)
    }

    #[must_use]
    pub fn alternatives() -> Self {
        Self::new(Kind::Alternatives)
    }

    #[must_use]
    pub fn any() -> Self {
        Self::new(Kind::Any)
    }

    #[must_use]
    pub fn into_ref(self) -> NodeRef {
        Arc::new(self)
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.flags.presence == Presence::Required
    }

    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        self.flags.presence == Presence::Forbidden
    }

    #[must_use]
    pub fn has_rule(&self, predicate: impl Fn(&Rule) -> bool) -> bool {
        self.rules.iter().any(predicate)
    }

    // Builder methods

    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.flags.presence = Presence::Required;
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.flags.presence = Presence::Optional;
        self
    }

    #[must_use]
    pub fn forbidden(mut self) -> Self {
        self.flags.presence = Presence::Forbidden;
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.flags.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.flags.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.flags.default = Some(DefaultValue::Value(value));
        self
    }

    #[must_use]
    pub fn default_fn(mut self, generator: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.flags.default = Some(DefaultValue::Dynamic(Arc::new(generator)));
        self
    }

    #[must_use]
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.flags.encoding = Some(encoding.into());
        self
    }

    #[must_use]
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.flags.date_format = Some(format.into());
        self
    }

    #[must_use]
    pub fn unknown(mut self, allowed: bool) -> Self {
        self.flags.unknown_keys_allowed = allowed;
        self
    }

    #[must_use]
    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.flags.match_mode = mode;
        self
    }

    #[must_use]
    pub fn convert(mut self, convert: bool) -> Self {
        self.flags.convert = convert;
        self
    }

    /// Exhaustive allow-list
    #[must_use]
    pub fn valid(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.valid_values.extend(values);
        self.flags.only = true;
        self
    }

    /// Extra accepted values on top of the node's type (e.g. `null`)
    #[must_use]
    pub fn allow(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.valid_values.extend(values);
        self
    }

    #[must_use]
    pub fn invalid(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.invalid_values.extend(values);
        self
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>, node: impl Into<NodeRef>) -> Self {
        self.children.push((key.into(), node.into()));
        self
    }

    #[must_use]
    pub fn pattern_keys(mut self, node: impl Into<NodeRef>) -> Self {
        self.key_pattern = Some(node.into());
        self
    }

    #[must_use]
    pub fn item(mut self, node: impl Into<NodeRef>) -> Self {
        self.items.push(node.into());
        self
    }

    #[must_use]
    pub fn try_node(mut self, node: impl Into<NodeRef>) -> Self {
        self.alternatives.push(node.into());
        self
    }

    #[must_use]
    pub fn when(mut self, conditional: Conditional) -> Self {
        self.conditionals.push(conditional);
        self
    }

    #[must_use]
    pub fn example(mut self, value: Value) -> Self {
        self.examples.push(value);
        self
    }

    #[must_use]
    pub fn class_name(mut self, name: impl Into<String>) -> Self {
        self.metadata.class_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn class_target(mut self, bucket: impl Into<String>) -> Self {
        self.metadata.class_target = Some(bucket.into());
        self
    }

    /// Literal schema keys merged over the compiled schema
    #[must_use]
    pub fn swagger(mut self, value: Value) -> Self {
        self.metadata.swagger = Some(value);
        self
    }

    /// Literal schema used verbatim instead of the compiled one
    #[must_use]
    pub fn swagger_override(mut self, value: Value) -> Self {
        self.metadata.swagger = Some(value);
        self.metadata.swagger_override = true;
        self
    }

    #[must_use]
    pub fn schema_override(mut self, node: impl Into<NodeRef>) -> Self {
        self.metadata.schema_override = Some(node.into());
        self
    }

    #[must_use]
    pub fn ref_value(mut self, reference: impl Into<String>, value: f64) -> Self {
        self.metadata.ref_values.insert(reference.into(), value);
        self
    }

    #[must_use]
    pub fn swagger_type(mut self, swagger_type: impl Into<String>) -> Self {
        self.metadata.swagger_type = Some(swagger_type.into());
        self
    }
}
