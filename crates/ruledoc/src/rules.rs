//! Rule extraction for scalar kinds.
//!
//! Each extractor is a pure function of a node's rules and flags: it never
//! recurses and never touches the component registry.

use serde_json::Value;

use ruledoc_core::schema::{Schema, SchemaRef, SchemaType};

use crate::node::{Case, Kind, Limit, Metadata, Rule, SchemaNode, Sign};
use crate::options::BuildOptions;

const ALPHANUM_PATTERN: &str = "^[a-zA-Z0-9]*$";
const ALPHANUM_LOWER_PATTERN: &str = "^[a-z0-9]*$";
const ALPHANUM_UPPER_PATTERN: &str = "^[A-Z0-9]*$";
const TOKEN_PATTERN: &str = "^[a-zA-Z0-9_]*$";

/// Derive the schema of a scalar node, `None` for composite and unknown kinds.
pub fn extract(node: &SchemaNode, options: &BuildOptions) -> Option<Schema> {
    let schema = match node.kind {
        Kind::Number => number(node),
        Kind::String => string(node),
        Kind::Binary => binary(node),
        Kind::Date => date(node, options),
        Kind::Boolean => {
            let mut schema = Schema::boolean();
            apply_value_sets(node, &mut schema, Value::is_boolean);
            schema
        }
        Kind::Any => any(node),
        Kind::Object | Kind::Array | Kind::Alternatives | Kind::Custom(_) => return None,
    };
    Some(schema)
}

/// Resolve a rule limit; unresolved sibling references fall back to `0`.
pub(crate) fn resolve_limit(limit: &Limit, metadata: &Metadata) -> f64 {
    match limit {
        Limit::Value(value) => *value,
        Limit::Ref(name) => metadata.ref_values.get(name).copied().unwrap_or(0.0),
    }
}

/// Resolve a limit used as a length or count.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn resolve_count(limit: &Limit, metadata: &Metadata) -> usize {
    resolve_limit(limit, metadata).max(0.0) as usize
}

fn number(node: &SchemaNode) -> Schema {
    let mut schema = if node.has_rule(|r| matches!(r, Rule::Integer)) {
        Schema::integer()
    } else {
        let format = if node.has_rule(|r| matches!(r, Rule::Precision(_))) {
            "double"
        } else {
            "float"
        };
        Schema {
            format: Some(format.to_string()),
            ..Schema::number()
        }
    };

    for rule in &node.rules {
        match rule {
            Rule::Sign(Sign::Positive) => schema.minimum = Some(1.0),
            Rule::Sign(Sign::Negative) => schema.maximum = Some(-1.0),
            Rule::Min(limit) => schema.minimum = Some(resolve_limit(limit, &node.metadata)),
            Rule::Max(limit) => schema.maximum = Some(resolve_limit(limit, &node.metadata)),
            Rule::Greater(limit) => {
                schema.minimum = Some(resolve_limit(limit, &node.metadata));
                schema.exclusive_minimum = Some(true);
            }
            Rule::Less(limit) => {
                schema.maximum = Some(resolve_limit(limit, &node.metadata));
                schema.exclusive_maximum = Some(true);
            }
            Rule::Multiple(factor) => schema.multiple_of = Some(*factor),
            _ => {}
        }
    }

    apply_value_sets(node, &mut schema, Value::is_number);
    schema
}

fn alphanum_pattern(case: Option<Case>, convert: bool) -> &'static str {
    match (case, convert) {
        (Some(Case::Lower), false) => ALPHANUM_LOWER_PATTERN,
        (Some(Case::Upper), false) => ALPHANUM_UPPER_PATTERN,
        _ => ALPHANUM_PATTERN,
    }
}

fn string(node: &SchemaNode) -> Schema {
    let mut schema = Schema::string();

    // Precedence is fixed regardless of declaration order: alphanum < token < pattern,
    // and any format clears the pattern.
    if node.has_rule(|r| matches!(r, Rule::Alphanum)) {
        let case = node.rules.iter().find_map(|r| match r {
            Rule::Case(case) => Some(*case),
            _ => None,
        });
        schema.pattern = Some(alphanum_pattern(case, node.flags.convert).to_string());
    }
    if node.has_rule(|r| matches!(r, Rule::Token)) {
        schema.pattern = Some(TOKEN_PATTERN.to_string());
    }
    if let Some(source) = node.rules.iter().rev().find_map(|r| match r {
        Rule::Pattern(source) => Some(source),
        _ => None,
    }) {
        schema.pattern = Some(source.clone());
    }

    for (present, format) in [
        (node.has_rule(|r| matches!(r, Rule::Email)), "email"),
        (node.has_rule(|r| matches!(r, Rule::IsoDate)), "date-time"),
        (node.has_rule(|r| matches!(r, Rule::Guid)), "uuid"),
    ] {
        if present {
            schema.format = Some(format.to_string());
            schema.pattern = None;
        }
    }

    apply_lengths(node, &mut schema);
    apply_value_sets(node, &mut schema, Value::is_string);
    schema
}

fn binary(node: &SchemaNode) -> Schema {
    let format = if node.flags.encoding.as_deref() == Some("base64") {
        "byte"
    } else {
        "binary"
    };
    let mut schema = Schema {
        format: Some(format.to_string()),
        ..Schema::string()
    };
    apply_lengths(node, &mut schema);
    apply_value_sets(node, &mut schema, Value::is_string);
    schema
}

fn date(node: &SchemaNode, options: &BuildOptions) -> Schema {
    let format = if node.flags.date_format.as_deref() == Some(options.date_only_format.as_str()) {
        "date"
    } else {
        "date-time"
    };
    let mut schema = Schema {
        format: Some(format.to_string()),
        ..Schema::string()
    };
    apply_value_sets(node, &mut schema, Value::is_string);
    schema
}

fn any(node: &SchemaNode) -> Schema {
    let mut schema = Schema::default();
    if node.metadata.swagger_type.as_deref() == Some("file") {
        schema.schema_type = Some(SchemaType::File);
        schema.set_extension("in", Value::String("formData".to_string()));
    }
    apply_value_sets(node, &mut schema, |value| !value.is_null());
    schema
}

fn apply_lengths(node: &SchemaNode, schema: &mut Schema) {
    for rule in &node.rules {
        match rule {
            Rule::Min(limit) => schema.min_length = Some(resolve_count(limit, &node.metadata)),
            Rule::Max(limit) => schema.max_length = Some(resolve_count(limit, &node.metadata)),
            Rule::Length(limit) => {
                let length = resolve_count(limit, &node.metadata);
                schema.min_length = Some(length);
                schema.max_length = Some(length);
            }
            _ => {}
        }
    }
}

/// `enum` from an exhaustive allow-list and `not: {enum}` from a deny-list,
/// both restricted to values of the node's own type.
fn apply_value_sets(node: &SchemaNode, schema: &mut Schema, accepts: impl Fn(&Value) -> bool) {
    if node.flags.only {
        let allowed: Vec<Value> = node.valid_values.iter().filter(|v| accepts(v)).cloned().collect();
        if !allowed.is_empty() {
            schema.r#enum = Some(allowed);
        }
    }

    let denied: Vec<Value> = node.invalid_values.iter().filter(|v| accepts(v)).cloned().collect();
    if !denied.is_empty() {
        schema.not = Some(Box::new(SchemaRef::inline(Schema {
            r#enum: Some(denied),
            ..Schema::default()
        })));
    }
}
