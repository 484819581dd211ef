use thiserror::Error;

/// Fatal failures of a document build.
///
/// None of these are recovered locally: the first one aborts the build.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("no schema was provided")]
    NoSchemaProvided,

    #[error("unrecognized schema type: {kind}")]
    UnrecognizedType { kind: String },

    #[error("schema override nodes cannot themselves declare an override")]
    NestedOverride,

    #[error("schema has no usable name: label ad hoc body schemas or register them as components")]
    MissingLabel,

    #[error("component name conflict: `{name}` is already bound to a different schema shape")]
    LabelConflict { name: String },

    #[error("route parameter `{name}` is not declared in the component parameters")]
    UndeclaredParameter { name: String },

    #[error("invalid parameter component `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("class target `{name}` is reserved for assembled parameter components")]
    ReservedClassTarget { name: String },

    #[error("schema nesting exceeds the configured depth limit of {limit}")]
    DepthExceeded { limit: usize },

    #[error("schema override is not a valid schema object: {0}")]
    InvalidOverride(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// Errors raised while loading [`BuildOptions`](crate::options::BuildOptions).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
