//! OpenAPI 3.0 document model shared by the ruledoc compiler.
//!
//! The types here only describe the output shape; nothing in this crate
//! knows how validation rules become schemas.

pub mod openapi;
pub mod route;
pub mod schema;

pub use schema::{Reference, Schema, SchemaRef, SchemaType};
