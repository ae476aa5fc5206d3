//! OpenAPI Model Generator - OpenAPI documents from a declarative API model.
//!
//! This library generates OpenAPI 3.0 documents from a model file describing
//! entities (persistent objects with typed fields and relations), serializers
//! (exposure rules over those entities) and endpoints. Serializers become
//! named, reusable schema components; endpoints become paths and operations
//! referencing them.
//!
//! # Architecture
//!
//! The library is organized into several modules that work together:
//!
//! 1. [`model`] - Loads the declarative API model from YAML or JSON
//! 2. [`type_resolver`] - Resolves declared type hints into schema fragments
//! 3. [`field_walker`] - Follows relational source paths across the entity graph
//! 4. [`schema_generator`] - Expands serializers into named schema components
//! 5. [`polymorphic`] - Merges serializer alternatives into discriminated unions
//! 6. [`overrides`] - Merges hand-written fragments over derived schemas
//! 7. [`openapi_builder`] - Constructs the complete OpenAPI document
//! 8. [`render`] - Renders the document to YAML or JSON
//! 9. [`validation`] - Checks the assembled document for structural problems
//!
//! # Example Usage
//!
//! ```no_run
//! use openapi_from_model::model::load_model;
//! use openapi_from_model::openapi_builder::OpenApiBuilder;
//! use openapi_from_model::render::render_yaml;
//! use openapi_from_model::schema_generator::SchemaGenerator;
//! use std::path::Path;
//!
//! // Load the declarative model
//! let model = load_model(Path::new("./api-model.yaml")).unwrap();
//!
//! // Resolve serializers into components and document every endpoint
//! let mut schema_gen = SchemaGenerator::new(&model);
//! let mut builder = OpenApiBuilder::from_model(&model);
//! for endpoint in &model.endpoints {
//!     builder.add_endpoint(endpoint, &mut schema_gen).unwrap();
//! }
//! let document = builder.build(schema_gen);
//!
//! // Render to YAML
//! let yaml = render_yaml(&document).unwrap();
//! println!("{}", yaml);
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module which provides a complete CLI application.

pub mod cli;
pub mod model;
pub mod type_resolver;
pub mod field_walker;
pub mod schema_generator;
pub mod polymorphic;
pub mod overrides;
pub mod openapi_builder;
pub mod render;
pub mod validation;
pub mod error;
