//! Rendering module for converting OpenAPI documents to YAML or JSON format.
//!
//! This module provides functions to render generated documents into standard
//! formats and write them to files or return them as strings.

use crate::openapi_builder::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Renders an OpenAPI document to YAML format.
///
/// The output is standard YAML, suitable for OpenAPI tools and
/// documentation generators.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```ignore
/// use openapi_from_model::openapi_builder::OpenApiBuilder;
/// use openapi_from_model::render::render_yaml;
/// use openapi_from_model::schema_generator::SchemaGenerator;
///
/// let builder = OpenApiBuilder::from_model(&model);
/// let doc = builder.build(SchemaGenerator::new(&model));
/// println!("{}", render_yaml(&doc).unwrap());
/// ```
pub fn render_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Rendering OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to render OpenAPI document to YAML")
}

/// Renders an OpenAPI document to JSON format with pretty printing.
///
/// The output is indented for readability, making it suitable for human
/// review and version control.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Rendering OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to render OpenAPI document to JSON")
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does.
/// Missing parent directories are created first.
///
/// # Errors
///
/// Returns an error if a directory or the file cannot be created or
/// written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!(
        "Successfully wrote {} bytes to {}",
        content.len(),
        path.display()
    );
    Ok(())
}
