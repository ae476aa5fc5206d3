//! Post-generation checks over an assembled OpenAPI document.
//!
//! Validation never runs mid-generation; it inspects the finished document
//! and reports every problem it finds at once, so the caller can still
//! write the artifact and read the full list.

use crate::error::{Error, Result};
use crate::openapi_builder::{path_template_vars, OpenApiDocument, Operation};
use crate::schema_generator::{Schema, COMPONENTS_PREFIX};
use log::debug;
use serde_json::Value;
use std::collections::HashSet;

/// Validate an assembled document.
///
/// Checks the document skeleton (version, info, path shapes), that every
/// operation declares responses and covers its path variables with
/// required path parameters, that every `$ref` pointer resolves to a
/// registered component, that discriminator mappings stay within their
/// union, and that component names use the allowed charset.
///
/// All findings are collected into one `Error::ValidationError`.
pub fn validate_document(document: &OpenApiDocument) -> Result<()> {
    debug!("Validating assembled OpenAPI document");
    let mut issues = Vec::new();

    if !document.openapi.starts_with("3.") {
        issues.push(format!(
            "unsupported openapi version `{}`",
            document.openapi
        ));
    }
    if document.info.title.is_empty() {
        issues.push("info.title must not be empty".to_string());
    }
    if document.info.version.is_empty() {
        issues.push("info.version must not be empty".to_string());
    }

    let components = document
        .components
        .as_ref()
        .and_then(|components| components.schemas.as_ref());
    let component_names: HashSet<&str> = components
        .map(|schemas| schemas.keys().map(String::as_str).collect())
        .unwrap_or_default();

    for (path, item) in &document.paths {
        if !path.starts_with('/') {
            issues.push(format!("path `{}` does not start with `/`", path));
        }
        let vars = path_template_vars(path);
        for (method, operation) in item.operations() {
            let label = format!("{} {}", method.to_uppercase(), path);
            check_operation(&label, operation, &vars, &component_names, &mut issues);
        }
    }

    if let Some(schemas) = components {
        for (name, schema) in schemas {
            if !valid_component_name(name) {
                issues.push(format!(
                    "component name `{}` contains characters outside A-Z a-z 0-9 . _ -",
                    name
                ));
            }
            check_schema(&format!("component `{}`", name), schema, &component_names, &mut issues);
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::ValidationError(issues))
    }
}

fn check_operation(
    label: &str,
    operation: &Operation,
    path_vars: &[String],
    component_names: &HashSet<&str>,
    issues: &mut Vec<String>,
) {
    if operation.responses.is_empty() {
        issues.push(format!("{} declares no responses", label));
    }

    for var in path_vars {
        let covered = operation.parameters.as_deref().is_some_and(|parameters| {
            parameters
                .iter()
                .any(|p| p.location == "path" && p.name == *var && p.required)
        });
        if !covered {
            issues.push(format!(
                "{} does not declare required path parameter `{}`",
                label, var
            ));
        }
    }

    if let Some(parameters) = &operation.parameters {
        for parameter in parameters {
            check_schema(
                &format!("{} parameter `{}`", label, parameter.name),
                &parameter.schema,
                component_names,
                issues,
            );
        }
    }
    if let Some(request_body) = &operation.request_body {
        for media_type in request_body.content.values() {
            check_schema(
                &format!("{} request body", label),
                &media_type.schema,
                component_names,
                issues,
            );
        }
    }
    for (status, response) in &operation.responses {
        if let Some(content) = &response.content {
            for media_type in content.values() {
                check_schema(
                    &format!("{} response {}", label, status),
                    &media_type.schema,
                    component_names,
                    issues,
                );
            }
        }
    }
}

/// Check every `$ref` and discriminator reachable from a schema
fn check_schema(
    label: &str,
    schema: &Schema,
    component_names: &HashSet<&str>,
    issues: &mut Vec<String>,
) {
    let mut refs = Vec::new();
    collect_schema_refs(schema, &mut refs);
    for reference in refs {
        match reference.strip_prefix(COMPONENTS_PREFIX) {
            Some(target) if component_names.contains(target) => {}
            Some(target) => issues.push(format!(
                "{} points at unregistered component `{}`",
                label, target
            )),
            None => issues.push(format!(
                "{} uses a pointer outside the components section: `{}`",
                label, reference
            )),
        }
    }

    walk_schema(schema, &mut |visited| {
        if let Some(discriminator) = &visited.discriminator {
            let union: HashSet<&str> = visited
                .one_of
                .iter()
                .filter_map(|candidate| candidate.reference.as_deref())
                .collect();
            for (value, target) in &discriminator.mapping {
                if !union.contains(target.as_str()) {
                    issues.push(format!(
                        "{} maps discriminator value `{}` to `{}`, which is not a oneOf candidate",
                        label, value, target
                    ));
                }
            }
        }
    });
}

fn walk_schema<'s>(schema: &'s Schema, visit: &mut impl FnMut(&'s Schema)) {
    visit(schema);
    for property in schema.properties.values() {
        walk_schema(property, visit);
    }
    if let Some(items) = &schema.items {
        walk_schema(items, visit);
    }
    if let Some(additional) = &schema.additional_properties {
        walk_schema(additional, visit);
    }
    for candidate in &schema.one_of {
        walk_schema(candidate, visit);
    }
}

fn collect_schema_refs<'s>(schema: &'s Schema, refs: &mut Vec<&'s str>) {
    if let Some(reference) = &schema.reference {
        refs.push(reference);
    }
    for property in schema.properties.values() {
        collect_schema_refs(property, refs);
    }
    if let Some(items) = &schema.items {
        collect_schema_refs(items, refs);
    }
    if let Some(additional) = &schema.additional_properties {
        collect_schema_refs(additional, refs);
    }
    for candidate in &schema.one_of {
        collect_schema_refs(candidate, refs);
    }
    // Override fragments can smuggle pointers in under keys the generator
    // never writes itself (allOf, anyOf, ...)
    for value in schema.extra.values() {
        collect_value_refs(value, refs);
    }
}

fn collect_value_refs<'v>(value: &'v Value, refs: &mut Vec<&'v str>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if key == "$ref" {
                    if let Some(reference) = nested.as_str() {
                        refs.push(reference);
                    }
                } else {
                    collect_value_refs(nested, refs);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_value_refs(item, refs);
            }
        }
        _ => {}
    }
}

fn valid_component_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}
