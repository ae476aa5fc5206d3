use crate::error::{Error, Result};
use crate::field_walker::follow_field_source;
use crate::model::{
    ApiModel, FieldKind, GeneratorConfig, ModelFieldKind, ParameterDef, ParameterLocation,
    PayloadSource, SerializerDef, SerializerFieldDef,
};
use crate::type_resolver::{resolve_type_hint, scalar_schema};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Prefix of every component pointer emitted into the document
pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

/// Schema generator - turns serializers into named object components.
///
/// The generator owns the component registry for exactly one generation
/// pass. Serializers register under their own name (with a `Request`
/// suffix for the write direction when request splitting is enabled) and
/// are referenced by `$ref` everywhere else. Field-level resolution
/// failures degrade to permissive fragments and are recorded as warnings;
/// only structural problems abort the pass.
pub struct SchemaGenerator<'a> {
    /// The model being generated from
    model: &'a ApiModel,
    /// Settings for this pass; taken from the model unless overridden
    config: GeneratorConfig,
    /// Components registered so far, in first-registration order
    components: IndexMap<String, Schema>,
    /// Components currently being introspected, to stop recursion
    in_progress: HashSet<String>,
    /// Non-fatal problems encountered during the pass
    warnings: Vec<String>,
}

/// Whether a schema describes responses (read) or requests (write)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Parameter with its resolved schema, handed to the document builder
#[derive(Debug, Clone)]
pub struct ParameterSchema {
    /// The parameter name
    pub name: String,
    /// OpenAPI `in` value: "path", "query" or "header"
    pub location: String,
    /// Whether the parameter must be supplied
    pub required: bool,
    /// Free-text description
    pub description: Option<String>,
    /// The resolved parameter schema
    pub schema: Schema,
}

/// An OpenAPI schema object.
///
/// Keys the generator never writes stay out of the output through
/// `skip_serializing_if`; unknown keys arriving through overrides are
/// preserved in `extra`, so hand-written fragments survive a round trip.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<Value>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub properties: IndexMap<String, Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(rename = "oneOf", skip_serializing_if = "Vec::is_empty", default)]
    pub one_of: Vec<Schema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(rename = "readOnly", skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(rename = "writeOnly", skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,
    /// Keys outside the generated vocabulary, kept verbatim
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

/// OpenAPI discriminator object for tagged unions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminator {
    #[serde(rename = "propertyName")]
    pub property_name: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub mapping: IndexMap<String, String>,
}

impl Schema {
    /// A schema with only a `type` keyword
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Default::default()
        }
    }

    /// Attach a `format` keyword
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// An empty object schema
    pub fn object() -> Self {
        Self::typed("object")
    }

    /// An object accepting arbitrary keys of arbitrary shape
    pub fn free_form_object() -> Self {
        let mut schema = Self::object();
        schema.additional_properties = Some(Box::new(Schema::default()));
        schema
    }

    /// An array schema with the given item schema
    pub fn array(items: Schema) -> Self {
        let mut schema = Self::typed("array");
        schema.items = Some(Box::new(items));
        schema
    }

    /// A `$ref` pointer to a named component
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", COMPONENTS_PREFIX, name)),
            ..Default::default()
        }
    }

    /// Whether this schema is nothing but a `$ref` pointer
    pub fn is_plain_reference(&self) -> bool {
        self.reference.is_some()
            && *self
                == Schema {
                    reference: self.reference.clone(),
                    ..Default::default()
                }
    }
}

impl<'a> SchemaGenerator<'a> {
    /// Create a generator for one pass over the given model
    pub fn new(model: &'a ApiModel) -> Self {
        debug!(
            "Initializing SchemaGenerator with {} serializers and {} entities",
            model.serializers.len(),
            model.entities.len()
        );
        Self {
            model,
            config: model.settings.clone(),
            components: IndexMap::new(),
            in_progress: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    /// Replace the settings carried by the model, mainly for embedding
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Components registered so far, in first-registration order
    pub fn components(&self) -> &IndexMap<String, Schema> {
        &self.components
    }

    /// Hand the registered components over, ending the pass
    pub fn into_components(self) -> IndexMap<String, Schema> {
        self.components
    }

    /// Non-fatal problems recorded during the pass
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Resolve a payload source into the schema placed under a media type
    pub fn resolve_payload(
        &mut self,
        source: &PayloadSource,
        direction: Direction,
    ) -> Result<Schema> {
        match source {
            PayloadSource::Serializer { name, many } => {
                let reference = self.ref_for_serializer(name, direction)?;
                Ok(if *many {
                    Schema::array(reference)
                } else {
                    reference
                })
            }
            PayloadSource::Polymorphic {
                component,
                serializers,
                discriminator,
                labels,
            } => self.resolve_polymorphic(
                component,
                serializers,
                discriminator,
                labels.as_ref(),
                direction,
            ),
        }
    }

    /// Register the serializer as a component (unless already present or
    /// in progress) and return a `$ref` to it.
    ///
    /// Referencing a serializer the model does not declare is a structural
    /// error and aborts the pass.
    pub fn ref_for_serializer(&mut self, name: &str, direction: Direction) -> Result<Schema> {
        let model = self.model;
        let serializer = model.serializer(name).ok_or_else(|| {
            Error::StructuralError(format!("reference to undeclared serializer `{}`", name))
        })?;

        let component = self.component_name(name, direction);
        if self.components.contains_key(&component) {
            return Ok(Schema::reference(&component));
        }
        if self.in_progress.contains(&component) {
            debug!("Recursive reference to {}; emitting a bare $ref", component);
            return Ok(Schema::reference(&component));
        }

        self.in_progress.insert(component.clone());
        let introspected = self.introspect_serializer(serializer, direction);
        self.in_progress.remove(&component);

        self.register_component(&component, introspected?)?;
        Ok(Schema::reference(&component))
    }

    /// The entity bound to a payload's serializer, if any. The document
    /// builder uses it to type path variables nobody declared.
    pub fn payload_entity(&self, source: &PayloadSource) -> Option<&'a str> {
        let model = self.model;
        match source {
            PayloadSource::Serializer { name, .. } => {
                model.serializer(name)?.entity.as_deref()
            }
            // Candidates may be bound to different entities, so a union
            // offers no single key type to derive from.
            PayloadSource::Polymorphic { .. } => None,
        }
    }

    /// The component name a serializer registers under for a direction
    pub fn component_name(&self, base: &str, direction: Direction) -> String {
        if self.config.split_request && direction == Direction::Write {
            format!("{}Request", base)
        } else {
            base.to_string()
        }
    }

    /// Resolve a declared parameter into its document form
    pub fn generate_parameter_schema(&mut self, parameter: &ParameterDef) -> ParameterSchema {
        let schema = match &parameter.hint {
            Some(hint) => resolve_type_hint(hint, self.config.coerce_decimal_to_string),
            None => Schema::typed("string"),
        };
        // Path parameters are required no matter what was declared
        let required = match parameter.location {
            ParameterLocation::Path => true,
            _ => parameter.required.unwrap_or(false),
        };
        ParameterSchema {
            name: parameter.name.clone(),
            location: parameter.location.as_str().to_string(),
            required,
            description: parameter.description.clone(),
            schema,
        }
    }

    /// Derive the schema of an undeclared path variable from the entity a
    /// payload serializer is bound to. Falls back to string with a warning.
    pub fn path_parameter_schema(&mut self, entity: Option<&str>, var: &str) -> Schema {
        let model = self.model;
        if let Some(entity_def) = entity.and_then(|name| model.entity(name)) {
            if let Some(field) = entity_def.lookup(var) {
                if let Some(target) = field.kind.relation_target() {
                    // A relation variable carries the target's key value
                    if let Some(target_def) = model.entity(target) {
                        return self.model_field_schema(&target_def.primary_key().kind);
                    }
                } else {
                    return self.model_field_schema(&field.kind);
                }
            }
        }
        self.warn(format!(
            "could not derive a type for path parameter `{{{}}}`; assuming string",
            var
        ));
        Schema::typed("string")
    }

    /// Build the object schema for one serializer in one direction
    fn introspect_serializer(
        &mut self,
        serializer: &SerializerDef,
        direction: Direction,
    ) -> Result<Schema> {
        debug!(
            "Introspecting serializer {} ({:?})",
            serializer.name, direction
        );

        let mut schema = Schema::object();
        for field in &serializer.fields {
            if !self.field_in_direction(field, direction) {
                continue;
            }

            let mut property = self.resolve_field(serializer, field, direction)?;
            if field.nullable {
                property.nullable = Some(true);
            }
            if field.read_only {
                property.read_only = Some(true);
            }
            if field.write_only {
                property.write_only = Some(true);
            }
            if !field.read_only && !field.has_default {
                schema.required.push(field.name.clone());
            }
            schema.properties.insert(field.name.clone(), property);
        }
        Ok(schema)
    }

    /// Resolve a single serializer field into its property schema
    fn resolve_field(
        &mut self,
        serializer: &SerializerDef,
        field: &SerializerFieldDef,
        direction: Direction,
    ) -> Result<Schema> {
        match &field.kind {
            FieldKind::Typed(hint) => Ok(resolve_type_hint(hint, self.effective_coercion(field))),
            FieldKind::Nested {
                serializer: nested,
                many,
            } => {
                let reference = self.ref_for_serializer(nested, direction)?;
                Ok(if *many {
                    Schema::array(reference)
                } else {
                    reference
                })
            }
            FieldKind::Related => Ok(self.resolve_related_field(serializer, field)),
            FieldKind::Method { returns } => match returns {
                Some(hint) => Ok(resolve_type_hint(hint, self.effective_coercion(field))),
                None => {
                    self.warn(format!(
                        "method field `{}.{}` has no return hint; falling back to an unconstrained object",
                        serializer.name, field.name
                    ));
                    Ok(Schema::free_form_object())
                }
            },
        }
    }

    /// Resolve a field derived from the bound entity by walking its source
    /// path. Walk failures degrade to an unconstrained object.
    fn resolve_related_field(
        &mut self,
        serializer: &SerializerDef,
        field: &SerializerFieldDef,
    ) -> Schema {
        let source = field.source.as_deref().unwrap_or(&field.name);
        let segments: Vec<&str> = source.split('.').collect();

        let entity = match serializer.entity.as_deref() {
            Some(entity) => entity,
            None => {
                self.warn(format!(
                    "related field `{}.{}` needs a serializer bound to an entity; falling back to an unconstrained object",
                    serializer.name, field.name
                ));
                return Schema::free_form_object();
            }
        };

        match follow_field_source(self.model, entity, &segments) {
            Ok(walked) => {
                let mut schema = self.model_field_schema(&walked.kind);
                if walked.nullable {
                    schema.nullable = Some(true);
                }
                schema
            }
            Err(err) => {
                self.warn(format!(
                    "could not resolve source `{}` of field `{}.{}`: {}; falling back to an unconstrained object",
                    source, serializer.name, field.name, err
                ));
                Schema::free_form_object()
            }
        }
    }

    /// Schema of an entity field. The walker normalizes terminals to
    /// concrete kinds, but an entity may still use a relation as its own
    /// key, which renders as its integer id.
    fn model_field_schema(&self, kind: &ModelFieldKind) -> Schema {
        match kind {
            ModelFieldKind::Scalar(scalar) => {
                scalar_schema(*scalar, self.config.coerce_decimal_to_string)
            }
            ModelFieldKind::Auto => Schema::typed("integer"),
            ModelFieldKind::ForeignKey { .. }
            | ModelFieldKind::OneToOne { .. }
            | ModelFieldKind::ManyToMany { .. } => Schema::typed("integer"),
        }
    }

    /// Whether a field appears in the component for a direction
    fn field_in_direction(&self, field: &SerializerFieldDef, direction: Direction) -> bool {
        if !self.config.split_request {
            return true;
        }
        match direction {
            Direction::Read => !field.write_only,
            Direction::Write => !field.read_only,
        }
    }

    fn effective_coercion(&self, field: &SerializerFieldDef) -> bool {
        field
            .coerce_to_string
            .unwrap_or(self.config.coerce_decimal_to_string)
    }

    /// Register a named component. Identical re-registration is a no-op;
    /// a name clash with different structure aborts the pass.
    pub(crate) fn register_component(&mut self, name: &str, schema: Schema) -> Result<()> {
        if let Some(existing) = self.components.get(name) {
            if *existing == schema {
                debug!(
                    "Component {} already registered with identical structure",
                    name
                );
                return Ok(());
            }
            return Err(Error::StructuralError(format!(
                "component `{}` registered twice with different structure",
                name
            )));
        }
        debug!("Registering component {}", name);
        self.components.insert(name.to_string(), schema);
        Ok(())
    }

    /// Record a non-fatal problem and log it
    pub(crate) fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}
