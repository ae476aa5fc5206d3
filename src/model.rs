//! Declarative API model loaded from a YAML or JSON file.
//!
//! The model is the single input of the generator. It declares entities
//! (persistent objects with typed fields and relations), serializers
//! (exposure rules over those entities) and endpoints (path + method +
//! payload sources), plus document metadata and generator settings.
//!
//! # Example
//!
//! ```yaml
//! info:
//!   title: Blog API
//!   version: 1.0.0
//! entities:
//!   - name: Author
//!     fields:
//!       - name: name
//!         kind: {scalar: string}
//! serializers:
//!   - name: AuthorSerializer
//!     entity: Author
//!     fields:
//!       - name: id
//!         kind: related
//!         read_only: true
//!       - name: name
//!         kind:
//!           typed: {scalar: string}
//! endpoints:
//!   - path: /authors/:id
//!     method: get
//!     operation_id: retrieve_author
//!     response:
//!       serializer: {name: AuthorSerializer}
//! ```

use crate::error::{Error, Result};
use crate::openapi_builder::Info;
use crate::type_resolver::TypeHint;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Complete API model as declared by the input file.
///
/// Every section is optional in the file; an empty model produces an empty
/// but well-formed document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiModel {
    /// Document metadata (title, version, description)
    #[serde(default)]
    pub info: Info,
    /// Server objects copied verbatim into the document
    #[serde(default)]
    pub servers: Vec<Value>,
    /// Tag objects copied verbatim into the document
    #[serde(default)]
    pub tags: Vec<Value>,
    /// Global security requirement copied verbatim into the document
    #[serde(default)]
    pub security: Option<Value>,
    /// Security scheme objects copied verbatim into `components`
    #[serde(default)]
    pub security_schemes: IndexMap<String, Value>,
    /// Generator settings for this model
    #[serde(default)]
    pub settings: GeneratorConfig,
    /// Persistent entities with fields and relations
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    /// Serializers exposing entities or free-standing shapes
    #[serde(default)]
    pub serializers: Vec<SerializerDef>,
    /// Endpoints to document
    #[serde(default)]
    pub endpoints: Vec<EndpointDef>,
}

/// Settings controlling a generation pass.
///
/// Carried by the model file and handed to the generator explicitly; there
/// is no global registry to consult.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Emit separate `<Name>Request` components for the write direction
    #[serde(default)]
    pub split_request: bool,
    /// Render decimals as `string`/`decimal` instead of `number`/`double`
    #[serde(default = "default_true")]
    pub coerce_decimal_to_string: bool,
}

fn default_true() -> bool {
    true
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            split_request: false,
            coerce_decimal_to_string: true,
        }
    }
}

/// A persistent entity with typed fields and relations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDef {
    /// The entity name, unique within the model
    pub name: String,
    /// Declared fields; a primary key is synthesized when none is marked
    #[serde(default)]
    pub fields: Vec<ModelFieldDef>,
}

/// A single field on an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFieldDef {
    /// Field name
    pub name: String,
    /// What kind of field this is
    pub kind: ModelFieldKind,
    /// Whether the stored value may be null
    #[serde(default)]
    pub nullable: bool,
    /// Whether this field is the entity's primary key
    #[serde(default)]
    pub primary_key: bool,
}

/// Kind of an entity field.
///
/// Relations carry the target entity name; `related_name` overrides the
/// accessor used when traversing the relation in reverse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFieldKind {
    /// A plain scalar column
    Scalar(crate::type_resolver::ScalarKind),
    /// An auto-incrementing integer key
    Auto,
    /// A many-to-one relation to another entity
    ForeignKey {
        to: String,
        #[serde(default)]
        related_name: Option<String>,
    },
    /// A one-to-one relation to another entity
    OneToOne {
        to: String,
        #[serde(default)]
        related_name: Option<String>,
    },
    /// A many-to-many relation to another entity
    ManyToMany {
        to: String,
        #[serde(default)]
        related_name: Option<String>,
    },
}

impl ModelFieldKind {
    /// The target entity name if this field is a relation
    pub fn relation_target(&self) -> Option<&str> {
        match self {
            ModelFieldKind::ForeignKey { to, .. }
            | ModelFieldKind::OneToOne { to, .. }
            | ModelFieldKind::ManyToMany { to, .. } => Some(to),
            _ => None,
        }
    }

    /// The declared reverse accessor if this field is a relation
    pub fn related_name(&self) -> Option<&str> {
        match self {
            ModelFieldKind::ForeignKey { related_name, .. }
            | ModelFieldKind::OneToOne { related_name, .. }
            | ModelFieldKind::ManyToMany { related_name, .. } => related_name.as_deref(),
            _ => None,
        }
    }
}

/// A serializer describing how an entity (or free-standing shape) is exposed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializerDef {
    /// The serializer name; also the component name it registers under
    pub name: String,
    /// The entity this serializer is bound to, if any
    #[serde(default)]
    pub entity: Option<String>,
    /// Declared fields in exposure order
    #[serde(default)]
    pub fields: Vec<SerializerFieldDef>,
}

/// A single serializer field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializerFieldDef {
    /// Exposed property name
    pub name: String,
    /// How the field's schema is obtained
    pub kind: FieldKind,
    /// Dotted path into the bound entity; defaults to the field name
    #[serde(default)]
    pub source: Option<String>,
    /// Present in responses only
    #[serde(default)]
    pub read_only: bool,
    /// Present in requests only
    #[serde(default)]
    pub write_only: bool,
    /// Whether the exposed value may be null
    #[serde(default)]
    pub nullable: bool,
    /// Whether the field carries a default and may be omitted on write
    #[serde(default)]
    pub has_default: bool,
    /// Per-field override of the decimal coercion setting
    #[serde(default)]
    pub coerce_to_string: Option<bool>,
}

/// How a serializer field obtains its schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A declared type hint resolved directly
    Typed(TypeHint),
    /// A nested serializer registered as its own component
    Nested {
        serializer: String,
        #[serde(default)]
        many: bool,
    },
    /// Derived from the bound entity by following the source path
    Related,
    /// A computed field; without a return hint it degrades to an
    /// unconstrained object
    Method {
        #[serde(default)]
        returns: Option<TypeHint>,
    },
}

/// A single endpoint to document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDef {
    /// URL path, `:param` or `{param}` style
    pub path: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Unique operation id
    pub operation_id: String,
    /// Free-text description of the operation
    #[serde(default)]
    pub description: Option<String>,
    /// Tags attached to the operation
    #[serde(default)]
    pub tags: Vec<String>,
    /// Where the request body schema comes from
    #[serde(default)]
    pub request: Option<PayloadSource>,
    /// Where the response schema comes from
    #[serde(default)]
    pub response: Option<PayloadSource>,
    /// Response status code; defaults per method when omitted
    #[serde(default)]
    pub status: Option<String>,
    /// Declared parameters
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
    /// Hand-written fragments merged over the derived operation
    #[serde(default)]
    pub overrides: OperationOverrides,
}

/// Source of a request or response payload schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSource {
    /// A declared serializer; `many` wraps it in an array
    Serializer {
        name: String,
        #[serde(default)]
        many: bool,
    },
    /// A discriminated union over several serializers
    Polymorphic {
        /// Component name the union registers under
        component: String,
        /// Candidate serializers in declared order
        serializers: Vec<String>,
        /// Property the consumer dispatches on
        discriminator: String,
        /// Discriminator labels per candidate; defaults to component names
        #[serde(default)]
        labels: Option<IndexMap<String, String>>,
    },
}

/// Hand-written fragments applied after derivation.
///
/// `request` and `response` merge into the derived payload schema, or
/// stand in for it entirely when the derivation is a bare `$ref` pointer;
/// `parameters` replaces the derived list wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationOverrides {
    #[serde(default)]
    pub request: Option<Value>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub parameters: Option<Vec<ParameterDef>>,
}

/// A declared operation parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDef {
    /// The parameter name
    pub name: String,
    /// Where the parameter lives
    pub location: ParameterLocation,
    /// Declared type; defaults to string when omitted
    #[serde(rename = "type", default)]
    pub hint: Option<TypeHint>,
    /// Explicit requiredness; path parameters default to required
    #[serde(default)]
    pub required: Option<bool>,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
}

/// The location a parameter value is extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Path parameter embedded in the URL (e.g., `/users/{id}`)
    Path,
    /// Query string parameter (e.g., `?page=1&limit=10`)
    Query,
    /// HTTP header parameter
    Header,
}

impl ParameterLocation {
    /// The OpenAPI `in` value for this location
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
        }
    }
}

/// HTTP methods supported by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// HTTP GET method
    Get,
    /// HTTP POST method
    Post,
    /// HTTP PUT method
    Put,
    /// HTTP DELETE method
    Delete,
    /// HTTP PATCH method
    Patch,
    /// HTTP OPTIONS method
    Options,
    /// HTTP HEAD method
    Head,
}

impl HttpMethod {
    /// Uppercase method name for summaries and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Default success status when the endpoint declares none
    pub fn default_status(&self) -> &'static str {
        match self {
            HttpMethod::Post => "201",
            HttpMethod::Delete => "204",
            _ => "200",
        }
    }

    /// Whether operations with this method carry a request body
    pub fn has_request_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl ApiModel {
    /// Find an entity by name
    pub fn entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Find a serializer by name
    pub fn serializer(&self, name: &str) -> Option<&SerializerDef> {
        self.serializers.iter().find(|s| s.name == name)
    }
}

impl EntityDef {
    /// Create a new entity with no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field
    pub fn with_field(mut self, field: ModelFieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Find a declared field by name
    pub fn field(&self, name: &str) -> Option<&ModelFieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn has_explicit_pk(&self) -> bool {
        self.fields.iter().any(|f| f.primary_key)
    }

    /// The entity's primary key.
    ///
    /// Falls back to a synthesized auto-incrementing `id` when no field is
    /// marked as the key.
    pub fn primary_key(&self) -> ModelFieldDef {
        self.fields
            .iter()
            .find(|f| f.primary_key)
            .cloned()
            .unwrap_or_else(|| {
                let mut id = ModelFieldDef::auto("id");
                id.primary_key = true;
                id
            })
    }

    /// Find a field by name, including the synthesized primary key
    pub fn lookup(&self, name: &str) -> Option<ModelFieldDef> {
        if let Some(field) = self.field(name) {
            return Some(field.clone());
        }
        if name == "id" && !self.has_explicit_pk() {
            return Some(self.primary_key());
        }
        None
    }
}

impl ModelFieldDef {
    /// Create a scalar field
    pub fn scalar(name: impl Into<String>, kind: crate::type_resolver::ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind: ModelFieldKind::Scalar(kind),
            nullable: false,
            primary_key: false,
        }
    }

    /// Create an auto-incrementing key field
    pub fn auto(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModelFieldKind::Auto,
            nullable: false,
            primary_key: false,
        }
    }

    /// Create a many-to-one relation field
    pub fn foreign_key(name: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModelFieldKind::ForeignKey {
                to: to.into(),
                related_name: None,
            },
            nullable: false,
            primary_key: false,
        }
    }

    /// Create a one-to-one relation field
    pub fn one_to_one(name: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModelFieldKind::OneToOne {
                to: to.into(),
                related_name: None,
            },
            nullable: false,
            primary_key: false,
        }
    }

    /// Create a many-to-many relation field
    pub fn many_to_many(name: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ModelFieldKind::ManyToMany {
                to: to.into(),
                related_name: None,
            },
            nullable: false,
            primary_key: false,
        }
    }

    /// Set the reverse accessor of a relation field
    pub fn with_related_name(mut self, related_name: impl Into<String>) -> Self {
        match &mut self.kind {
            ModelFieldKind::ForeignKey { related_name: r, .. }
            | ModelFieldKind::OneToOne { related_name: r, .. }
            | ModelFieldKind::ManyToMany { related_name: r, .. } => *r = Some(related_name.into()),
            _ => {}
        }
        self
    }

    /// Mark the field nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the field as the primary key
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

impl SerializerDef {
    /// Create a new serializer with no fields
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: None,
            fields: Vec::new(),
        }
    }

    /// Bind the serializer to an entity
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Append a field
    pub fn with_field(mut self, field: SerializerFieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

impl SerializerFieldDef {
    fn base(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            source: None,
            read_only: false,
            write_only: false,
            nullable: false,
            has_default: false,
            coerce_to_string: None,
        }
    }

    /// Create a field with a declared type hint
    pub fn typed(name: impl Into<String>, hint: TypeHint) -> Self {
        Self::base(name, FieldKind::Typed(hint))
    }

    /// Create a field backed by a nested serializer
    pub fn nested(name: impl Into<String>, serializer: impl Into<String>) -> Self {
        Self::base(
            name,
            FieldKind::Nested {
                serializer: serializer.into(),
                many: false,
            },
        )
    }

    /// Create a field backed by a list of nested serializers
    pub fn nested_many(name: impl Into<String>, serializer: impl Into<String>) -> Self {
        Self::base(
            name,
            FieldKind::Nested {
                serializer: serializer.into(),
                many: true,
            },
        )
    }

    /// Create a field derived from the bound entity
    pub fn related(name: impl Into<String>) -> Self {
        Self::base(name, FieldKind::Related)
    }

    /// Create a computed field with an optional return hint
    pub fn method(name: impl Into<String>, returns: Option<TypeHint>) -> Self {
        Self::base(name, FieldKind::Method { returns })
    }

    /// Set the source path into the bound entity
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Restrict the field to responses
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Restrict the field to requests
    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    /// Mark the exposed value nullable
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark the field as carrying a default
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Override decimal coercion for this field only
    pub fn coerce_to_string(mut self, coerce: bool) -> Self {
        self.coerce_to_string = Some(coerce);
        self
    }
}

impl EndpointDef {
    /// Create a new endpoint with no payloads or parameters
    pub fn new(path: impl Into<String>, method: HttpMethod, operation_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            operation_id: operation_id.into(),
            description: None,
            tags: Vec::new(),
            request: None,
            response: None,
            status: None,
            parameters: Vec::new(),
            overrides: OperationOverrides::default(),
        }
    }

    /// Set the free-text description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the request payload source
    pub fn with_request(mut self, source: PayloadSource) -> Self {
        self.request = Some(source);
        self
    }

    /// Set the response payload source
    pub fn with_response(mut self, source: PayloadSource) -> Self {
        self.response = Some(source);
        self
    }

    /// Set an explicit response status
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Append a declared parameter
    pub fn with_parameter(mut self, parameter: ParameterDef) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Append a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

impl PayloadSource {
    /// A single serializer payload
    pub fn serializer(name: impl Into<String>) -> Self {
        PayloadSource::Serializer {
            name: name.into(),
            many: false,
        }
    }

    /// A list-of-serializer payload
    pub fn serializer_many(name: impl Into<String>) -> Self {
        PayloadSource::Serializer {
            name: name.into(),
            many: true,
        }
    }
}

impl ParameterDef {
    /// Create a parameter with no declared type
    pub fn new(name: impl Into<String>, location: ParameterLocation) -> Self {
        Self {
            name: name.into(),
            location,
            hint: None,
            required: None,
            description: None,
        }
    }

    /// Set the declared type
    pub fn with_hint(mut self, hint: TypeHint) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Set explicit requiredness
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }
}

/// Load an API model from a YAML or JSON file.
///
/// The format is chosen by file extension; anything that is not `.json`
/// parses as YAML.
pub fn load_model(path: &Path) -> Result<ApiModel> {
    debug!("Loading API model from {}", path.display());
    let content = fs::read_to_string(path)?;

    let model = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&content).map_err(|e| Error::ModelError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?
    } else {
        serde_yaml::from_str(&content).map_err(|e| Error::ModelError {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?
    };

    Ok(model)
}
