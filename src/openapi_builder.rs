use crate::error::Result;
use crate::model::{ApiModel, EndpointDef, HttpMethod, PayloadSource};
use crate::overrides::apply_override;
use crate::schema_generator::{Direction, Schema, SchemaGenerator};
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    /// Server objects copied verbatim from the model
    servers: Vec<Value>,
    /// Global security requirement copied verbatim from the model
    security: Option<Value>,
    /// Tag objects copied verbatim from the model
    tags: Vec<Value>,
    /// Security schemes copied verbatim into `components`
    security_schemes: IndexMap<String, Value>,
    /// Paths collection (URL path -> PathItem), in declaration order
    paths: IndexMap<String, PathItem>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            title: "Generated API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
        }
    }
}

/// OpenAPI PathItem object - all operations sharing a single path
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    /// GET operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// POST operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// PUT operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// DELETE operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// PATCH operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// OPTIONS operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

impl PathItem {
    /// The operations present on this path, with their method names
    pub fn operations(&self) -> Vec<(&'static str, &Operation)> {
        let slots = [
            ("get", &self.get),
            ("post", &self.post),
            ("put", &self.put),
            ("delete", &self.delete),
            ("patch", &self.patch),
            ("options", &self.options),
            ("head", &self.head),
        ];
        slots
            .into_iter()
            .filter_map(|(method, slot)| slot.as_ref().map(|operation| (method, operation)))
            .collect()
    }
}

/// OpenAPI Operation object - a single documented operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// Operation summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Operation ID
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Tags grouping this operation
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    /// Parameters (path, query, header)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    /// Request body
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code
    pub responses: IndexMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location (path, query, header)
    #[serde(rename = "in")]
    pub location: String,
    /// Whether the parameter is required
    pub required: bool,
    /// Parameter schema
    pub schema: Schema,
    /// Parameter description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    /// Whether the request body is required
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
    /// Response content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<IndexMap<String, Schema>>,
    /// Security scheme definitions
    #[serde(rename = "securitySchemes", skip_serializing_if = "Option::is_none")]
    pub security_schemes: Option<IndexMap<String, Value>>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// Server objects
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub servers: Vec<Value>,
    /// API paths
    pub paths: IndexMap<String, PathItem>,
    /// Components (schemas, security schemes)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    /// Global security requirement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Value>,
    /// Tag objects
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<Value>,
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Info::default(),
            servers: Vec::new(),
            security: None,
            tags: Vec::new(),
            security_schemes: IndexMap::new(),
            paths: IndexMap::new(),
        }
    }

    /// Create a builder carrying the model's document metadata
    pub fn from_model(model: &ApiModel) -> Self {
        debug!("Initializing OpenApiBuilder from model `{}`", model.info.title);
        Self {
            info: model.info.clone(),
            servers: model.servers.clone(),
            security: model.security.clone(),
            tags: model.tags.clone(),
            security_schemes: model.security_schemes.clone(),
            paths: IndexMap::new(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Info {
            title,
            version,
            description,
        };
        self
    }

    /// Add an endpoint to the OpenAPI document.
    ///
    /// Derives parameters, request body and response from the endpoint's
    /// payload sources, then merges its override fragments last.
    pub fn add_endpoint(
        &mut self,
        endpoint: &EndpointDef,
        schema_gen: &mut SchemaGenerator,
    ) -> Result<()> {
        debug!(
            "Adding endpoint: {} {}",
            endpoint.method.as_str(),
            endpoint.path
        );

        // Convert path parameters from :param to {param} format
        let openapi_path = Self::convert_path_format(&endpoint.path);

        // An override parameter list replaces declared and derived
        // parameters alike
        let declared = endpoint
            .overrides
            .parameters
            .as_ref()
            .unwrap_or(&endpoint.parameters);
        let mut parameters: Vec<Parameter> = declared
            .iter()
            .map(|parameter| {
                let resolved = schema_gen.generate_parameter_schema(parameter);
                Parameter {
                    name: resolved.name,
                    location: resolved.location,
                    required: resolved.required,
                    schema: resolved.schema,
                    description: resolved.description,
                }
            })
            .collect();

        if endpoint.overrides.parameters.is_none() {
            // Path variables nobody declared are typed from the entity
            // behind the payload serializers
            let bound_entity = endpoint
                .response
                .as_ref()
                .and_then(|source| schema_gen.payload_entity(source))
                .or_else(|| {
                    endpoint
                        .request
                        .as_ref()
                        .and_then(|source| schema_gen.payload_entity(source))
                });

            for var in path_template_vars(&openapi_path) {
                let covered = parameters
                    .iter()
                    .any(|parameter| parameter.location == "path" && parameter.name == var);
                if covered {
                    continue;
                }
                let schema = schema_gen.path_parameter_schema(bound_entity, &var);
                parameters.push(Parameter {
                    name: var,
                    location: "path".to_string(),
                    required: true,
                    schema,
                    description: None,
                });
            }
        }

        // Generate the request body for body-carrying methods
        let request_body = if endpoint.method.has_request_body() {
            let schema = resolved_payload(
                schema_gen,
                endpoint.request.as_ref(),
                endpoint.overrides.request.as_ref(),
                Direction::Write,
            )?;
            schema.map(|schema| RequestBody {
                required: true,
                content: json_content(schema),
            })
        } else {
            if endpoint.request.is_some() || endpoint.overrides.request.is_some() {
                schema_gen.warn(format!(
                    "endpoint `{}` declares a request payload but {} carries no request body; ignoring it",
                    endpoint.operation_id,
                    endpoint.method.as_str()
                ));
            }
            None
        };

        // Generate the response under its status code
        let status = endpoint
            .status
            .clone()
            .unwrap_or_else(|| endpoint.method.default_status().to_string());
        let response_schema = resolved_payload(
            schema_gen,
            endpoint.response.as_ref(),
            endpoint.overrides.response.as_ref(),
            Direction::Read,
        )?;
        let description = if status == "204" {
            "No response body".to_string()
        } else {
            "Successful response".to_string()
        };
        let mut responses = IndexMap::new();
        responses.insert(
            status,
            Response {
                description,
                content: response_schema.map(json_content),
            },
        );

        // Create the operation
        let operation = Operation {
            summary: Some(format!(
                "{} {}",
                endpoint.method.as_str(),
                endpoint.path
            )),
            description: endpoint.description.clone(),
            operation_id: Some(endpoint.operation_id.clone()),
            tags: endpoint.tags.clone(),
            parameters: if parameters.is_empty() {
                None
            } else {
                Some(parameters)
            },
            request_body,
            responses,
        };

        // Add the operation to the appropriate path and method
        let path_item = self.paths.entry(openapi_path).or_default();
        let slot = match endpoint.method {
            HttpMethod::Get => &mut path_item.get,
            HttpMethod::Post => &mut path_item.post,
            HttpMethod::Put => &mut path_item.put,
            HttpMethod::Delete => &mut path_item.delete,
            HttpMethod::Patch => &mut path_item.patch,
            HttpMethod::Options => &mut path_item.options,
            HttpMethod::Head => &mut path_item.head,
        };
        if slot.is_some() {
            schema_gen.warn(format!(
                "duplicate operation for {} {}; keeping the last declaration",
                endpoint.method.as_str(),
                endpoint.path
            ));
        }
        *slot = Some(operation);
        Ok(())
    }

    /// Convert path format from :param to OpenAPI {param} format.
    /// Paths already in {param} format pass through untouched.
    fn convert_path_format(path: &str) -> String {
        let converted: Vec<String> = path
            .split('/')
            .map(|part| match part.strip_prefix(':') {
                Some(name) => format!("{{{}}}", name),
                None => part.to_string(),
            })
            .collect();
        converted.join("/")
    }

    /// Build the final OpenAPI document
    pub fn build(self, schema_gen: SchemaGenerator) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let schemas = schema_gen.into_components();
        let components = if schemas.is_empty() && self.security_schemes.is_empty() {
            None
        } else {
            Some(Components {
                schemas: if schemas.is_empty() {
                    None
                } else {
                    Some(schemas)
                },
                security_schemes: if self.security_schemes.is_empty() {
                    None
                } else {
                    Some(self.security_schemes)
                },
            })
        };

        OpenApiDocument {
            openapi: "3.0.3".to_string(),
            info: self.info,
            servers: self.servers,
            paths: self.paths,
            components,
            security: self.security,
            tags: self.tags,
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the `{var}` template variables of a normalized path, in order
pub fn path_template_vars(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|part| {
            part.strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
                .map(str::to_string)
        })
        .collect()
}

/// Resolve a payload source and merge its override fragment last.
///
/// A fragment over a bare `$ref` stands in for the derivation entirely,
/// since a pointer offers no keys to merge into.
fn resolved_payload(
    schema_gen: &mut SchemaGenerator,
    source: Option<&PayloadSource>,
    fragment: Option<&Value>,
    direction: Direction,
) -> Result<Option<Schema>> {
    let derived = match source {
        Some(source) => Some(schema_gen.resolve_payload(source, direction)?),
        None => None,
    };
    match (derived, fragment) {
        (Some(schema), Some(fragment)) => {
            let base = if schema.is_plain_reference() {
                Schema::default()
            } else {
                schema
            };
            Ok(Some(apply_override(base, fragment)?))
        }
        (Some(schema), None) => Ok(Some(schema)),
        (None, Some(fragment)) => Ok(Some(apply_override(Schema::default(), fragment)?)),
        (None, None) => Ok(None),
    }
}

fn json_content(schema: Schema) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert("application/json".to_string(), MediaType { schema });
    content
}
