use crate::schema_generator::Schema;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared shape of a value in the API model.
///
/// Hints form a closed set. Every variant resolves to a schema fragment
/// without consulting generator state, so resolution is a total function
/// and adding a variant forces every match site to handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeHint {
    /// A single scalar value
    Scalar(ScalarKind),
    /// A value that may also be null
    Optional(Box<TypeHint>),
    /// A homogeneous collection; `item` may be omitted for untyped lists
    Sequence {
        #[serde(default)]
        item: Option<Box<TypeHint>>,
    },
    /// A fixed-size collection
    Tuple(Vec<TypeHint>),
    /// A string-keyed map; `value` may be omitted for untyped maps
    Mapping {
        #[serde(default)]
        value: Option<Box<TypeHint>>,
    },
    /// Exactly one of several alternatives, in declared order
    Union(Vec<TypeHint>),
    /// A closed set of literal values
    Literal(Vec<Value>),
    /// An inline object with named members
    Record(IndexMap<String, TypeHint>),
    /// Anything; resolves to the unconstrained schema
    Any,
}

/// Scalar kinds supported by the model format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
    Decimal,
    String,
    Slug,
    Email,
    Uuid,
    Uri,
    Ipv4,
    Ipv6,
    Date,
    DateTime,
    Time,
    File,
}

/// Resolve a type hint into an OpenAPI schema fragment.
///
/// `coerce_decimal_to_string` is threaded through the recursion because it
/// is the one piece of generator configuration that changes how a scalar
/// renders; everything else is determined by the hint alone.
pub fn resolve_type_hint(hint: &TypeHint, coerce_decimal_to_string: bool) -> Schema {
    debug!("Resolving type hint: {:?}", hint);

    match hint {
        TypeHint::Scalar(kind) => scalar_schema(*kind, coerce_decimal_to_string),
        TypeHint::Optional(inner) => {
            let mut schema = resolve_type_hint(inner, coerce_decimal_to_string);
            schema.nullable = Some(true);
            schema
        }
        TypeHint::Sequence { item } => {
            let items = match item {
                Some(inner) => resolve_type_hint(inner, coerce_decimal_to_string),
                None => Schema::free_form_object(),
            };
            Schema::array(items)
        }
        TypeHint::Tuple(members) => {
            // OpenAPI 3.0 cannot express per-position item types, so a
            // mixed tuple falls back to the first member's fragment.
            let items = members
                .first()
                .map(|m| resolve_type_hint(m, coerce_decimal_to_string))
                .unwrap_or_else(Schema::free_form_object);
            let mut schema = Schema::array(items);
            schema.min_length = Some(members.len());
            schema.max_length = Some(members.len());
            schema
        }
        TypeHint::Mapping { value } => {
            let value_schema = match value {
                Some(inner) => resolve_type_hint(inner, coerce_decimal_to_string),
                None => Schema::default(),
            };
            let mut schema = Schema::object();
            schema.additional_properties = Some(Box::new(value_schema));
            schema
        }
        TypeHint::Union(members) => {
            let mut schema = Schema::default();
            schema.one_of = members
                .iter()
                .map(|m| resolve_type_hint(m, coerce_decimal_to_string))
                .collect();
            schema
        }
        TypeHint::Literal(values) => {
            let mut schema = Schema::default();
            if let Some(type_name) = values.first().and_then(literal_value_type) {
                schema.schema_type = Some(type_name.to_string());
            }
            schema.enum_values = values.clone();
            schema
        }
        TypeHint::Record(members) => {
            let mut schema = Schema::object();
            for (name, member) in members {
                schema
                    .properties
                    .insert(name.clone(), resolve_type_hint(member, coerce_decimal_to_string));
            }
            schema
        }
        TypeHint::Any => Schema::default(),
    }
}

/// Map a scalar kind to its OpenAPI type/format pair
pub fn scalar_schema(kind: ScalarKind, coerce_decimal_to_string: bool) -> Schema {
    match kind {
        ScalarKind::Bool => Schema::typed("boolean"),
        ScalarKind::Int => Schema::typed("integer"),
        ScalarKind::Float => Schema::typed("number").with_format("double"),
        ScalarKind::Decimal => {
            if coerce_decimal_to_string {
                Schema::typed("string").with_format("decimal")
            } else {
                Schema::typed("number").with_format("double")
            }
        }
        ScalarKind::String | ScalarKind::Slug => Schema::typed("string"),
        ScalarKind::Email => Schema::typed("string").with_format("email"),
        ScalarKind::Uuid => Schema::typed("string").with_format("uuid"),
        ScalarKind::Uri => Schema::typed("string").with_format("uri"),
        ScalarKind::Ipv4 => Schema::typed("string").with_format("ipv4"),
        ScalarKind::Ipv6 => Schema::typed("string").with_format("ipv6"),
        ScalarKind::Date => Schema::typed("string").with_format("date"),
        ScalarKind::DateTime => Schema::typed("string").with_format("date-time"),
        ScalarKind::Time => Schema::typed("string").with_format("time"),
        ScalarKind::File => Schema::typed("string").with_format("binary"),
    }
}

/// The `type` keyword implied by a literal value, if any
fn literal_value_type(value: &Value) -> Option<&'static str> {
    match value {
        Value::String(_) => Some("string"),
        Value::Bool(_) => Some("boolean"),
        Value::Number(n) if n.is_f64() => Some("number"),
        Value::Number(_) => Some("integer"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Helper that resolves a hint with default decimal coercion and
    /// returns the fragment as a JSON value for comparison
    fn resolved(hint: TypeHint) -> Value {
        serde_json::to_value(resolve_type_hint(&hint, true)).unwrap()
    }

    fn scalar(kind: ScalarKind) -> TypeHint {
        TypeHint::Scalar(kind)
    }

    #[test]
    fn test_optional_scalar_is_nullable() {
        let hint = TypeHint::Optional(Box::new(scalar(ScalarKind::Int)));
        assert_eq!(resolved(hint), json!({"type": "integer", "nullable": true}));
    }

    #[test]
    fn test_sequence_of_int() {
        let hint = TypeHint::Sequence {
            item: Some(Box::new(scalar(ScalarKind::Int))),
        };
        assert_eq!(
            resolved(hint),
            json!({"type": "array", "items": {"type": "integer"}})
        );
    }

    #[test]
    fn test_untyped_sequence_gets_unconstrained_object_items() {
        let hint = TypeHint::Sequence { item: None };
        assert_eq!(
            resolved(hint),
            json!({
                "type": "array",
                "items": {"type": "object", "additionalProperties": {}}
            })
        );
    }

    #[test]
    fn test_uniform_tuple_sets_length_bounds() {
        let hint = TypeHint::Tuple(vec![
            scalar(ScalarKind::Int),
            scalar(ScalarKind::Int),
            scalar(ScalarKind::Int),
        ]);
        assert_eq!(
            resolved(hint),
            json!({
                "type": "array",
                "items": {"type": "integer"},
                "minLength": 3,
                "maxLength": 3
            })
        );
    }

    #[test]
    fn test_mixed_tuple_uses_first_member() {
        let hint = TypeHint::Tuple(vec![scalar(ScalarKind::String), scalar(ScalarKind::Int)]);
        assert_eq!(
            resolved(hint),
            json!({
                "type": "array",
                "items": {"type": "string"},
                "minLength": 2,
                "maxLength": 2
            })
        );
    }

    #[test]
    fn test_datetime_collection() {
        let hint = TypeHint::Sequence {
            item: Some(Box::new(scalar(ScalarKind::DateTime))),
        };
        assert_eq!(
            resolved(hint),
            json!({
                "type": "array",
                "items": {"type": "string", "format": "date-time"}
            })
        );
    }

    #[test]
    fn test_mapping_with_typed_values() {
        let hint = TypeHint::Mapping {
            value: Some(Box::new(scalar(ScalarKind::Int))),
        };
        assert_eq!(
            resolved(hint),
            json!({"type": "object", "additionalProperties": {"type": "integer"}})
        );
    }

    #[test]
    fn test_mapping_with_sequence_values() {
        let hint = TypeHint::Mapping {
            value: Some(Box::new(TypeHint::Sequence {
                item: Some(Box::new(scalar(ScalarKind::Int))),
            })),
        };
        assert_eq!(
            resolved(hint),
            json!({
                "type": "object",
                "additionalProperties": {"type": "array", "items": {"type": "integer"}}
            })
        );
    }

    #[test]
    fn test_untyped_mapping() {
        let hint = TypeHint::Mapping { value: None };
        assert_eq!(
            resolved(hint),
            json!({"type": "object", "additionalProperties": {}})
        );
    }

    #[test]
    fn test_union_preserves_declared_order() {
        let hint = TypeHint::Union(vec![scalar(ScalarKind::Int), scalar(ScalarKind::String)]);
        assert_eq!(
            resolved(hint),
            json!({"oneOf": [{"type": "integer"}, {"type": "string"}]})
        );
    }

    #[test]
    fn test_literal_infers_type_from_first_value() {
        let hint = TypeHint::Literal(vec![json!("x"), json!("y")]);
        assert_eq!(resolved(hint), json!({"enum": ["x", "y"], "type": "string"}));
    }

    #[test]
    fn test_literal_without_inferable_type_omits_type() {
        let hint = TypeHint::Literal(vec![json!(null), json!("x")]);
        assert_eq!(resolved(hint), json!({"enum": [null, "x"]}));
    }

    #[test]
    fn test_record_members_become_properties() {
        let mut members = IndexMap::new();
        members.insert("name".to_string(), scalar(ScalarKind::String));
        members.insert("age".to_string(), scalar(ScalarKind::Int));
        let hint = TypeHint::Record(members);
        assert_eq!(
            resolved(hint),
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "age": {"type": "integer"}
                }
            })
        );
    }

    #[test]
    fn test_any_is_unconstrained() {
        assert_eq!(resolved(TypeHint::Any), json!({}));
    }

    #[test]
    fn test_optional_union_sets_nullable_on_wrapper() {
        let hint = TypeHint::Optional(Box::new(TypeHint::Union(vec![
            scalar(ScalarKind::Int),
            scalar(ScalarKind::String),
        ])));
        assert_eq!(
            resolved(hint),
            json!({
                "oneOf": [{"type": "integer"}, {"type": "string"}],
                "nullable": true
            })
        );
    }

    #[test]
    fn test_scalar_format_table() {
        let cases = vec![
            (ScalarKind::Bool, json!({"type": "boolean"})),
            (ScalarKind::Int, json!({"type": "integer"})),
            (ScalarKind::Float, json!({"type": "number", "format": "double"})),
            (ScalarKind::String, json!({"type": "string"})),
            (ScalarKind::Slug, json!({"type": "string"})),
            (ScalarKind::Email, json!({"type": "string", "format": "email"})),
            (ScalarKind::Uuid, json!({"type": "string", "format": "uuid"})),
            (ScalarKind::Uri, json!({"type": "string", "format": "uri"})),
            (ScalarKind::Ipv4, json!({"type": "string", "format": "ipv4"})),
            (ScalarKind::Ipv6, json!({"type": "string", "format": "ipv6"})),
            (ScalarKind::Date, json!({"type": "string", "format": "date"})),
            (ScalarKind::DateTime, json!({"type": "string", "format": "date-time"})),
            (ScalarKind::Time, json!({"type": "string", "format": "time"})),
            (ScalarKind::File, json!({"type": "string", "format": "binary"})),
        ];

        for (kind, expected) in cases {
            let schema = serde_json::to_value(scalar_schema(kind, true)).unwrap();
            assert_eq!(schema, expected, "unexpected fragment for {:?}", kind);
        }
    }

    #[test]
    fn test_decimal_coerced_to_string_by_default() {
        let schema = serde_json::to_value(scalar_schema(ScalarKind::Decimal, true)).unwrap();
        assert_eq!(schema, json!({"type": "string", "format": "decimal"}));
    }

    #[test]
    fn test_decimal_as_number_when_uncoerced() {
        let schema = serde_json::to_value(scalar_schema(ScalarKind::Decimal, false)).unwrap();
        assert_eq!(schema, json!({"type": "number", "format": "double"}));
    }

    #[test]
    fn test_coercion_flag_reaches_nested_hints() {
        let hint = TypeHint::Sequence {
            item: Some(Box::new(scalar(ScalarKind::Decimal))),
        };
        let schema = serde_json::to_value(resolve_type_hint(&hint, false)).unwrap();
        assert_eq!(
            schema,
            json!({"type": "array", "items": {"type": "number", "format": "double"}})
        );
    }

    #[test]
    fn test_hint_deserializes_from_yaml() {
        let hint: TypeHint =
            serde_yaml::from_str("sequence:\n  item:\n    scalar: date-time").unwrap();
        assert_eq!(
            hint,
            TypeHint::Sequence {
                item: Some(Box::new(scalar(ScalarKind::DateTime))),
            }
        );

        let hint: TypeHint = serde_yaml::from_str("any").unwrap();
        assert_eq!(hint, TypeHint::Any);

        let hint: TypeHint = serde_yaml::from_str("optional:\n  scalar: uuid").unwrap();
        assert_eq!(hint, TypeHint::Optional(Box::new(scalar(ScalarKind::Uuid))));
    }
}
