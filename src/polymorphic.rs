//! Discriminated unions over several serializers.
//!
//! A polymorphic payload declares a component name, a list of candidate
//! serializers and the property consumers dispatch on. The union registers
//! as its own component holding `oneOf` refs to every candidate plus a
//! discriminator mapping from label to component pointer. Labels default
//! to the candidates' component names; when two candidates end up with the
//! same label the mapping would be ambiguous, so the union degrades to a
//! plain `oneOf` and the ambiguity is recorded as a warning.

use crate::error::Result;
use crate::schema_generator::{
    Direction, Discriminator, Schema, SchemaGenerator, COMPONENTS_PREFIX,
};
use indexmap::IndexMap;
use log::debug;
use std::collections::HashSet;

impl SchemaGenerator<'_> {
    /// Register a union component over the candidate serializers and
    /// return a `$ref` to it.
    ///
    /// Every candidate is registered as a component of its own first; an
    /// undeclared candidate is a structural error.
    pub fn resolve_polymorphic(
        &mut self,
        component: &str,
        candidates: &[String],
        discriminator_field: &str,
        labels: Option<&IndexMap<String, String>>,
        direction: Direction,
    ) -> Result<Schema> {
        debug!(
            "Building polymorphic component {} over {} candidates",
            component,
            candidates.len()
        );

        let mut refs = Vec::new();
        let mut mapping = IndexMap::new();
        let mut seen = HashSet::new();
        let mut collided = false;

        for candidate in candidates {
            let reference = self.ref_for_serializer(candidate, direction)?;
            let candidate_component = self.component_name(candidate, direction);
            let label = labels
                .and_then(|l| l.get(candidate))
                .cloned()
                .unwrap_or_else(|| candidate_component.clone());

            if !seen.insert(label.clone()) {
                collided = true;
            }
            mapping.insert(
                label,
                format!("{}{}", COMPONENTS_PREFIX, candidate_component),
            );
            refs.push(reference);
        }

        let mut union = Schema::default();
        union.one_of = refs;
        if collided {
            self.warn(format!(
                "discriminator labels of `{}` collide; emitting a plain oneOf without discriminator",
                component
            ));
        } else {
            union.discriminator = Some(Discriminator {
                property_name: discriminator_field.to_string(),
                mapping,
            });
        }

        let union_component = self.component_name(component, direction);
        self.register_component(&union_component, union)?;
        Ok(Schema::reference(&union_component))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{ApiModel, GeneratorConfig, SerializerDef, SerializerFieldDef};
    use crate::type_resolver::{ScalarKind, TypeHint};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn person_model() -> ApiModel {
        ApiModel {
            serializers: vec![
                SerializerDef::new("NaturalPersonSerializer").with_field(
                    SerializerFieldDef::typed("name", TypeHint::Scalar(ScalarKind::String)),
                ),
                SerializerDef::new("LegalPersonSerializer").with_field(
                    SerializerFieldDef::typed("company", TypeHint::Scalar(ScalarKind::String)),
                ),
            ],
            ..Default::default()
        }
    }

    fn candidates() -> Vec<String> {
        vec![
            "NaturalPersonSerializer".to_string(),
            "LegalPersonSerializer".to_string(),
        ]
    }

    fn component_json(schema_gen: &SchemaGenerator, name: &str) -> Value {
        serde_json::to_value(schema_gen.components().get(name).unwrap()).unwrap()
    }

    #[test]
    fn test_union_component_with_discriminator() {
        let model = person_model();
        let mut schema_gen = SchemaGenerator::new(&model);

        let reference = schema_gen
            .resolve_polymorphic("MetaPerson", &candidates(), "type", None, Direction::Read)
            .unwrap();
        assert_eq!(
            serde_json::to_value(&reference).unwrap(),
            json!({"$ref": "#/components/schemas/MetaPerson"})
        );

        // Union plus both candidates
        assert_eq!(schema_gen.components().len(), 3);
        assert_eq!(
            component_json(&schema_gen, "MetaPerson"),
            json!({
                "oneOf": [
                    {"$ref": "#/components/schemas/NaturalPersonSerializer"},
                    {"$ref": "#/components/schemas/LegalPersonSerializer"}
                ],
                "discriminator": {
                    "propertyName": "type",
                    "mapping": {
                        "NaturalPersonSerializer": "#/components/schemas/NaturalPersonSerializer",
                        "LegalPersonSerializer": "#/components/schemas/LegalPersonSerializer"
                    }
                }
            })
        );
        assert!(schema_gen.warnings().is_empty());
    }

    #[test]
    fn test_custom_labels_replace_mapping_keys() {
        let model = person_model();
        let mut schema_gen = SchemaGenerator::new(&model);

        let mut labels = IndexMap::new();
        labels.insert("NaturalPersonSerializer".to_string(), "natural".to_string());
        labels.insert("LegalPersonSerializer".to_string(), "legal".to_string());

        schema_gen
            .resolve_polymorphic(
                "MetaPerson",
                &candidates(),
                "type",
                Some(&labels),
                Direction::Read,
            )
            .unwrap();

        let mapping = &component_json(&schema_gen, "MetaPerson")["discriminator"]["mapping"];
        assert_eq!(
            *mapping,
            json!({
                "natural": "#/components/schemas/NaturalPersonSerializer",
                "legal": "#/components/schemas/LegalPersonSerializer"
            })
        );
    }

    #[test]
    fn test_label_collision_degrades_to_plain_one_of() {
        let model = person_model();
        let mut schema_gen = SchemaGenerator::new(&model);

        let mut labels = IndexMap::new();
        labels.insert("NaturalPersonSerializer".to_string(), "person".to_string());
        labels.insert("LegalPersonSerializer".to_string(), "person".to_string());

        schema_gen
            .resolve_polymorphic(
                "MetaPerson",
                &candidates(),
                "type",
                Some(&labels),
                Direction::Read,
            )
            .unwrap();

        let union = component_json(&schema_gen, "MetaPerson");
        assert_eq!(union["oneOf"].as_array().unwrap().len(), 2);
        assert!(union.get("discriminator").is_none());
        assert_eq!(schema_gen.warnings().len(), 1);
        assert!(schema_gen.warnings()[0].contains("MetaPerson"));
    }

    #[test]
    fn test_unknown_candidate_is_fatal() {
        let model = person_model();
        let mut schema_gen = SchemaGenerator::new(&model);

        let result = schema_gen.resolve_polymorphic(
            "MetaPerson",
            &["GhostSerializer".to_string()],
            "type",
            None,
            Direction::Read,
        );
        match result {
            Err(Error::StructuralError(message)) => assert!(message.contains("GhostSerializer")),
            other => panic!("expected a structural error, got {:?}", other),
        }
    }

    #[test]
    fn test_union_follows_direction_when_split() {
        let mut model = person_model();
        model.settings = GeneratorConfig {
            split_request: true,
            ..Default::default()
        };
        let mut schema_gen = SchemaGenerator::new(&model);

        schema_gen
            .resolve_polymorphic("MetaPerson", &candidates(), "type", None, Direction::Write)
            .unwrap();

        let union = component_json(&schema_gen, "MetaPersonRequest");
        assert_eq!(
            union["oneOf"][0]["$ref"],
            json!("#/components/schemas/NaturalPersonSerializerRequest")
        );
        assert_eq!(
            union["discriminator"]["mapping"]["NaturalPersonSerializerRequest"],
            json!("#/components/schemas/NaturalPersonSerializerRequest")
        );
    }

    #[test]
    fn test_union_reused_across_directions_without_split() {
        let model = person_model();
        let mut schema_gen = SchemaGenerator::new(&model);

        schema_gen
            .resolve_polymorphic("MetaPerson", &candidates(), "type", None, Direction::Write)
            .unwrap();
        // Identical structure re-registers as a no-op
        schema_gen
            .resolve_polymorphic("MetaPerson", &candidates(), "type", None, Direction::Read)
            .unwrap();

        assert_eq!(schema_gen.components().len(), 3);
    }
}
