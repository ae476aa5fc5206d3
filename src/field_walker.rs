//! Relation-path traversal over the entity graph.
//!
//! Serializer fields may point into their bound entity with a dotted source
//! path. Each segment is either a declared field, the synthesized primary
//! key, a forward relation, or the reverse accessor of a relation declared
//! on another entity. A path that ends on a relation advances once more to
//! the primary key of the entity the relation points at.

use crate::model::{ApiModel, EntityDef, ModelFieldDef, ModelFieldKind};
use log::debug;

/// Terminal of a successful traversal.
///
/// `kind` is always concrete: relation terminals are normalized to the
/// primary key of the entity the relation advanced to. `nullable` reflects
/// the field the path ended on; for forward relation terminals that is the
/// relation itself, since its value is absent when the relation is unset.
#[derive(Debug, Clone)]
pub struct WalkedField {
    /// Entity owning the terminal field
    pub entity: String,
    /// Terminal field name
    pub field: String,
    /// Terminal field kind
    pub kind: ModelFieldKind,
    /// Whether the terminal value may be null
    pub nullable: bool,
}

/// Why a traversal could not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkError {
    /// The named entity is not declared in the model
    UnknownEntity { entity: String },
    /// The source path had no segments
    EmptyPath { entity: String },
    /// No field, key or reverse accessor matches the segment
    UnknownSegment { entity: String, segment: String },
    /// The path tried to continue through a non-relation field
    TraversedScalar { entity: String, segment: String },
}

impl std::fmt::Display for WalkError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            WalkError::UnknownEntity { entity } => {
                write!(f, "unknown entity `{}`", entity)
            }
            WalkError::EmptyPath { entity } => {
                write!(f, "empty source path on entity `{}`", entity)
            }
            WalkError::UnknownSegment { entity, segment } => {
                write!(f, "no field or reverse accessor `{}` on entity `{}`", segment, entity)
            }
            WalkError::TraversedScalar { entity, segment } => {
                write!(f, "cannot traverse through non-relation field `{}` on entity `{}`", segment, entity)
            }
        }
    }
}

impl std::error::Error for WalkError {}

/// Follow a dotted source path from `root_entity` to its terminal field.
pub fn follow_field_source(
    model: &ApiModel,
    root_entity: &str,
    path: &[&str],
) -> Result<WalkedField, WalkError> {
    debug!("Following source path {:?} from entity {}", path, root_entity);

    let mut current = model.entity(root_entity).ok_or_else(|| WalkError::UnknownEntity {
        entity: root_entity.to_string(),
    })?;

    if path.is_empty() {
        return Err(WalkError::EmptyPath {
            entity: root_entity.to_string(),
        });
    }

    for (index, &segment) in path.iter().enumerate() {
        let last = index + 1 == path.len();

        if let Some(field) = current.lookup(segment) {
            if let Some(target) = field.kind.relation_target() {
                let target_entity =
                    model.entity(target).ok_or_else(|| WalkError::UnknownEntity {
                        entity: target.to_string(),
                    })?;
                if last {
                    // Ending on a relation advances to the target's key
                    let pk = target_entity.primary_key();
                    debug!(
                        "Path ends on relation {}; advancing to {}.{}",
                        segment, target_entity.name, pk.name
                    );
                    return Ok(WalkedField {
                        entity: target_entity.name.clone(),
                        field: pk.name,
                        kind: pk.kind,
                        nullable: field.nullable,
                    });
                }
                current = target_entity;
            } else if last {
                return Ok(WalkedField {
                    entity: current.name.clone(),
                    field: field.name,
                    kind: field.kind,
                    nullable: field.nullable,
                });
            } else {
                return Err(WalkError::TraversedScalar {
                    entity: current.name.clone(),
                    segment: segment.to_string(),
                });
            }
        } else if let Some((owner, _relation)) = reverse_relation(model, &current.name, segment) {
            if last {
                let pk = owner.primary_key();
                debug!(
                    "Path ends on reverse accessor {}; advancing to {}.{}",
                    segment, owner.name, pk.name
                );
                return Ok(WalkedField {
                    entity: owner.name.clone(),
                    field: pk.name,
                    kind: pk.kind,
                    nullable: pk.nullable,
                });
            }
            current = owner;
        } else {
            return Err(WalkError::UnknownSegment {
                entity: current.name.clone(),
                segment: segment.to_string(),
            });
        }
    }

    unreachable!("loop returns on the last segment")
}

/// Find the entity and relation field a reverse accessor refers to.
///
/// The accessor is the relation's `related_name` when declared, otherwise
/// the lowercased name of the entity owning the relation.
fn reverse_relation<'a>(
    model: &'a ApiModel,
    target: &str,
    accessor: &str,
) -> Option<(&'a EntityDef, &'a ModelFieldDef)> {
    for entity in &model.entities {
        for field in &entity.fields {
            if field.kind.relation_target() != Some(target) {
                continue;
            }
            let name = field
                .kind
                .related_name()
                .map(str::to_string)
                .unwrap_or_else(|| entity.name.to_lowercase());
            if name == accessor {
                return Some((entity, field));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityDef, ModelFieldDef};
    use crate::type_resolver::ScalarKind;
    use pretty_assertions::assert_eq;

    /// Alpha <- Bravo (fk alpha) <- Charlie (fk bravo), the classic
    /// three-entity chain walked from both ends
    fn chain_model() -> ApiModel {
        ApiModel {
            entities: vec![
                EntityDef::new("Alpha")
                    .with_field(ModelFieldDef::scalar("field_bool", ScalarKind::Bool)),
                EntityDef::new("Bravo").with_field(ModelFieldDef::foreign_key("alpha", "Alpha")),
                EntityDef::new("Charlie")
                    .with_field(ModelFieldDef::foreign_key("bravo", "Bravo"))
                    .with_field(ModelFieldDef::scalar("field_float", ScalarKind::Float)),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_forward_traversal_reaches_scalar() {
        let model = chain_model();
        let walked =
            follow_field_source(&model, "Charlie", &["bravo", "alpha", "field_bool"]).unwrap();

        assert_eq!(walked.entity, "Alpha");
        assert_eq!(walked.field, "field_bool");
        assert!(matches!(walked.kind, ModelFieldKind::Scalar(ScalarKind::Bool)));
    }

    #[test]
    fn test_reverse_traversal_reaches_scalar() {
        let model = chain_model();
        let walked =
            follow_field_source(&model, "Alpha", &["bravo", "charlie", "field_float"]).unwrap();

        assert_eq!(walked.entity, "Charlie");
        assert_eq!(walked.field, "field_float");
        assert!(matches!(walked.kind, ModelFieldKind::Scalar(ScalarKind::Float)));
    }

    #[test]
    fn test_traversal_is_symmetric() {
        let model = chain_model();
        let forward =
            follow_field_source(&model, "Charlie", &["bravo", "alpha", "field_bool"]).unwrap();
        let direct = follow_field_source(&model, "Alpha", &["field_bool"]).unwrap();

        assert_eq!(forward.entity, direct.entity);
        assert_eq!(forward.field, direct.field);
    }

    #[test]
    fn test_path_ending_on_forward_relation_yields_target_key() {
        let model = chain_model();
        let walked = follow_field_source(&model, "Charlie", &["bravo"]).unwrap();

        assert_eq!(walked.entity, "Bravo");
        assert_eq!(walked.field, "id");
        assert!(matches!(walked.kind, ModelFieldKind::Auto));
    }

    #[test]
    fn test_path_ending_on_reverse_relation_yields_owner_key() {
        let model = chain_model();
        let walked = follow_field_source(&model, "Alpha", &["bravo"]).unwrap();

        assert_eq!(walked.entity, "Bravo");
        assert_eq!(walked.field, "id");
        assert!(matches!(walked.kind, ModelFieldKind::Auto));
    }

    #[test]
    fn test_relation_to_explicit_key_uses_its_kind() {
        let model = ApiModel {
            entities: vec![
                EntityDef::new("Document")
                    .with_field(ModelFieldDef::scalar("uuid", ScalarKind::Uuid).primary_key()),
                EntityDef::new("Link")
                    .with_field(ModelFieldDef::foreign_key("document", "Document")),
            ],
            ..Default::default()
        };

        let walked = follow_field_source(&model, "Link", &["document"]).unwrap();
        assert_eq!(walked.field, "uuid");
        assert!(matches!(walked.kind, ModelFieldKind::Scalar(ScalarKind::Uuid)));
    }

    #[test]
    fn test_related_name_replaces_default_accessor() {
        let model = ApiModel {
            entities: vec![
                EntityDef::new("Alpha"),
                EntityDef::new("Delta").with_field(
                    ModelFieldDef::foreign_key("parent", "Alpha").with_related_name("children"),
                ),
            ],
            ..Default::default()
        };

        let walked = follow_field_source(&model, "Alpha", &["children"]).unwrap();
        assert_eq!(walked.entity, "Delta");

        let err = follow_field_source(&model, "Alpha", &["delta"]).unwrap_err();
        assert_eq!(
            err,
            WalkError::UnknownSegment {
                entity: "Alpha".to_string(),
                segment: "delta".to_string(),
            }
        );
    }

    #[test]
    fn test_nullable_relation_terminal_is_nullable() {
        let model = ApiModel {
            entities: vec![
                EntityDef::new("Alpha"),
                EntityDef::new("Echo")
                    .with_field(ModelFieldDef::foreign_key("owner", "Alpha").nullable()),
            ],
            ..Default::default()
        };

        let walked = follow_field_source(&model, "Echo", &["owner"]).unwrap();
        assert!(walked.nullable);
    }

    #[test]
    fn test_many_to_many_terminal_yields_target_key() {
        let model = ApiModel {
            entities: vec![
                EntityDef::new("Tag"),
                EntityDef::new("Article")
                    .with_field(ModelFieldDef::many_to_many("tags", "Tag")),
            ],
            ..Default::default()
        };

        let walked = follow_field_source(&model, "Article", &["tags"]).unwrap();
        assert_eq!(walked.entity, "Tag");
        assert!(matches!(walked.kind, ModelFieldKind::Auto));
    }

    #[test]
    fn test_unknown_root_entity() {
        let model = chain_model();
        let err = follow_field_source(&model, "Missing", &["x"]).unwrap_err();
        assert_eq!(
            err,
            WalkError::UnknownEntity {
                entity: "Missing".to_string(),
            }
        );
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let model = chain_model();
        let err = follow_field_source(&model, "Alpha", &[]).unwrap_err();
        assert_eq!(
            err,
            WalkError::EmptyPath {
                entity: "Alpha".to_string(),
            }
        );
    }

    #[test]
    fn test_traversal_through_scalar_is_rejected() {
        let model = chain_model();
        let err =
            follow_field_source(&model, "Charlie", &["field_float", "anything"]).unwrap_err();
        assert_eq!(
            err,
            WalkError::TraversedScalar {
                entity: "Charlie".to_string(),
                segment: "field_float".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_segment_names_entity_and_segment() {
        let model = chain_model();
        let err = follow_field_source(&model, "Charlie", &["bravo", "missing"]).unwrap_err();
        assert_eq!(
            err,
            WalkError::UnknownSegment {
                entity: "Bravo".to_string(),
                segment: "missing".to_string(),
            }
        );
    }
}
