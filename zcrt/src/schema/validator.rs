//! Intra-schema validation and pairwise old→new compatibility analysis
//! (§4.6).

use super::Schema;
use crate::error::ErrorKind;
use crate::tag::{widening_allowed, TypeTag};
use std::collections::HashSet;

/// One error or warning raised by the validator, carrying the offending
/// field name where one exists.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub kind: ErrorKind,
    pub message: String,
    pub field: Option<String>,
}

impl ValidationIssue {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ValidationIssue { kind, message: message.into(), field: None }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Intra-schema consistency check: unique field names, non-empty names,
/// `added_in_version <= schema.version`, `removed_in_version >
/// added_in_version`, and a warning (not an error) for any optional field
/// without a default.
pub fn validate(schema: &Schema) -> ValidationResult {
    let mut result = ValidationResult::default();

    if schema.version < 1 {
        result.errors.push(ValidationIssue::new(
            ErrorKind::InvalidSchema,
            format!("schema version must be >= 1, got {}", schema.version),
        ));
    }

    let mut seen = HashSet::new();
    for field in &schema.fields {
        if field.name.is_empty() {
            result.errors.push(
                ValidationIssue::new(ErrorKind::InvalidSchema, "field name must not be empty")
                    .with_field(field.name.clone()),
            );
        }
        if !seen.insert(field.name.clone()) {
            result.errors.push(
                ValidationIssue::new(
                    ErrorKind::InvalidSchema,
                    format!("duplicate field name {:?}", field.name),
                )
                .with_field(field.name.clone()),
            );
        }
        if field.added_in_version > schema.version {
            result.errors.push(
                ValidationIssue::new(
                    ErrorKind::InvalidSchema,
                    format!(
                        "field {:?} added_in_version {} exceeds schema version {}",
                        field.name, field.added_in_version, schema.version
                    ),
                )
                .with_field(field.name.clone()),
            );
        }
        if let Some(removed) = field.removed_in_version {
            if removed <= field.added_in_version {
                result.errors.push(
                    ValidationIssue::new(
                        ErrorKind::InvalidSchema,
                        format!(
                            "field {:?} removed_in_version {} must exceed added_in_version {}",
                            field.name, removed, field.added_in_version
                        ),
                    )
                    .with_field(field.name.clone()),
                );
            }
        }
        if !field.has_default() {
            result.warnings.push(
                ValidationIssue::new(
                    ErrorKind::InvalidSchema,
                    format!("optional field {:?} has no default_value", field.name),
                )
                .with_field(field.name.clone()),
            );
        }
        if matches!(field.type_tag(), TypeTag::Struct | TypeTag::Array) {
            result.warnings.push(
                ValidationIssue::new(
                    ErrorKind::InvalidSchema,
                    format!(
                        "field {:?} is a nested {:?}; validate() has no schema registry to resolve its \
                         element/struct type against, so the deep check is skipped for this field",
                        field.name,
                        field.type_tag()
                    ),
                )
                .with_field(field.name.clone()),
            );
        }
    }

    result
}

/// Pairwise compatibility between a schema written against (`old`) and one
/// being read against (`new`).
pub fn compatibility(old: &Schema, new: &Schema) -> ValidationResult {
    let mut result = ValidationResult::default();

    if old.name != new.name {
        result.errors.push(ValidationIssue::new(
            ErrorKind::IncompatibleSchema,
            format!("schema name mismatch: {:?} vs {:?}", old.name, new.name),
        ));
        return result;
    }

    if new.version <= old.version {
        result.warnings.push(ValidationIssue::new(
            ErrorKind::SchemaVersionMismatch,
            format!(
                "new schema version {} does not exceed old schema version {}",
                new.version, old.version
            ),
        ));
    }

    for old_field in &old.fields {
        match new.field(&old_field.name) {
            Some(new_field) => {
                if old_field.type_tag() != new_field.type_tag()
                    && !widening_allowed(old_field.type_tag(), new_field.type_tag())
                {
                    result.errors.push(
                        ValidationIssue::new(
                            ErrorKind::IncompatibleSchema,
                            format!(
                                "field {:?} type changed from {:?} to {:?} without a valid widening",
                                old_field.name, old_field.type_tag(), new_field.type_tag()
                            ),
                        )
                        .with_field(old_field.name.clone()),
                    );
                }
                if old_field.required && !new_field.required {
                    // required -> optional is allowed.
                } else if !old_field.required && new_field.required {
                    result.errors.push(
                        ValidationIssue::new(
                            ErrorKind::BackwardCompatibilityError,
                            format!("field {:?} became required", old_field.name),
                        )
                        .with_field(old_field.name.clone()),
                    );
                }
            }
            None => {
                if old_field.required {
                    result.errors.push(
                        ValidationIssue::new(
                            ErrorKind::RequiredFieldMissing,
                            format!("required field {:?} was removed", old_field.name),
                        )
                        .with_field(old_field.name.clone()),
                    );
                }
            }
        }
    }

    for new_field in &new.fields {
        if old.field(&new_field.name).is_none() && new_field.required && new_field.default_value.is_none() {
            result.errors.push(
                ValidationIssue::new(
                    ErrorKind::BackwardCompatibilityError,
                    format!("new required field {:?} has no default", new_field.name),
                )
                .with_field(new_field.name.clone()),
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TypeTag;

    #[test]
    fn duplicate_field_name_is_an_error() {
        let schema = Schema::new("Person", 1)
            .with_field(crate::schema::FieldDefinition::new("id", TypeTag::U32))
            .with_field(crate::schema::FieldDefinition::new("id", TypeTag::String));
        let result = validate(&schema);
        assert!(!result.valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.kind == ErrorKind::InvalidSchema && e.field.as_deref() == Some("id")));
    }

    #[test]
    fn version_ahead_field_is_an_error() {
        let schema = Schema::new("Person", 2).with_field(
            crate::schema::FieldDefinition::new("age", TypeTag::U32).with_added_in(5),
        );
        let result = validate(&schema);
        assert!(!result.valid());
    }

    #[test]
    fn widening_field_type_is_compatible() {
        let old = Schema::new("Person", 1)
            .with_field(crate::schema::FieldDefinition::new("id", TypeTag::U8));
        let new = Schema::new("Person", 2)
            .with_field(crate::schema::FieldDefinition::new("id", TypeTag::U32));
        let result = compatibility(&old, &new);
        assert!(result.valid());
    }

    #[test]
    fn nested_struct_field_gets_a_skipped_deep_check_warning() {
        let schema = Schema::new("Person", 1).with_field(
            crate::schema::FieldDefinition::new("address", TypeTag::Struct),
        );
        let result = validate(&schema);
        assert!(result.valid());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.field.as_deref() == Some("address") && w.kind == ErrorKind::InvalidSchema));
    }

    #[test]
    fn removed_required_field_is_incompatible() {
        let old = Schema::new("Person", 1)
            .with_field(crate::schema::FieldDefinition::new("id", TypeTag::U32));
        let new = Schema::new("Person", 2);
        let result = compatibility(&old, &new);
        assert!(!result.valid());
    }
}
