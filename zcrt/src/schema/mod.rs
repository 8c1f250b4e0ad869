//! The schema model (§3, §4.6): a named, versioned list of field
//! descriptors with a version lifecycle and an advisory fingerprint.

pub mod validator;

use crate::tag::TypeTag;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One field in a `Schema`. `added_in_version`/`removed_in_version` give it
/// a lifecycle independent of the Rust struct that happens to read or write
/// it — see `FieldDefinition::active_in_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub type_tag: TypeTag,
    pub required: bool,
    pub default_value: Option<String>,
    pub added_in_version: u32,
    pub removed_in_version: Option<u32>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, type_tag: TypeTag) -> Self {
        FieldDefinition {
            name: name.into(),
            type_tag,
            required: true,
            default_value: None,
            added_in_version: 1,
            removed_in_version: None,
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    pub fn with_added_in(mut self, version: u32) -> Self {
        self.added_in_version = version;
        self
    }

    pub fn with_removed_in(mut self, version: u32) -> Self {
        self.removed_in_version = Some(version);
        self
    }

    pub fn type_tag(&self) -> TypeTag {
        self.type_tag
    }

    /// A field is active in version `v` iff it had been added by `v` and
    /// (if ever removed) wasn't removed at or before `v`.
    pub fn active_in_version(&self, v: u32) -> bool {
        self.added_in_version <= v && self.removed_in_version.map_or(true, |r| r > v)
    }

    pub fn has_default(&self) -> bool {
        self.default_value.is_some() || !self.required
    }
}

/// A named, versioned list of field descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub version: u32,
    pub fields: Vec<FieldDefinition>,
}

impl Schema {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Schema { name: name.into(), version, fields: Vec::new() }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// `hash(schema.name) XOR schema.version`, truncated to 32 bits.
    /// Purely advisory (§4.3/§9) — never gates a read.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        let digest = hasher.finalize();
        let name_hash = u64::from_le_bytes(digest[0..8].try_into().unwrap());
        let combined = name_hash ^ (self.version as u64);
        (combined & 0xFFFF_FFFF) as u32
    }
}
