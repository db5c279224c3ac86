//! Function registration metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

fn default_version() -> String {
    "1.0.0".to_owned()
}

fn default_risk() -> String {
    "medium".to_owned()
}

const fn default_enabled() -> bool {
    true
}

/// Metadata describing a registered function.
///
/// A descriptor is valid only when `id`, `version`, `category` and `risk`
/// are all non-empty; validation runs before the registry is touched. The
/// registry key is the full name, `category.id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    /// Function identifier within its category.
    pub id: String,

    /// Function version.
    #[serde(default = "default_version")]
    pub version: String,

    /// Category; the first segment of the full name.
    pub category: String,

    /// Risk classification.
    #[serde(default = "default_risk")]
    pub risk: String,

    /// Entity the function operates on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,

    /// Operation name on the entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// Whether the function accepts calls.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Display name for tooling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON schema of the input payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,

    /// JSON schema of the output payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,

    /// Free-form tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl FunctionDescriptor {
    /// Creates a descriptor with defaults for everything but id and
    /// category.
    #[must_use]
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: default_version(),
            category: category.into(),
            risk: default_risk(),
            entity: None,
            operation: None,
            enabled: default_enabled(),
            display_name: None,
            description: None,
            input_schema: None,
            output_schema: None,
            tags: BTreeMap::new(),
        }
    }

    /// Sets the version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the risk classification.
    #[must_use]
    pub fn with_risk(mut self, risk: impl Into<String>) -> Self {
        self.risk = risk.into();
        self
    }

    /// Sets the entity and operation.
    #[must_use]
    pub fn with_operation(
        mut self,
        entity: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        self.entity = Some(entity.into());
        self.operation = Some(operation.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Disables the function without unregistering it.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// The registry key: `category.id`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.category, self.id)
    }

    /// Checks the descriptor invariants.
    ///
    /// `id`, `version`, `category` and `risk` must all be non-empty.
    pub fn validate(&self) -> Result<(), ClientError> {
        for (field, value) in [
            ("id", &self.id),
            ("version", &self.version),
            ("category", &self.category),
            ("risk", &self.risk),
        ] {
            if value.is_empty() {
                return Err(ClientError::InvalidDescriptor(format!(
                    "{field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn minimal_descriptor_gets_defaults() {
        let descriptor = FunctionDescriptor::new("grant_item", "inventory");
        assert_eq!(descriptor.version, "1.0.0");
        assert_eq!(descriptor.risk, "medium");
        assert!(descriptor.enabled);
        assert!(descriptor.validate().is_ok());
        assert_eq!(descriptor.full_name(), "inventory.grant_item");
    }

    #[test]
    fn empty_required_fields_fail_validation() {
        let cases = [
            FunctionDescriptor::new("", "inventory"),
            FunctionDescriptor::new("grant_item", ""),
            FunctionDescriptor::new("grant_item", "inventory").with_version(""),
            FunctionDescriptor::new("grant_item", "inventory").with_risk(""),
        ];
        for descriptor in cases {
            assert!(matches!(
                descriptor.validate(),
                Err(ClientError::InvalidDescriptor(_))
            ));
        }
    }

    #[test]
    fn full_name_is_case_sensitive_and_dot_delimited() {
        let descriptor = FunctionDescriptor::new("GrantItem", "Inventory");
        assert_eq!(descriptor.full_name(), "Inventory.GrantItem");
    }

    #[test]
    fn builder_covers_the_optional_fields() {
        let descriptor = FunctionDescriptor::new("grant_item", "inventory")
            .with_operation("item", "grant")
            .with_display_name("Grant item")
            .with_tag("team", "economy")
            .disabled();
        assert_eq!(descriptor.entity.as_deref(), Some("item"));
        assert_eq!(descriptor.operation.as_deref(), Some("grant"));
        assert!(!descriptor.enabled);
        assert_eq!(descriptor.tags.get("team").map(String::as_str), Some("economy"));
    }

    #[test]
    fn descriptor_roundtrips_through_json() {
        let descriptor = FunctionDescriptor::new("grant_item", "inventory")
            .with_tag("team", "economy");
        let json = serde_json::to_string(&descriptor).unwrap();
        let back: FunctionDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, descriptor);
    }
}
