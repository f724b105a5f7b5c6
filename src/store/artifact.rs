use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Artifact type id of email messages.
pub const ARTIFACT_TYPE_EMAIL_MSG: i32 = 13;

/// Attribute type id of the path attribute. For email messages the path
/// encodes the account and folder a message was found in.
pub const ATTRIBUTE_TYPE_PATH: i32 = 8;

/// Reference to an artifact as delivered by ingest notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRef {
    pub artifact_id: i64,
    pub artifact_type_id: i32,
    pub data_source_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub type_id: i32,
    pub type_name: String,
    pub value_text: Option<String>,
}

/// An artifact header with lazily loaded attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    reference: ArtifactRef,
    attributes: Option<Vec<Attribute>>,
}

impl Artifact {
    pub fn new(reference: ArtifactRef) -> Self {
        Self {
            reference,
            attributes: None,
        }
    }

    pub fn id(&self) -> i64 {
        self.reference.artifact_id
    }

    pub fn artifact_type_id(&self) -> i32 {
        self.reference.artifact_type_id
    }

    pub fn data_source_id(&self) -> i64 {
        self.reference.data_source_id
    }

    pub fn reference(&self) -> ArtifactRef {
        self.reference
    }

    pub fn attributes_loaded(&self) -> bool {
        self.attributes.is_some()
    }

    pub fn set_attributes(&mut self, attributes: Vec<Attribute>) {
        self.attributes = Some(attributes);
    }

    /// Loaded attributes; empty until [`Artifact::set_attributes`] runs.
    pub fn attributes(&self) -> &[Attribute] {
        self.attributes.as_deref().unwrap_or_default()
    }

    /// Text value of the first attribute with the given type id.
    pub fn attribute_text(&self, type_id: i32) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|attr| attr.type_id == type_id)
            .and_then(|attr| attr.value_text.as_deref())
    }
}

impl From<ArtifactRef> for Artifact {
    fn from(reference: ArtifactRef) -> Self {
        Artifact::new(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_lookup_by_type() {
        let mut artifact = Artifact::new(ArtifactRef {
            artifact_id: 10,
            artifact_type_id: ARTIFACT_TYPE_EMAIL_MSG,
            data_source_id: 1,
        });
        assert!(!artifact.attributes_loaded());
        assert_eq!(artifact.attribute_text(ATTRIBUTE_TYPE_PATH), None);

        artifact.set_attributes(vec![Attribute {
            type_id: ATTRIBUTE_TYPE_PATH,
            type_name: "TSK_PATH".to_string(),
            value_text: Some("/img/bob/Inbox/1".to_string()),
        }]);

        assert!(artifact.attributes_loaded());
        assert_eq!(
            artifact.attribute_text(ATTRIBUTE_TYPE_PATH),
            Some("/img/bob/Inbox/1")
        );
    }
}
