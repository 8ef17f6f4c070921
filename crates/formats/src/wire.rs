//! JSON shapes of the event/layer catalog API.
//!
//! Every field the API may omit is defaulted so that a sparse response still
//! decodes; missing metadata is handled by the catalog builder.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub name: String,
    /// `[W, S, E, N]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box_coords: Option<[f64; 4]>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box_coords: Option<[f64; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerRef {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPayload {
    #[serde(deserialize_with = "version_token")]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub layers: Vec<LayerRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<GroupMetadata>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMetadata {
    #[serde(rename = "AOI", default, skip_serializing_if = "Option::is_none")]
    pub aoi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    /// Positionally paired with `GroupPayload::layers`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub layers: Vec<Option<LayerMetadata>>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub legend: Vec<String>,
}

/// Result of `POST /pending/layers/{event}/approve/{version}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub ok: bool,
    pub status: u16,
}

pub fn decode_groups(json: &str) -> Result<Vec<GroupPayload>, serde_json::Error> {
    serde_json::from_str(json)
}

pub fn decode_events(json: &str) -> Result<Vec<EventSummary>, serde_json::Error> {
    serde_json::from_str(json)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Releases are tagged with strings in newer uploads and bare numbers in older ones.
fn version_token<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "version must be a string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_events, decode_groups, GroupMetadata, LayerMetadata};

    #[test]
    fn decodes_full_group() {
        let json = r#"[{
            "version": "v1",
            "layers": [{"name": "A", "url": "u1"}, {"name": "B", "url": "u2"}],
            "metadata_url": "https://example.org/v1.json",
            "metadata": {
                "AOI": "Zone1",
                "uploaded_at": "2017-09-21T10:00:00Z",
                "layers": [{"description": "d1", "legend": ["low", "high"]}, null]
            }
        }]"#;
        let groups = decode_groups(json).unwrap();
        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert_eq!(g.version, "v1");
        assert_eq!(g.layers[1].url, "u2");
        let meta = g.metadata.as_ref().unwrap();
        assert_eq!(meta.aoi.as_deref(), Some("Zone1"));
        assert_eq!(
            meta.layers[0],
            Some(LayerMetadata {
                description: Some("d1".to_string()),
                legend: vec!["low".to_string(), "high".to_string()],
            })
        );
        assert_eq!(meta.layers[1], None);
    }

    #[test]
    fn sparse_group_decodes_with_defaults() {
        let groups = decode_groups(r#"[{"version": 3, "layers": null, "metadata": {}}]"#).unwrap();
        assert_eq!(groups[0].version, "3");
        assert!(groups[0].layers.is_empty());
        assert_eq!(groups[0].metadata, Some(GroupMetadata::default()));
        assert_eq!(groups[0].metadata_url, None);
    }

    #[test]
    fn version_must_be_scalar() {
        assert!(decode_groups(r#"[{"version": {"x": 1}}]"#).is_err());
    }

    #[test]
    fn events_carry_optional_bounds() {
        let events = decode_events(
            r#"[{"name": "irma", "bounding_box_coords": [-62, 14, -60, 16]}, {"name": "maria"}]"#,
        )
        .unwrap();
        assert_eq!(events[0].bounding_box_coords, Some([-62.0, 14.0, -60.0, 16.0]));
        assert_eq!(events[1].bounding_box_coords, None);
    }
}
