use serde::Serialize;

use crate::{ApprovalState, Catalog, CatalogMode, VersionGroup};

/// Serializable overview of a catalog, for reports and listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogSummary {
    pub generation: u64,
    pub mode: CatalogMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub groups: Vec<GroupSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub version: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalState>,
    pub layers: Vec<LayerSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
    pub url: String,
    pub name: String,
    pub description: String,
    pub legend: Vec<String>,
    pub color: String,
    pub multi_intensity: bool,
    pub visible: bool,
    /// Resident point count, when fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<usize>,
}

impl Catalog {
    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            generation: self.generation().0,
            mode: self.mode(),
            event: self.event().map(str::to_string),
            groups: self.groups().iter().map(group_summary).collect(),
        }
    }
}

fn group_summary(group: &VersionGroup) -> GroupSummary {
    GroupSummary {
        version: group.version().to_string(),
        name: group.name().to_string(),
        uploaded_at: group.uploaded_at().map(str::to_string),
        metadata_url: group.metadata_url().map(str::to_string),
        approval: group.approval(),
        layers: group
            .layers()
            .iter()
            .map(|l| LayerSummary {
                url: l.url().to_string(),
                name: l.name().to_string(),
                description: l.description().to_string(),
                legend: l.legend().to_vec(),
                color: l.style().color.to_css(),
                multi_intensity: l.is_multi_intensity(),
                visible: l.visible(),
                points: l.raw_data().map(|d| d.len()),
            })
            .collect(),
    }
}
