//! Version-grouped layer catalog for one event.
//!
//! A `Catalog` owns every `VersionGroup`, and each group exclusively owns its
//! `Layer`s. Catalogs are never merged: a reload builds a new one with a new
//! `Generation` and the old one is dropped after its drawables are torn down.

use foundation::{Generation, LayerUrl, Version};
use layers::{Layer, Palette};
use serde::Serialize;

pub mod approval;
pub mod builder;
pub mod store;
pub mod summary;

pub use approval::*;
pub use builder::*;
pub use summary::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogMode {
    Approved,
    Pending,
    /// Exactly one version group, shown on its own.
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    UnknownLayer(LayerUrl),
    UnknownVersion(Version),
    NotPending,
    ApprovalInFlight(Version),
    ApprovalClosed(Version),
    ApprovalNotStarted(Version),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::UnknownLayer(url) => write!(f, "no layer with url {url}"),
            CatalogError::UnknownVersion(v) => write!(f, "no version group {v}"),
            CatalogError::NotPending => write!(f, "catalog is not a pending catalog"),
            CatalogError::ApprovalInFlight(v) => write!(f, "approval of {v} already submitted"),
            CatalogError::ApprovalClosed(v) => write!(f, "approval of {v} is already decided"),
            CatalogError::ApprovalNotStarted(v) => write!(f, "approval of {v} was never submitted"),
        }
    }
}

impl std::error::Error for CatalogError {}

/// A release of one or more layers sharing a version token.
#[derive(Debug, Clone)]
pub struct VersionGroup {
    version: Version,
    name: String,
    uploaded_at: Option<String>,
    metadata_url: Option<String>,
    layers: Vec<Layer>,
    approval: Option<ApprovalState>,
}

impl VersionGroup {
    /// An empty group labelled with its own version token.
    pub fn new(version: Version) -> Self {
        Self {
            name: version.to_string(),
            version,
            uploaded_at: None,
            metadata_url: None,
            layers: Vec::new(),
            approval: None,
        }
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Area-of-interest label.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uploaded_at(&self) -> Option<&str> {
        self.uploaded_at.as_deref()
    }

    pub fn metadata_url(&self) -> Option<&str> {
        self.metadata_url.as_deref()
    }

    /// Layers in arrival order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn approval(&self) -> Option<ApprovalState> {
        self.approval
    }

    pub fn layer(&self, url: &LayerUrl) -> Option<&Layer> {
        self.layers.iter().find(|l| l.url() == url)
    }

    pub fn layer_mut(&mut self, url: &LayerUrl) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.url() == url)
    }
}

/// Root of all layer and group state for one browsing session.
#[derive(Debug, Clone)]
pub struct Catalog {
    generation: Generation,
    mode: CatalogMode,
    event: Option<String>,
    palette: Palette,
    groups: Vec<VersionGroup>,
}

impl Catalog {
    pub fn empty(generation: Generation, mode: CatalogMode) -> Self {
        Self {
            generation,
            mode,
            event: None,
            palette: Palette::standard(),
            groups: Vec::new(),
        }
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn mode(&self) -> CatalogMode {
        self.mode
    }

    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn groups(&self) -> &[VersionGroup] {
        &self.groups
    }

    pub fn group(&self, version: &Version) -> Option<&VersionGroup> {
        self.groups.iter().find(|g| &g.version == version)
    }

    pub fn group_mut(&mut self, version: &Version) -> Option<&mut VersionGroup> {
        self.groups.iter_mut().find(|g| &g.version == version)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.layers.is_empty())
    }

    pub fn layer_count(&self) -> usize {
        self.groups.iter().map(|g| g.layers.len()).sum()
    }
}
