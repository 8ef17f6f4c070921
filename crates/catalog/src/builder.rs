use std::collections::BTreeSet;

use formats::{GroupPayload, LayerMetadata};
use foundation::{Generation, LayerUrl, Version};
use layers::{Layer, Palette};

use crate::{ApprovalState, Catalog, CatalogMode, VersionGroup};

/// What a catalog build had to leave out.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub duplicate_versions: Vec<Version>,
    pub duplicate_layers: Vec<LayerUrl>,
    /// Groups beyond the first in snapshot mode.
    pub dropped_groups: usize,
}

impl BuildReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_versions.is_empty()
            && self.duplicate_layers.is_empty()
            && self.dropped_groups == 0
    }
}

impl Catalog {
    pub fn build(
        generation: Generation,
        mode: CatalogMode,
        payloads: &[GroupPayload],
    ) -> (Catalog, BuildReport) {
        Self::build_with_palette(generation, mode, payloads, Palette::standard())
    }

    /// Build a catalog in one pass over the API response.
    ///
    /// Never fails: missing metadata falls back to defaults
    /// (`description = name`, empty legend). Layer URLs are unique across the
    /// whole catalog; the first occurrence wins.
    pub fn build_with_palette(
        generation: Generation,
        mode: CatalogMode,
        payloads: &[GroupPayload],
        palette: Palette,
    ) -> (Catalog, BuildReport) {
        let mut report = BuildReport::default();
        let mut catalog = Catalog::empty(generation, mode);
        let mut seen_urls: BTreeSet<LayerUrl> = BTreeSet::new();

        for payload in payloads {
            let version = Version::new(payload.version.clone());
            if catalog.group(&version).is_some() {
                report.duplicate_versions.push(version);
                continue;
            }
            if mode == CatalogMode::Snapshot && !catalog.groups.is_empty() {
                report.dropped_groups += 1;
                continue;
            }

            let metadata = payload.metadata.as_ref();
            let mut group = VersionGroup::new(version.clone());
            if let Some(aoi) = metadata.and_then(|m| m.aoi.as_deref()) {
                group.name = aoi.to_string();
            }
            group.uploaded_at = metadata.and_then(|m| m.uploaded_at.clone());
            group.metadata_url = payload.metadata_url.clone();
            if mode == CatalogMode::Pending {
                group.approval = Some(ApprovalState::Pending);
            }

            for (index, layer_ref) in payload.layers.iter().enumerate() {
                let url = LayerUrl::new(layer_ref.url.clone());
                if !seen_urls.insert(url.clone()) {
                    report.duplicate_layers.push(url);
                    continue;
                }

                let layer_meta: Option<&LayerMetadata> = metadata
                    .and_then(|m| m.layers.get(index))
                    .and_then(|m| m.as_ref());
                let description = layer_meta
                    .and_then(|m| m.description.clone())
                    .unwrap_or_else(|| layer_ref.name.clone());
                let legend = layer_meta.map(|m| m.legend.clone()).unwrap_or_default();
                let style = palette.style_for(index, legend.len());

                group.layers.push(
                    Layer::new(url, version.clone(), layer_ref.name.clone())
                        .with_description(description)
                        .with_legend(legend)
                        .with_style(style),
                );
            }

            catalog.groups.push(group);
        }

        catalog.palette = palette;
        (catalog, report)
    }
}
