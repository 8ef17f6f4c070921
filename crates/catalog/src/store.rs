//! Layer store operations over the catalog.
//!
//! Layers are addressed by URL across all groups. Iteration order is group
//! insertion order, then layer insertion order, and only changes when the
//! catalog is rebuilt.

use foundation::{LayerUrl, Version};
use layers::{DrawableId, Layer};

use crate::{Catalog, CatalogError, VersionGroup};

impl VersionGroup {
    /// Existing layer, or a fresh hidden one appended to this group.
    ///
    /// Callers must make sure the URL is not owned by another group; see
    /// `Catalog::get_or_create`.
    fn get_or_create(&mut self, url: LayerUrl, palette: &layers::Palette) -> &mut Layer {
        match self.layers.iter().position(|l| l.url() == &url) {
            Some(i) => &mut self.layers[i],
            None => {
                let style = palette.style_for(self.layers.len(), 0);
                let name = url.to_string();
                self.layers
                    .push(Layer::new(url, self.version.clone(), name).with_style(style));
                let last = self.layers.len() - 1;
                &mut self.layers[last]
            }
        }
    }
}

impl Catalog {
    /// Return the layer for `url` wherever it lives, or insert a fresh one
    /// (no data, hidden) into the group `version`.
    pub fn get_or_create(
        &mut self,
        version: &Version,
        url: LayerUrl,
    ) -> Result<&mut Layer, CatalogError> {
        if let Some(owner) = self.owner_index(&url) {
            let group = &mut self.groups[owner];
            return group
                .layer_mut(&url)
                .ok_or(CatalogError::UnknownLayer(url));
        }
        let palette = self.palette.clone();
        let group = self
            .group_mut(version)
            .ok_or_else(|| CatalogError::UnknownVersion(version.clone()))?;
        Ok(group.get_or_create(url, &palette))
    }

    pub fn layer(&self, url: &LayerUrl) -> Option<&Layer> {
        self.groups.iter().find_map(|g| g.layer(url))
    }

    pub fn layer_mut(&mut self, url: &LayerUrl) -> Option<&mut Layer> {
        self.groups.iter_mut().find_map(|g| g.layer_mut(url))
    }

    /// Pure state mutation; rendering reacts separately. Returns whether the
    /// flag changed.
    pub fn set_visibility(&mut self, url: &LayerUrl, visible: bool) -> Result<bool, CatalogError> {
        let layer = self
            .layer_mut(url)
            .ok_or_else(|| CatalogError::UnknownLayer(url.clone()))?;
        Ok(layer.set_visible(visible))
    }

    /// Every layer, group-then-layer order.
    pub fn select_all(&self) -> impl Iterator<Item = &Layer> {
        self.groups.iter().flat_map(|g| g.layers.iter())
    }

    pub fn select_all_mut(&mut self) -> impl Iterator<Item = &mut Layer> {
        self.groups.iter_mut().flat_map(|g| g.layers.iter_mut())
    }

    pub fn visible_layers(&self) -> impl Iterator<Item = &Layer> {
        self.select_all().filter(|l| l.visible())
    }

    pub fn urls(&self) -> Vec<LayerUrl> {
        self.select_all().map(|l| l.url().clone()).collect()
    }

    /// Every drawable created for any layer of this catalog.
    pub fn drawables(&self) -> Vec<DrawableId> {
        self.select_all()
            .filter_map(|l| l.rendered())
            .flat_map(|h| h.drawables())
            .collect()
    }

    fn owner_index(&self, url: &LayerUrl) -> Option<usize> {
        self.groups.iter().position(|g| g.layer(url).is_some())
    }
}
