use foundation::{Generation, LayerUrl};

/// In-flight marker key: a layer URL within one catalog generation.
///
/// The same URL in a newer generation is a different key, so fetches started
/// for a discarded catalog never satisfy requests from its replacement.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    pub generation: Generation,
    pub url: LayerUrl,
}

impl CacheKey {
    pub fn new(generation: Generation, url: impl Into<LayerUrl>) -> Self {
        Self {
            generation,
            url: url.into(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.url, self.generation)
    }
}
