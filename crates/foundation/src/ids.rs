use std::fmt;

/// Source URL of a layer's point data; the stable layer identity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerUrl(String);

impl LayerUrl {
    pub fn new(url: impl Into<String>) -> Self {
        LayerUrl(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerUrl {
    fn from(s: &str) -> Self {
        LayerUrl(s.to_string())
    }
}

impl From<String> for LayerUrl {
    fn from(s: String) -> Self {
        LayerUrl(s)
    }
}

/// Release token of a version group. Opaque; compared by value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(String);

impl Version {
    pub fn new(token: impl Into<String>) -> Self {
        Version(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Version(s.to_string())
    }
}

/// Catalog generation. Every catalog rebuild gets a fresh, larger value, so
/// work started against an older generation can recognise itself as stale.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{Generation, LayerUrl};

    #[test]
    fn generations_increase() {
        let g = Generation::default();
        assert!(g.next() > g);
        assert_eq!(g.next().next(), Generation(2));
    }

    #[test]
    fn layer_urls_compare_by_value() {
        assert_eq!(LayerUrl::from("u1"), LayerUrl::new("u1".to_string()));
        assert_eq!(LayerUrl::from("u1").to_string(), "u1");
    }
}
