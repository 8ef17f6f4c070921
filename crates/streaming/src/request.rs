/// Identifies one network fetch of a layer's point data.
///
/// Small and copyable so it can tag log lines and in-flight markers; joined
/// callers see the request id of the fetch they joined.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Request(pub u64);

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req#{}", self.0)
    }
}
