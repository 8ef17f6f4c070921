use streaming::LayerScope;

/// Page query parameters: `event`, `pending`, `layer`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub event: Option<String>,
    pub pending: bool,
    /// Single-layer snapshot display; takes precedence over `pending`.
    pub layer: Option<String>,
}

impl ViewQuery {
    pub fn for_event(event: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            ..Self::default()
        }
    }

    /// Parse `event=irma&pending=1&layer=flood`, with or without a leading `?`.
    ///
    /// Unknown keys are ignored; the last occurrence of a key wins. `pending`
    /// is set by any non-empty value except `0` and `false`.
    pub fn parse(query: &str) -> Self {
        let mut out = ViewQuery::default();
        let query = query.strip_prefix('?').unwrap_or(query);
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "event" => out.event = Some(value.into_owned()).filter(|v| !v.is_empty()),
                "layer" => out.layer = Some(value.into_owned()).filter(|v| !v.is_empty()),
                "pending" => out.pending = !matches!(value.as_ref(), "" | "0" | "false"),
                _ => {}
            }
        }
        out
    }

    pub fn scope(&self) -> LayerScope {
        match (&self.layer, self.pending) {
            (Some(layer), _) => LayerScope::Single(layer.clone()),
            (None, true) => LayerScope::Pending,
            (None, false) => LayerScope::Approved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ViewQuery;
    use streaming::LayerScope;

    #[test]
    fn parses_all_parameters() {
        let q = ViewQuery::parse("?event=irma&pending=true&layer=flood%20depth");
        assert_eq!(q.event.as_deref(), Some("irma"));
        assert!(q.pending);
        assert_eq!(q.layer.as_deref(), Some("flood depth"));
        assert_eq!(q.scope(), LayerScope::Single("flood depth".to_string()));
    }

    #[test]
    fn pending_needs_a_truthy_value() {
        assert!(!ViewQuery::parse("event=irma&pending").pending);
        assert!(!ViewQuery::parse("event=irma&pending=0").pending);
        assert!(ViewQuery::parse("pending=1").pending);
        assert_eq!(ViewQuery::parse("event=maria&pending=yes").scope(), LayerScope::Pending);
    }

    #[test]
    fn missing_event_and_bad_escapes() {
        let q = ViewQuery::parse("layer=a%zz&foo=bar");
        assert_eq!(q.event, None);
        assert_eq!(q.layer.as_deref(), Some("a%zz"));
        assert_eq!(ViewQuery::parse("").scope(), LayerScope::Approved);
    }

    #[test]
    fn plus_decodes_to_space_and_last_key_wins() {
        let q = ViewQuery::parse("event=first&event=hurricane+maria&pend%69ng=1");
        assert_eq!(q.event.as_deref(), Some("hurricane maria"));
        assert!(q.pending);
    }
}
