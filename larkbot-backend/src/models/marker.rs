/// High-water mark over processed post ids.
///
/// Post ids are snowflake-style decimal strings; the marker compares them as
/// unsigned integers. It never decreases: `advance` with a smaller or
/// unparseable id is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LastCheckedMarker(Option<u64>);

impl LastCheckedMarker {
    pub fn new(value: Option<u64>) -> Self {
        LastCheckedMarker(value)
    }

    /// Rehydrate from the cached string form. Unparseable or absent values
    /// start the marker empty.
    pub fn from_cached(raw: Option<String>) -> Self {
        LastCheckedMarker(raw.and_then(|s| s.trim().parse().ok()))
    }

    pub fn get(&self) -> Option<u64> {
        self.0
    }

    /// True when `id` is already covered: the marker is set and `id` is not
    /// numerically greater. An unset marker covers nothing, and ids that do
    /// not parse as u64 are never considered covered.
    pub fn covers(&self, id: &str) -> bool {
        match (self.0, id.trim().parse::<u64>()) {
            (Some(mark), Ok(n)) => n <= mark,
            _ => false,
        }
    }

    /// Move the marker up to `id` if it is numerically greater.
    pub fn advance(&mut self, id: &str) {
        if let Ok(n) = id.trim().parse::<u64>() {
            if self.0.map_or(true, |mark| n > mark) {
                self.0 = Some(n);
            }
        }
    }

    /// String form for the external cache. `None` while the marker is unset.
    pub fn to_cache_value(&self) -> Option<String> {
        self.0.map(|n| n.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_never_decreases() {
        let mut marker = LastCheckedMarker::default();
        marker.advance("100");
        assert_eq!(marker.get(), Some(100));
        marker.advance("50");
        assert_eq!(marker.get(), Some(100));
        marker.advance("200");
        assert_eq!(marker.get(), Some(200));
    }

    #[test]
    fn test_unset_marker_covers_nothing() {
        let marker = LastCheckedMarker::default();
        assert!(!marker.covers("1"));
        assert!(!marker.covers("0"));
    }

    #[test]
    fn test_covers_is_numeric_not_lexicographic() {
        let marker = LastCheckedMarker::new(Some(9));
        // Lexicographically "10" < "9", but numerically 10 > 9.
        assert!(!marker.covers("10"));
        assert!(marker.covers("9"));
        assert!(marker.covers("8"));
    }

    #[test]
    fn test_unparseable_ids_are_ignored() {
        let mut marker = LastCheckedMarker::new(Some(10));
        marker.advance("not-a-number");
        assert_eq!(marker.get(), Some(10));
        assert!(!marker.covers("not-a-number"));
    }

    #[test]
    fn test_cache_round_trip() {
        let mut marker = LastCheckedMarker::default();
        assert_eq!(marker.to_cache_value(), None);
        marker.advance("123456789012345678");
        let cached = marker.to_cache_value();
        assert_eq!(cached.as_deref(), Some("123456789012345678"));
        assert_eq!(LastCheckedMarker::from_cached(cached), marker);
    }
}
