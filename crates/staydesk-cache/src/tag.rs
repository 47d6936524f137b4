use serde::{Deserialize, Serialize};

/// Label shared by cached reads and the writes that make them stale
///
/// A tag without an id is generic (`"Booking"`), a tag with one is specific
/// (`{Booking, 7}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub kind: String,
    pub id: Option<String>,
}

impl Tag {
    /// Generic tag covering every record of a kind
    pub fn of(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
        }
    }

    /// Tag for a single record
    pub fn with_id(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(id.into()),
        }
    }

    pub fn is_generic(&self) -> bool {
        self.id.is_none()
    }

    /// Does invalidating `self` hit an entry that provided `provided`?
    ///
    /// Generic invalidation reaches every tag of the same kind, id or not.
    /// Specific invalidation only reaches the exact same tag.
    pub fn invalidates(&self, provided: &Tag) -> bool {
        self.kind == provided.kind && (self.is_generic() || self.id == provided.id)
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}:{}", self.kind, id),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_invalidates_everything_of_its_kind() {
        let generic = Tag::of("Booking");
        assert!(generic.invalidates(&Tag::of("Booking")));
        assert!(generic.invalidates(&Tag::with_id("Booking", "b1")));
        assert!(!generic.invalidates(&Tag::of("Review")));
    }

    #[test]
    fn test_specific_only_invalidates_exact_tag() {
        let specific = Tag::with_id("Booking", "b1");
        assert!(specific.invalidates(&Tag::with_id("Booking", "b1")));
        assert!(!specific.invalidates(&Tag::with_id("Booking", "b2")));
        assert!(!specific.invalidates(&Tag::of("Booking")));
    }

    #[test]
    fn test_display() {
        assert_eq!(Tag::of("Property").to_string(), "Property");
        assert_eq!(Tag::with_id("Property", "p1").to_string(), "Property:p1");
    }
}
