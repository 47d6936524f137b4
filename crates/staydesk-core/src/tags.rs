use serde::{Deserialize, Serialize};
use staydesk_cache::Tag;

/// Record kinds the backend exposes, used as cache tag names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    Property,
    Booking,
    Enquiry,
    Review,
    User,
    Content,
    Category,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Property => "Property",
            TagKind::Booking => "Booking",
            TagKind::Enquiry => "Enquiry",
            TagKind::Review => "Review",
            TagKind::User => "User",
            TagKind::Content => "Content",
            TagKind::Category => "Category",
        }
    }

    /// Generic tag for the whole kind
    pub fn all(self) -> Tag {
        Tag::of(self.as_str())
    }

    /// Tag for a single record
    pub fn id(self, id: &str) -> Tag {
        Tag::with_id(self.as_str(), id)
    }
}

impl std::fmt::Display for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
