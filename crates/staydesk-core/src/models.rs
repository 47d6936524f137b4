use serde::{Deserialize, Serialize};
use serde_json::Value;
use staydesk_api::ApiRequest;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::{endpoints::Mutation, endpoints::Query, Error};

/// Paging, search and filters for a list screen
///
/// Doubles as the query argument, so any change here produces a new cache
/// key and therefore a new request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self::with_limit(10)
    }
}

impl ListParams {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            search: None,
            filters: BTreeMap::new(),
        }
    }

    /// New search text; blank clears it. Always back to page 1.
    pub fn set_search(&mut self, text: &str) {
        let text = text.trim();
        self.search = (!text.is_empty()).then(|| text.to_string());
        self.page = 1;
    }

    /// Set or clear one filter. Always back to page 1.
    pub fn set_filter(&mut self, key: &str, value: Option<&str>) {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => {
                self.filters.insert(key.to_string(), v.to_string());
            }
            None => {
                self.filters.remove(key);
            }
        }
        self.page = 1;
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn next_page(&mut self) {
        self.page = self.page.saturating_add(1);
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    /// Append as query string: page, limit, search, then filters by key
    pub fn apply(&self, mut request: ApiRequest) -> ApiRequest {
        request = request
            .query("page", self.page.to_string())
            .query("limit", self.limit.to_string());
        if let Some(search) = &self.search {
            request = request.query("search", search.clone());
        }
        for (key, value) in &self.filters {
            request = request.query(key.clone(), value.clone());
        }
        request
    }
}

macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn all() -> Vec<$name> {
                vec![$($name::$variant),+]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "unknown {} '{}', expected one of: {}",
                        stringify!($name),
                        other,
                        $name::all().iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                    )),
                }
            }
        }
    };
}

status_enum!(
    /// Booking lifecycle as the backend names it
    BookingStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
        Completed => "completed",
    }
);

status_enum!(
    EnquiryStatus {
        Pending => "pending",
        Responded => "responded",
        Closed => "closed",
    }
);

status_enum!(
    /// Moderation state of a guest review
    ReviewStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

/// Login form payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Admin screens with a list view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Properties,
    Bookings,
    Enquiries,
    Reviews,
    Users,
    Contents,
    Categories,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Properties => "properties",
            Resource::Bookings => "bookings",
            Resource::Enquiries => "enquiries",
            Resource::Reviews => "reviews",
            Resource::Users => "users",
            Resource::Contents => "contents",
            Resource::Categories => "categories",
        }
    }

    pub fn all() -> Vec<Resource> {
        vec![
            Resource::Properties,
            Resource::Bookings,
            Resource::Enquiries,
            Resource::Reviews,
            Resource::Users,
            Resource::Contents,
            Resource::Categories,
        ]
    }

    pub fn list_query(&self, params: ListParams) -> Query {
        match self {
            Resource::Properties => Query::Properties(params),
            Resource::Bookings => Query::Bookings(params),
            Resource::Enquiries => Query::Enquiries(params),
            Resource::Reviews => Query::Reviews(params),
            Resource::Users => Query::Users(params),
            Resource::Contents => Query::Contents(params),
            // Categories are a single unpaged list
            Resource::Categories => Query::Categories,
        }
    }

    /// `None` for resources without a detail screen
    pub fn detail_query(&self, id: &str) -> Option<Query> {
        let id = id.to_string();
        match self {
            Resource::Properties => Some(Query::PropertyById(id)),
            Resource::Bookings => Some(Query::BookingById(id)),
            Resource::Enquiries => Some(Query::EnquiryById(id)),
            Resource::Reviews => Some(Query::ReviewById(id)),
            Resource::Users => Some(Query::UserById(id)),
            Resource::Contents => Some(Query::ContentById(id)),
            Resource::Categories => None,
        }
    }

    pub fn delete_mutation(&self, id: &str) -> Mutation {
        let id = id.to_string();
        match self {
            Resource::Properties => Mutation::DeleteProperty(id),
            Resource::Bookings => Mutation::DeleteBooking(id),
            Resource::Enquiries => Mutation::DeleteEnquiry(id),
            Resource::Reviews => Mutation::DeleteReview(id),
            Resource::Users => Mutation::DeleteUser(id),
            Resource::Contents => Mutation::DeleteContent(id),
            Resource::Categories => Mutation::DeleteCategory(id),
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "properties" | "property" => Ok(Resource::Properties),
            "bookings" | "booking" => Ok(Resource::Bookings),
            "enquiries" | "enquiry" => Ok(Resource::Enquiries),
            "reviews" | "review" => Ok(Resource::Reviews),
            "users" | "user" => Ok(Resource::Users),
            "contents" | "content" => Ok(Resource::Contents),
            "categories" | "category" => Ok(Resource::Categories),
            other => Err(Error::UnknownResource(other.to_string())),
        }
    }
}

/// Id of an opaque backend record (`_id`, falling back to `id`)
pub fn record_id(record: &Value) -> Option<String> {
    let id = record.get("_id").or_else(|| record.get("id"))?;
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Rows of a list response, whether bare or wrapped in `{data: [...]}`
pub fn list_items(response: &Value) -> &[Value] {
    match response {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("data")
            .or_else(|| map.get("items"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}
