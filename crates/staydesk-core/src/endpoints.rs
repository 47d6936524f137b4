// The API slice: every read and write the admin screens use, with the
// cache tags each one provides or invalidates.
//
// Tag granularity follows what the screens have always done, uneven as it
// is: the property detail read only provides the generic tag, the review
// status write only invalidates the generic tag.

use serde_json::{json, Value};
use staydesk_api::{request::resource_path, ApiRequest, FormPart};
use staydesk_cache::{QueryKey, Tag};

use crate::models::{BookingStatus, Credentials, EnquiryStatus, ListParams, ReviewStatus};
use crate::tags::TagKind;

/// Reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Properties(ListParams),
    PropertyById(String),
    Bookings(ListParams),
    BookingById(String),
    Enquiries(ListParams),
    EnquiryById(String),
    Reviews(ListParams),
    ReviewById(String),
    Users(ListParams),
    UserById(String),
    Contents(ListParams),
    ContentById(String),
    Categories,
}

impl Query {
    pub fn name(&self) -> &'static str {
        match self {
            Query::Properties(_) => "getProperties",
            Query::PropertyById(_) => "getPropertyById",
            Query::Bookings(_) => "getBookings",
            Query::BookingById(_) => "getBookingById",
            Query::Enquiries(_) => "getEnquiries",
            Query::EnquiryById(_) => "getEnquiryById",
            Query::Reviews(_) => "getReviews",
            Query::ReviewById(_) => "getReviewById",
            Query::Users(_) => "getUsers",
            Query::UserById(_) => "getUserById",
            Query::Contents(_) => "getContents",
            Query::ContentById(_) => "getContentById",
            Query::Categories => "getCategories",
        }
    }

    /// Cache identity: endpoint name plus the serialized arguments
    pub fn key(&self) -> Result<QueryKey, serde_json::Error> {
        match self {
            Query::Properties(params)
            | Query::Bookings(params)
            | Query::Enquiries(params)
            | Query::Reviews(params)
            | Query::Users(params)
            | Query::Contents(params) => QueryKey::new(self.name(), params),
            Query::PropertyById(id)
            | Query::BookingById(id)
            | Query::EnquiryById(id)
            | Query::ReviewById(id)
            | Query::UserById(id)
            | Query::ContentById(id) => QueryKey::new(self.name(), id),
            Query::Categories => QueryKey::new(self.name(), &()),
        }
    }

    pub fn request(&self) -> ApiRequest {
        match self {
            Query::Properties(params) => params.apply(ApiRequest::get("/property")),
            Query::PropertyById(id) => ApiRequest::get(resource_path("property", id, None)),
            Query::Bookings(params) => params.apply(ApiRequest::get("/booking")),
            Query::BookingById(id) => ApiRequest::get(resource_path("booking", id, None)),
            Query::Enquiries(params) => params.apply(ApiRequest::get("/enquiry")),
            Query::EnquiryById(id) => ApiRequest::get(resource_path("enquiry", id, None)),
            Query::Reviews(params) => params.apply(ApiRequest::get("/review")),
            Query::ReviewById(id) => ApiRequest::get(resource_path("review", id, None)),
            Query::Users(params) => params.apply(ApiRequest::get("/user")),
            Query::UserById(id) => ApiRequest::get(resource_path("user", id, None)),
            Query::Contents(params) => params.apply(ApiRequest::get("/content")),
            Query::ContentById(id) => ApiRequest::get(resource_path("content", id, None)),
            Query::Categories => ApiRequest::get("/category"),
        }
    }

    pub fn provides(&self) -> Vec<Tag> {
        match self {
            Query::Properties(_) | Query::PropertyById(_) => vec![TagKind::Property.all()],
            Query::Bookings(_) => vec![TagKind::Booking.all()],
            Query::BookingById(id) => vec![TagKind::Booking.id(id)],
            Query::Enquiries(_) => vec![TagKind::Enquiry.all()],
            Query::EnquiryById(id) => vec![TagKind::Enquiry.id(id)],
            Query::Reviews(_) => vec![TagKind::Review.all()],
            Query::ReviewById(id) => vec![TagKind::Review.id(id)],
            Query::Users(_) => vec![TagKind::User.all()],
            Query::UserById(id) => vec![TagKind::User.id(id)],
            Query::Contents(_) => vec![TagKind::Content.all()],
            Query::ContentById(id) => vec![TagKind::Content.id(id)],
            Query::Categories => vec![TagKind::Category.all()],
        }
    }
}

/// Writes
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Login(Credentials),
    CreateProperty(Vec<FormPart>),
    UpdateProperty { id: String, parts: Vec<FormPart> },
    DeleteProperty(String),
    UpdateBookingStatus { id: String, status: BookingStatus },
    DeleteBooking(String),
    UpdateEnquiryStatus { id: String, status: EnquiryStatus },
    DeleteEnquiry(String),
    UpdateReviewStatus { id: String, status: ReviewStatus },
    DeleteReview(String),
    CreateUser(Value),
    UpdateUser { id: String, body: Value },
    DeleteUser(String),
    CreateContent(Vec<FormPart>),
    UpdateContent { id: String, parts: Vec<FormPart> },
    DeleteContent(String),
    CreateCategory(Value),
    UpdateCategory { id: String, body: Value },
    DeleteCategory(String),
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Login(_) => "login",
            Mutation::CreateProperty(_) => "createProperty",
            Mutation::UpdateProperty { .. } => "updateProperty",
            Mutation::DeleteProperty(_) => "deleteProperty",
            Mutation::UpdateBookingStatus { .. } => "updateBookingStatus",
            Mutation::DeleteBooking(_) => "deleteBooking",
            Mutation::UpdateEnquiryStatus { .. } => "updateEnquiryStatus",
            Mutation::DeleteEnquiry(_) => "deleteEnquiry",
            Mutation::UpdateReviewStatus { .. } => "updateReviewStatus",
            Mutation::DeleteReview(_) => "deleteReview",
            Mutation::CreateUser(_) => "createUser",
            Mutation::UpdateUser { .. } => "updateUser",
            Mutation::DeleteUser(_) => "deleteUser",
            Mutation::CreateContent(_) => "createContent",
            Mutation::UpdateContent { .. } => "updateContent",
            Mutation::DeleteContent(_) => "deleteContent",
            Mutation::CreateCategory(_) => "createCategory",
            Mutation::UpdateCategory { .. } => "updateCategory",
            Mutation::DeleteCategory(_) => "deleteCategory",
        }
    }

    pub fn request(&self) -> ApiRequest {
        match self {
            Mutation::Login(credentials) => ApiRequest::post("/auth/login").json(json!({
                "email": credentials.email,
                "password": credentials.password,
            })),
            Mutation::CreateProperty(parts) => ApiRequest::post("/property").multipart(parts.clone()),
            Mutation::UpdateProperty { id, parts } => {
                ApiRequest::put(resource_path("property", id, None)).multipart(parts.clone())
            }
            Mutation::DeleteProperty(id) => ApiRequest::delete(resource_path("property", id, None)),
            Mutation::UpdateBookingStatus { id, status } => {
                ApiRequest::put(resource_path("booking", id, Some("status")))
                    .json(json!({ "status": status }))
            }
            Mutation::DeleteBooking(id) => ApiRequest::delete(resource_path("booking", id, None)),
            Mutation::UpdateEnquiryStatus { id, status } => {
                ApiRequest::patch(resource_path("enquiry", id, Some("status")))
                    .json(json!({ "status": status }))
            }
            Mutation::DeleteEnquiry(id) => ApiRequest::delete(resource_path("enquiry", id, None)),
            Mutation::UpdateReviewStatus { id, status } => {
                ApiRequest::patch(resource_path("review", id, Some("status")))
                    .json(json!({ "status": status }))
            }
            Mutation::DeleteReview(id) => ApiRequest::delete(resource_path("review", id, None)),
            Mutation::CreateUser(body) => ApiRequest::post("/user").json(body.clone()),
            Mutation::UpdateUser { id, body } => {
                ApiRequest::put(resource_path("user", id, None)).json(body.clone())
            }
            Mutation::DeleteUser(id) => ApiRequest::delete(resource_path("user", id, None)),
            Mutation::CreateContent(parts) => ApiRequest::post("/content").multipart(parts.clone()),
            Mutation::UpdateContent { id, parts } => {
                ApiRequest::put(resource_path("content", id, None)).multipart(parts.clone())
            }
            Mutation::DeleteContent(id) => ApiRequest::delete(resource_path("content", id, None)),
            Mutation::CreateCategory(body) => ApiRequest::post("/category").json(body.clone()),
            Mutation::UpdateCategory { id, body } => {
                ApiRequest::put(resource_path("category", id, None)).json(body.clone())
            }
            Mutation::DeleteCategory(id) => ApiRequest::delete(resource_path("category", id, None)),
        }
    }

    pub fn invalidates(&self) -> Vec<Tag> {
        match self {
            Mutation::Login(_) => Vec::new(),
            Mutation::CreateProperty(_)
            | Mutation::UpdateProperty { .. }
            | Mutation::DeleteProperty(_) => vec![TagKind::Property.all()],
            Mutation::UpdateBookingStatus { id, .. } => {
                vec![TagKind::Booking.all(), TagKind::Booking.id(id)]
            }
            Mutation::DeleteBooking(_) => vec![TagKind::Booking.all()],
            Mutation::UpdateEnquiryStatus { id, .. } => {
                vec![TagKind::Enquiry.all(), TagKind::Enquiry.id(id)]
            }
            Mutation::DeleteEnquiry(_) => vec![TagKind::Enquiry.all()],
            Mutation::UpdateReviewStatus { .. } | Mutation::DeleteReview(_) => {
                vec![TagKind::Review.all()]
            }
            Mutation::CreateUser(_) | Mutation::UpdateUser { .. } | Mutation::DeleteUser(_) => {
                vec![TagKind::User.all()]
            }
            Mutation::CreateContent(_)
            | Mutation::UpdateContent { .. }
            | Mutation::DeleteContent(_) => vec![TagKind::Content.all()],
            Mutation::CreateCategory(_)
            | Mutation::UpdateCategory { .. }
            | Mutation::DeleteCategory(_) => vec![TagKind::Category.all()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staydesk_api::{Method, RequestBody};

    #[test]
    fn test_booking_status_request() {
        let m = Mutation::UpdateBookingStatus {
            id: "b1".into(),
            status: BookingStatus::Confirmed,
        };
        let req = m.request();
        assert_eq!(req.method, Method::Put);
        assert_eq!(req.path, "/booking/b1/status");
        assert_eq!(req.body, RequestBody::Json(json!({"status": "confirmed"})));
        assert_eq!(
            m.invalidates(),
            vec![Tag::of("Booking"), Tag::with_id("Booking", "b1")]
        );
    }

    #[test]
    fn test_list_query_carries_params() {
        let mut params = ListParams::default();
        params.set_search("ocean");
        let req = Query::Properties(params).request();
        assert_eq!(req.path, "/property");
        assert!(req.query.contains(&("search".to_string(), "ocean".to_string())));
    }

    #[test]
    fn test_keys_differ_by_args() {
        let a = Query::BookingById("b1".into()).key().unwrap();
        let b = Query::BookingById("b2".into()).key().unwrap();
        assert_ne!(a, b);

        let mut p2 = ListParams::default();
        p2.next_page();
        assert_ne!(
            Query::Bookings(ListParams::default()).key().unwrap(),
            Query::Bookings(p2).key().unwrap()
        );
    }

    #[test]
    fn test_property_detail_only_provides_generic_tag() {
        assert_eq!(
            Query::PropertyById("p1".into()).provides(),
            vec![Tag::of("Property")]
        );
    }

    #[test]
    fn test_review_status_only_invalidates_generic_tag() {
        let m = Mutation::UpdateReviewStatus {
            id: "r1".into(),
            status: ReviewStatus::Approved,
        };
        assert_eq!(m.invalidates(), vec![Tag::of("Review")]);
        assert_eq!(m.request().method, Method::Patch);
    }

    #[test]
    fn test_login_invalidates_nothing() {
        let m = Mutation::Login(Credentials {
            email: "a@b.co".into(),
            password: "pw".into(),
        });
        assert!(m.invalidates().is_empty());
        assert_eq!(m.request().path, "/auth/login");
    }
}
