mod common;

use common::{slice_with, FakeTransport};
use serde_json::json;
use staydesk_api::{ApiError, Method, RequestBody};
use staydesk_cache::QueryStatus;
use staydesk_core::{
    BookingStatus, ListParams, Mutation, Query, ReviewStatus, ToastKind, ToastLog,
};

#[tokio::test]
async fn test_booking_status_update_refetches_list_and_detail() {
    let transport = FakeTransport::echo();
    let slice = slice_with(transport.clone());

    let list = slice.query(Query::Bookings(ListParams::default())).unwrap();
    let detail = slice.query(Query::BookingById("b1".into())).unwrap();
    slice.cache().settle().await;
    assert_eq!(transport.count(Method::Get, "/booking"), 1);
    assert_eq!(transport.count(Method::Get, "/booking/b1"), 1);

    let toasts = ToastLog::new();
    slice
        .mutate_with_toast(
            Mutation::UpdateBookingStatus {
                id: "b1".into(),
                status: BookingStatus::Confirmed,
            },
            &toasts,
            "Booking status updated",
        )
        .await
        .unwrap();

    let puts: Vec<_> = transport
        .calls()
        .into_iter()
        .filter(|r| r.method == Method::Put)
        .collect();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].path, "/booking/b1/status");
    assert_eq!(puts[0].body, RequestBody::Json(json!({"status": "confirmed"})));

    slice.cache().settle().await;
    assert_eq!(transport.count(Method::Get, "/booking"), 2);
    assert_eq!(transport.count(Method::Get, "/booking/b1"), 2);
    assert_eq!(list.snapshot().status, QueryStatus::Success);
    assert_eq!(detail.snapshot().status, QueryStatus::Success);

    let toast = toasts.last().unwrap();
    assert_eq!(toast.kind, ToastKind::Success);
    assert_eq!(toast.message, "Booking status updated");
}

#[tokio::test]
async fn test_property_detail_refetches_after_unrelated_create() {
    let transport = FakeTransport::echo();
    let slice = slice_with(transport.clone());

    let detail = slice.query(Query::PropertyById("p1".into())).unwrap();
    let first = detail.wait().await.unwrap();

    slice
        .mutate(Mutation::CreateProperty(Vec::new()))
        .await
        .unwrap();
    slice.cache().settle().await;

    assert_eq!(transport.count(Method::Get, "/property/p1"), 2);
    assert_ne!(detail.wait().await.unwrap(), first);
}

#[tokio::test]
async fn test_status_update_reaches_every_booking_entry() {
    let transport = FakeTransport::echo();
    let slice = slice_with(transport.clone());

    let _list = slice.query(Query::Bookings(ListParams::default())).unwrap();
    let _b1 = slice.query(Query::BookingById("b1".into())).unwrap();
    slice.cache().settle().await;

    // Status update on b2 hits the generic tag, which reaches every booking
    // entry, b1's detail included.
    slice
        .mutate(Mutation::UpdateBookingStatus {
            id: "b2".into(),
            status: BookingStatus::Cancelled,
        })
        .await
        .unwrap();
    slice.cache().settle().await;
    assert_eq!(transport.count(Method::Get, "/booking"), 2);
    assert_eq!(transport.count(Method::Get, "/booking/b1"), 2);

    // Other kinds are untouched
    slice
        .mutate(Mutation::UpdateReviewStatus {
            id: "r1".into(),
            status: ReviewStatus::Approved,
        })
        .await
        .unwrap();
    slice.cache().settle().await;
    assert_eq!(transport.count(Method::Get, "/booking"), 2);
    assert_eq!(transport.count(Method::Get, "/booking/b1"), 2);
}

#[tokio::test]
async fn test_unsubscribed_query_waits_for_next_subscriber() {
    let transport = FakeTransport::echo();
    let slice = slice_with(transport.clone());

    let sub = slice.query(Query::Users(ListParams::default())).unwrap();
    sub.wait().await.unwrap();
    drop(sub);

    slice
        .mutate(Mutation::CreateUser(json!({"name": "Ana"})))
        .await
        .unwrap();
    slice.cache().settle().await;
    assert_eq!(transport.count(Method::Get, "/user"), 1);

    let again = slice.query(Query::Users(ListParams::default())).unwrap();
    again.wait().await.unwrap();
    assert_eq!(transport.count(Method::Get, "/user"), 2);
}

#[tokio::test]
async fn test_concurrent_identical_queries_share_one_request() {
    let transport = FakeTransport::echo();
    let slice = slice_with(transport.clone());

    let a = slice.query(Query::ReviewById("r1".into())).unwrap();
    let b = slice.query(Query::ReviewById("r1".into())).unwrap();
    let (ra, rb) = tokio::join!(a.wait(), b.wait());

    assert_eq!(ra.unwrap(), rb.unwrap());
    assert_eq!(transport.count(Method::Get, "/review/r1"), 1);
}

#[tokio::test]
async fn test_failed_mutation_does_not_touch_cache() {
    let transport = FakeTransport::new(|req, n| match req.method {
        Method::Get => Ok(json!({"n": n})),
        _ => Err(ApiError::Status {
            status: 500,
            message: "Database unavailable".into(),
        }),
    });
    let slice = slice_with(transport.clone());

    let list = slice.query(Query::Enquiries(ListParams::default())).unwrap();
    list.wait().await.unwrap();
    let before = list.snapshot();

    let toasts = ToastLog::new();
    let err = slice
        .mutate_with_toast(Mutation::DeleteEnquiry("e1".into()), &toasts, "Deleted")
        .await
        .unwrap_err();
    slice.cache().settle().await;

    assert_eq!(err.user_message(), "Database unavailable");
    assert_eq!(list.snapshot(), before);
    assert_eq!(transport.count(Method::Get, "/enquiry"), 1);
    assert_eq!(toasts.last().unwrap().message, "Database unavailable");
}
