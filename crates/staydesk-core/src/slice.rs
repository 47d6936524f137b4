use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use staydesk_api::{ApiError, Transport};
use staydesk_cache::{FetchError, FetchFn, QueryCache, Subscription};
use tracing::{info, warn};

use crate::{
    endpoints::{Mutation, Query},
    toast::Notifier,
    Result,
};

/// Typed endpoints bound to a transport and a query cache
///
/// Reads go through the cache; writes go straight to the transport and,
/// once the server acknowledges them, invalidate their tags. Nothing is
/// written to the cache ahead of the server's answer.
#[derive(Clone)]
pub struct ApiSlice {
    transport: Arc<dyn Transport>,
    cache: QueryCache,
}

impl ApiSlice {
    pub fn new(transport: Arc<dyn Transport>, cache: QueryCache) -> Self {
        Self { transport, cache }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Subscribe to a read. Must be called inside a Tokio runtime.
    pub fn query(&self, query: Query) -> Result<Subscription> {
        let key = query.key()?;
        let provides = query.provides();
        let request = query.request();
        let transport = Arc::clone(&self.transport);

        let fetch: FetchFn = Arc::new(move || {
            let transport = Arc::clone(&transport);
            let request = request.clone();
            async move { transport.execute(request).await.map_err(to_fetch_error) }.boxed()
        });

        Ok(self.cache.subscribe(key, provides, fetch))
    }

    /// Run a write and invalidate its tags on success
    ///
    /// A failure leaves the cache exactly as it was.
    pub async fn mutate(&self, mutation: Mutation) -> Result<Value> {
        let name = mutation.name();
        let tags = mutation.invalidates();

        info!("Running {}", name);
        match self.transport.execute(mutation.request()).await {
            Ok(value) => {
                let refetched = self.cache.invalidate(&tags);
                info!("{} succeeded, {} queries refetching", name, refetched.len());
                Ok(value)
            }
            Err(err) => {
                warn!("{} failed: {}", name, err);
                Err(err.into())
            }
        }
    }

    /// [`ApiSlice::mutate`] plus a toast either way
    ///
    /// Errors show the server's own message.
    pub async fn mutate_with_toast(
        &self,
        mutation: Mutation,
        notifier: &dyn Notifier,
        success_message: &str,
    ) -> Result<Value> {
        match self.mutate(mutation).await {
            Ok(value) => {
                notifier.success(success_message);
                Ok(value)
            }
            Err(err) => {
                notifier.error(&err.user_message());
                Err(err)
            }
        }
    }
}

/// Flatten an API error into what the cache stores
pub fn to_fetch_error(err: ApiError) -> FetchError {
    FetchError::new(err.status(), err.user_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, ListParams};
    use crate::toast::{ToastKind, ToastLog};
    use async_trait::async_trait;
    use mockall::predicate::eq;
    use serde_json::json;
    use staydesk_api::ApiRequest;
    use staydesk_cache::QueryStatus;

    mockall::mock! {
        pub Backend {}

        #[async_trait]
        impl Transport for Backend {
            async fn execute(&self, request: ApiRequest) -> staydesk_api::Result<Value>;
        }
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_cache_untouched() {
        let mut backend = MockBackend::new();
        backend
            .expect_execute()
            .withf(|req| req.path == "/booking")
            .times(1)
            .returning(|_| Ok(json!([{"_id": "b1"}])));
        backend
            .expect_execute()
            .withf(|req| req.path == "/booking/b1")
            .times(1)
            .returning(|_| Err(ApiError::Status {
                status: 409,
                message: "Booking has payments".into(),
            }));

        let slice = ApiSlice::new(Arc::new(backend), QueryCache::new());
        let list = slice.query(Query::Bookings(ListParams::default())).unwrap();
        list.wait().await.unwrap();
        let before = list.snapshot();

        let toasts = ToastLog::new();
        let err = slice
            .mutate_with_toast(Mutation::DeleteBooking("b1".into()), &toasts, "Deleted")
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "Booking has payments");
        assert_eq!(toasts.last().unwrap().kind, ToastKind::Error);
        assert_eq!(list.snapshot(), before);
        assert_eq!(list.snapshot().status, QueryStatus::Success);
    }

    #[tokio::test]
    async fn test_query_error_is_stored_with_status() {
        let mut backend = MockBackend::new();
        backend
            .expect_execute()
            .returning(|_| Err(ApiError::NotFound("Booking not found".into())));

        let slice = ApiSlice::new(Arc::new(backend), QueryCache::new());
        let sub = slice.query(Query::BookingById("nope".into())).unwrap();
        let err = sub.wait().await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.message, "Booking not found");
    }

    #[tokio::test]
    async fn test_successful_mutation_returns_body() {
        let mut backend = MockBackend::new();
        let expected = Mutation::UpdateBookingStatus {
            id: "b2".into(),
            status: BookingStatus::Cancelled,
        }
        .request();
        backend
            .expect_execute()
            .with(eq(expected))
            .times(1)
            .returning(|_| Ok(json!({"status": "cancelled"})));

        let slice = ApiSlice::new(Arc::new(backend), QueryCache::new());
        let value = slice
            .mutate(Mutation::UpdateBookingStatus {
                id: "b2".into(),
                status: BookingStatus::Cancelled,
            })
            .await
            .unwrap();
        assert_eq!(value["status"], "cancelled");
    }
}
