use serde_json::Value;
use staydesk_cache::{QuerySnapshot, QueryStatus, Subscription};
use tracing::debug;

use crate::{models::ListParams, models::Resource, slice::ApiSlice, Error, Result};

/// What a screen should render for its query
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    /// Spinner
    Loading,
    Ready(Value),
    /// Error branch with a retry affordance
    Failed { message: String, not_found: bool },
}

impl From<&QuerySnapshot> for ViewState {
    fn from(snapshot: &QuerySnapshot) -> Self {
        match (snapshot.status, &snapshot.data, &snapshot.error) {
            (QueryStatus::Error, _, Some(err)) => ViewState::Failed {
                message: err.message.clone(),
                not_found: err.is_not_found(),
            },
            // A refetch keeps showing what we already have
            (QueryStatus::Success | QueryStatus::Refetching, Some(data), _) => {
                ViewState::Ready(data.clone())
            }
            _ => ViewState::Loading,
        }
    }
}

/// A paged, searchable list screen
///
/// Holds the local UI state and the subscription for the current
/// arguments. Every state change swaps in a subscription for the new
/// arguments; the old one is released, not cancelled.
pub struct ListView {
    slice: ApiSlice,
    resource: Resource,
    params: ListParams,
    subscription: Subscription,
}

impl ListView {
    pub fn mount(slice: ApiSlice, resource: Resource, params: ListParams) -> Result<Self> {
        let subscription = slice.query(resource.list_query(params.clone()))?;
        Ok(Self {
            slice,
            resource,
            params,
            subscription,
        })
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn params(&self) -> &ListParams {
        &self.params
    }

    /// Apply a state change; re-subscribes only if the arguments changed
    pub fn update(&mut self, change: impl FnOnce(&mut ListParams)) -> Result<()> {
        let mut next = self.params.clone();
        change(&mut next);
        if next == self.params {
            return Ok(());
        }

        debug!("{} view: {:?} -> {:?}", self.resource, self.params, next);
        self.subscription = self.slice.query(self.resource.list_query(next.clone()))?;
        self.params = next;
        Ok(())
    }

    pub fn search(&mut self, text: &str) -> Result<()> {
        self.update(|p| p.set_search(text))
    }

    pub fn filter(&mut self, key: &str, value: Option<&str>) -> Result<()> {
        self.update(|p| p.set_filter(key, value))
    }

    pub fn next_page(&mut self) -> Result<()> {
        self.update(ListParams::next_page)
    }

    pub fn prev_page(&mut self) -> Result<()> {
        self.update(ListParams::prev_page)
    }

    pub fn state(&self) -> ViewState {
        ViewState::from(&self.subscription.snapshot())
    }

    /// Wait for the current fetch, then report what to render
    pub async fn settled(&self) -> ViewState {
        // Failure ends up in the snapshot; the view branches on that.
        self.subscription.wait().await.ok();
        self.state()
    }

    pub fn retry(&self) {
        self.subscription.refetch();
    }
}

/// A single-record screen
pub struct DetailView {
    subscription: Subscription,
}

impl DetailView {
    pub fn mount(slice: &ApiSlice, resource: Resource, id: &str) -> Result<Self> {
        let query = resource
            .detail_query(id)
            .ok_or_else(|| Error::UnknownResource(format!("{} has no detail view", resource)))?;
        Ok(Self {
            subscription: slice.query(query)?,
        })
    }

    pub fn state(&self) -> ViewState {
        ViewState::from(&self.subscription.snapshot())
    }

    pub async fn settled(&self) -> ViewState {
        self.subscription.wait().await.ok();
        self.state()
    }

    pub fn retry(&self) {
        self.subscription.refetch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use staydesk_cache::FetchError;

    fn snapshot(status: QueryStatus, data: Option<Value>, error: Option<FetchError>) -> QuerySnapshot {
        QuerySnapshot {
            status,
            data,
            error,
            stale: false,
            subscribers: 1,
        }
    }

    #[test]
    fn test_loading_without_data() {
        let s = snapshot(QueryStatus::Loading, None, None);
        assert_eq!(ViewState::from(&s), ViewState::Loading);
    }

    #[test]
    fn test_refetch_keeps_old_data_visible() {
        let s = snapshot(QueryStatus::Refetching, Some(serde_json::json!([1])), None);
        assert_eq!(ViewState::from(&s), ViewState::Ready(serde_json::json!([1])));
    }

    #[test]
    fn test_error_branch_flags_not_found() {
        let s = snapshot(
            QueryStatus::Error,
            None,
            Some(FetchError::new(Some(404), "Enquiry not found")),
        );
        assert_eq!(
            ViewState::from(&s),
            ViewState::Failed {
                message: "Enquiry not found".into(),
                not_found: true
            }
        );
    }
}
