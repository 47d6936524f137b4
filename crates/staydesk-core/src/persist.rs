use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use staydesk_cache::LocalStore;
use tracing::{debug, warn};

use crate::Result;

/// Name of the one whitelisted slice
pub const PLAN_SLICE: &str = "plan";

/// The persisted UI slice: which plan the admin picked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSelection {
    pub selected_plan: Option<String>,
}

/// One slice of UI state kept across restarts
///
/// The stored record is an object under a single root key holding only
/// whitelisted slices, e.g. `{"plan": {"selected_plan": "pro"}}`. There is
/// no versioning: data that no longer parses is dropped in favour of the
/// default.
pub struct PersistedSlice<T> {
    store: Arc<LocalStore>,
    root_key: String,
    slice: &'static str,
    timeout: Duration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PersistedSlice<T>
where
    T: Serialize + DeserializeOwned + Default + Send + 'static,
{
    pub fn new(
        store: Arc<LocalStore>,
        root_key: impl Into<String>,
        slice: &'static str,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            root_key: root_key.into(),
            slice,
            timeout,
            _marker: PhantomData,
        }
    }

    /// Load the slice at startup, bounded by the rehydration timeout
    pub async fn rehydrate(&self) -> T {
        let store = Arc::clone(&self.store);
        let root_key = self.root_key.clone();
        let slice = self.slice;

        let load = tokio::task::spawn_blocking(move || -> Result<Option<T>> {
            let root: Option<Value> = store.get_json(&root_key)?;
            match root.and_then(|mut r| r.get_mut(slice).map(Value::take)) {
                Some(value) => Ok(Some(serde_json::from_value(value)?)),
                None => Ok(None),
            }
        });

        match tokio::time::timeout(self.timeout, load).await {
            Ok(Ok(Ok(Some(value)))) => {
                debug!("Rehydrated slice '{}'", self.slice);
                value
            }
            Ok(Ok(Ok(None))) => T::default(),
            Ok(Ok(Err(e))) => {
                warn!("Discarding persisted slice '{}': {}", self.slice, e);
                T::default()
            }
            Ok(Err(e)) => {
                warn!("Rehydration task failed: {}", e);
                T::default()
            }
            Err(_) => {
                warn!(
                    "Rehydration of '{}' timed out after {:?}",
                    self.slice, self.timeout
                );
                T::default()
            }
        }
    }

    /// Write the slice, leaving any other slices in the record alone
    pub fn persist(&self, value: &T) -> Result<()> {
        let mut root = match self.store.get_json::<Value>(&self.root_key) {
            Ok(Some(Value::Object(map))) => map,
            _ => Map::new(),
        };
        root.insert(self.slice.to_string(), serde_json::to_value(value)?);
        self.store.set_json(&self.root_key, &Value::Object(root))?;
        Ok(())
    }

    /// Forget the whole persisted record
    pub fn purge(&self) -> Result<()> {
        self.store.remove(&self.root_key)?;
        Ok(())
    }
}
