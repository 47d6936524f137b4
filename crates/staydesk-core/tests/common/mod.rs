// Shared helpers for the core integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use staydesk_api::{ApiError, ApiRequest, Method, Transport};
use staydesk_cache::QueryCache;
use staydesk_core::ApiSlice;

type Responder = Box<dyn Fn(&ApiRequest, usize) -> Result<Value, ApiError> + Send + Sync>;

/// Transport that records every request and answers from a closure
///
/// The closure also gets the running call number, so repeated reads of the
/// same path return distinguishable bodies.
pub struct FakeTransport {
    calls: Mutex<Vec<ApiRequest>>,
    responder: Responder,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest, usize) -> Result<Value, ApiError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// Echoes method, path and call number back
    pub fn echo() -> Arc<Self> {
        Self::new(|req, n| Ok(json!({"method": req.method.as_str(), "path": req.path, "n": n})))
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: ApiRequest) -> staydesk_api::Result<Value> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len()
        };
        (self.responder)(&request, n)
    }
}

pub fn slice_with(transport: Arc<FakeTransport>) -> ApiSlice {
    ApiSlice::new(transport, QueryCache::new())
}
