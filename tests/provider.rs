#![allow(missing_docs)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use nav_core::HttpRequest;

pub const EQUATOR_ROUTE: &[u8] = include_bytes!("../data/equator-route.json");

/// Routing service double answering every variant with the same route.
#[derive(Clone, Debug, Default)]
pub struct MockHttp {
    offline: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockHttp {
    /// Make every subsequent request fail.
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl HttpRequest for MockHttp {
    async fn fetch(&self, request: Request<Vec<u8>>) -> anyhow::Result<Response<Bytes>> {
        self.requests.lock().expect("lock").push(request.uri().to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(anyhow!("network unreachable"));
        }
        Ok(Response::new(Bytes::from_static(EQUATOR_ROUTE)))
    }
}
