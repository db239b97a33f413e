#![allow(missing_docs)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use nav_core::HttpRequest;

/// How the mock answers one route variant.
#[derive(Clone, Debug)]
pub enum Reply {
    Json(&'static [u8]),
    Status(u16),
    Delayed(Duration, &'static [u8]),
    Refused,
}

#[derive(Clone, Debug)]
struct Replies {
    fastest: Reply,
    no_highways: Reply,
    shortest: Reply,
}

/// Routing service double. Replies are chosen by the variant encoded in the
/// request URL and every requested URL is recorded.
#[derive(Clone, Debug)]
pub struct MockHttp {
    replies: Arc<Mutex<Replies>>,
    requests: Arc<Mutex<Vec<String>>>,
}

pub const FASTEST: &[u8] = include_bytes!("../data/fastest.json");
pub const NO_HIGHWAYS: &[u8] = include_bytes!("../data/no-highways.json");
pub const SHORTEST: &[u8] = include_bytes!("../data/shortest.json");
pub const NO_ROUTE: &[u8] = include_bytes!("../data/no-route.json");

impl Default for MockHttp {
    fn default() -> Self {
        Self::new(Reply::Json(FASTEST), Reply::Json(NO_HIGHWAYS), Reply::Json(SHORTEST))
    }
}

impl MockHttp {
    #[must_use]
    pub fn new(fastest: Reply, no_highways: Reply, shortest: Reply) -> Self {
        Self {
            replies: Arc::new(Mutex::new(Replies { fastest, no_highways, shortest })),
            requests: Arc::default(),
        }
    }

    #[allow(clippy::missing_panics_doc)]
    pub fn set_replies(&self, fastest: Reply, no_highways: Reply, shortest: Reply) {
        *self.replies.lock().expect("lock") = Replies { fastest, no_highways, shortest };
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
        let url = request.uri().to_string();
        self.requests.lock().expect("lock").push(url.clone());

        let reply = {
            let replies = self.replies.lock().expect("lock");
            if url.contains("alternatives=true") {
                replies.fastest.clone()
            } else if url.contains("exclude=motorway") {
                replies.no_highways.clone()
            } else {
                replies.shortest.clone()
            }
        };

        match reply {
            Reply::Json(body) => Ok(Response::new(Bytes::from_static(body))),
            Reply::Status(code) => {
                let mut response = Response::new(Bytes::new());
                *response.status_mut() = StatusCode::from_u16(code)?;
                Ok(response)
            }
            Reply::Delayed(delay, body) => {
                tokio::time::sleep(delay).await;
                Ok(Response::new(Bytes::from_static(body)))
            }
            Reply::Refused => Err(anyhow!("connection refused")),
        }
    }
}
