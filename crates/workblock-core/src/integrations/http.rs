//! Blocking JSON-over-HTTP helper shared by the adapters.
//!
//! The engine is synchronous, so each adapter owns a current-thread tokio
//! runtime and drives `reqwest` futures to completion on it. Adapters must
//! not be used from inside another runtime.

use std::future::Future;

use reqwest::{Client, RequestBuilder, StatusCode};

use crate::error::SyncError;

/// Which collaborator a request talks to; decides the error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Todoist,
    Google,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Service::Todoist => "todoist",
            Service::Google => "google",
        }
    }

    fn failure(&self, message: String) -> SyncError {
        match self {
            Service::Todoist => SyncError::TaskSource(message),
            Service::Google => SyncError::CalendarApi(message),
        }
    }
}

pub struct BlockingClient {
    runtime: tokio::runtime::Runtime,
    client: Client,
    service: Service,
}

impl BlockingClient {
    pub fn new(service: Service) -> Result<Self, SyncError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            client: Client::new(),
            service,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    /// Send `request` and decode the JSON body.
    ///
    /// Empty bodies (204 No Content) decode to `Value::Null`. 401 maps to
    /// [`SyncError::AuthenticationRequired`], 404 and 410 from the calendar
    /// to [`SyncError::EntryNotFound`], 429 to [`SyncError::RateLimited`].
    pub fn send_json(&self, request: RequestBuilder) -> Result<serde_json::Value, SyncError> {
        self.block_on(async {
            let resp = request.send().await?;
            let status = resp.status();
            let url = resp.url().path().to_string();
            let body = resp.text().await?;

            match status {
                s if s.is_success() => {
                    if body.trim().is_empty() {
                        Ok(serde_json::Value::Null)
                    } else {
                        Ok(serde_json::from_str(&body)?)
                    }
                }
                StatusCode::UNAUTHORIZED => Err(SyncError::AuthenticationRequired {
                    service: self.service.name().to_string(),
                }),
                StatusCode::TOO_MANY_REQUESTS => Err(SyncError::RateLimited),
                StatusCode::NOT_FOUND | StatusCode::GONE if self.service == Service::Google => {
                    Err(SyncError::EntryNotFound(url))
                }
                s => Err(self.service.failure(format!("HTTP {s}: {}", body.trim()))),
            }
        })
    }
}
