use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::core::errors::{Result, SealroomError};
use crate::core::traits::transport::RoomTransport;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct SendBody<'a> {
    message: &'a str,
    password: &'a str,
}

/// Room server reached over HTTP.
///
/// `GET {base}/messages?password=...` returns the room markup,
/// `POST {base}/send` takes `{"message", "password"}` as JSON.
pub struct HttpRoom {
    base_url: String,
    password: SecretString,
    cookie: Option<String>,
    client: reqwest::Client,
}

impl HttpRoom {
    pub fn new(base_url: &str, password: SecretString, cookie: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("sealroom/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SealroomError::TransportFailed {
                reason: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            password,
            cookie,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn with_cookie(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.cookie {
            Some(cookie) => req.header(reqwest::header::COOKIE, cookie),
            None => req,
        }
    }

    async fn check(resp: reqwest::Response, what: &str) -> Result<String> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| SealroomError::TransportFailed {
            reason: format!("{what}: failed to read response: {e}"),
        })?;

        if !status.is_success() {
            let body = body.trim();
            return Err(SealroomError::TransportFailed {
                reason: if body.is_empty() {
                    format!("{what}: server answered {status}")
                } else {
                    format!("{what}: {body}")
                },
            });
        }
        Ok(body)
    }
}

impl RoomTransport for HttpRoom {
    async fn fetch_messages(&self) -> Result<String> {
        let req = self
            .client
            .get(self.url("messages"))
            .query(&[("password", self.password.expose_secret())]);

        let resp = self
            .with_cookie(req)
            .send()
            .await
            .map_err(|e| SealroomError::TransportFailed {
                reason: format!("fetching messages: {e}"),
            })?;

        Self::check(resp, "fetching messages").await
    }

    async fn send(&self, payload: &str) -> Result<()> {
        let body = SendBody {
            message: payload,
            password: self.password.expose_secret(),
        };
        let req = self.client.post(self.url("send")).json(&body);

        let resp = self
            .with_cookie(req)
            .send()
            .await
            .map_err(|e| SealroomError::TransportFailed {
                reason: format!("sending message: {e}"),
            })?;

        Self::check(resp, "sending message").await.map(|_| ())
    }
}
