use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::{Transport, TransportError};
use crate::config::Config;
use crate::logging::{log, obj, v_num, v_str, v_u64, Domain, Level};
use crate::session::Credential;

pub struct HttpTransport {
    client: Client,
    base: String,
}

impl HttpTransport {
    pub fn new(cfg: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if cfg.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(cfg.request_timeout_secs));
        }
        Ok(Self {
            client: builder.build()?,
            base: cfg.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(
        &self,
        path: &str,
        credential: Option<&Credential>,
    ) -> Result<Option<Value>, TransportError> {
        let started = Instant::now();
        let mut req = self
            .client
            .get(self.url(path))
            .header(CONTENT_TYPE, "application/json");
        if let Some(cred) = credential {
            req = req.header(AUTHORIZATION, cred.authorization());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        log(
            Level::Debug,
            Domain::Transport,
            "http.get",
            obj(&[
                ("path", v_str(path)),
                ("status", v_u64(status.as_u16() as u64)),
                ("elapsed_ms", v_num(started.elapsed().as_secs_f64() * 1000.0)),
            ]),
        );

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(parse_body(&body))
    }
}

/// Success bodies that are empty or not JSON are a null result.
pub fn parse_body(body: &str) -> Option<Value> {
    if body.trim().is_empty() {
        return None;
    }
    serde_json::from_str(body).ok()
}

/// The service's `detail` field if present, else the status reason phrase.
pub fn error_message(status: StatusCode, body: &str) -> String {
    let detail = parse_body(body).and_then(|v| match v.get("detail") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    });
    detail.unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    })
}
