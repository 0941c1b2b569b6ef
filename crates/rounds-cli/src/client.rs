//! Async HTTP client for the rounds JSON API.
//!
//! [`HttpRemote`] is the [`CareRemote`] the grid and daily-record screens run
//! against.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rounds_core::{
  dispatch::RecordUpdate,
  event::{Event, EventId, EventPatch, NewEvent},
  record::DailyRecord,
  remote::CareRemote,
  resident::Resident,
};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

/// Connection settings for the rounds API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
  /// Stamp value and note author for this session.
  pub actor:    String,
}

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("could not reach the server: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("{request} → {status}: {message}")]
  Status {
    request: String,
    status:  StatusCode,
    message: String,
  },
}

/// Shape of the API's error responses.
#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpRemote {
  client: Client,
  config: ApiConfig,
}

impl HttpRemote {
  pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String { api_url(&self.config.base_url, path) }

  fn auth(&self, req: RequestBuilder) -> RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Send `req` and turn any non-2xx answer into [`ClientError::Status`].
  async fn send(&self, req: RequestBuilder, request: String) -> Result<Response, ClientError> {
    let resp = self.auth(req).send().await?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body = resp.bytes().await.unwrap_or_default();
    Err(ClientError::Status { request, status, message: error_message(status, &body) })
  }

  async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    date: Option<NaiveDate>,
  ) -> Result<T, ClientError> {
    let mut req = self.client.get(self.url(path));
    if let Some(date) = date {
      req = req.query(&[("date", date.format("%Y-%m-%d").to_string())]);
    }
    let resp = self.send(req, format!("GET {path}")).await?;
    Ok(resp.json().await?)
  }

  // ── Residents ─────────────────────────────────────────────────────────────

  /// `GET /api/residents`
  pub async fn list_residents(&self) -> Result<Vec<Resident>, ClientError> {
    self.get_json("/residents", None).await
  }
}

impl CareRemote for HttpRemote {
  type Error = ClientError;

  async fn fetch_events(&self, date: NaiveDate) -> Result<Vec<Event>, ClientError> {
    self.get_json("/events", Some(date)).await
  }

  async fn create_event(&self, input: NewEvent) -> Result<Event, ClientError> {
    let req = self.client.post(self.url("/events")).json(&input);
    let resp = self.send(req, "POST /events".into()).await?;
    Ok(resp.json().await?)
  }

  async fn update_event(&self, id: EventId, patch: EventPatch) -> Result<Event, ClientError> {
    let path = format!("/events/{id}");
    let req = self.client.patch(self.url(&path)).json(&patch);
    let resp = self.send(req, format!("PATCH {path}")).await?;
    Ok(resp.json().await?)
  }

  async fn delete_event(&self, id: EventId) -> Result<(), ClientError> {
    let path = format!("/events/{id}");
    let req = self.client.delete(self.url(&path));
    self.send(req, format!("DELETE {path}")).await?;
    Ok(())
  }

  async fn fetch_daily_records(&self, date: NaiveDate) -> Result<Vec<DailyRecord>, ClientError> {
    self.get_json("/daily-records", Some(date)).await
  }

  async fn update_record(&self, update: RecordUpdate) -> Result<(), ClientError> {
    let path = format!("/records/{}/{}", update.resource, update.record_id);
    let req = self.client.patch(self.url(&path)).json(&update.body());
    self.send(req, format!("PATCH {path}")).await?;
    Ok(())
  }

  fn current_actor(&self) -> String { self.config.actor.clone() }
}

fn api_url(base: &str, path: &str) -> String {
  format!("{}/api{}", base.trim_end_matches('/'), path)
}

/// The server's `{"error": …}` text if present, else the status reason.
fn error_message(status: StatusCode, body: &[u8]) -> String {
  serde_json::from_slice::<ErrorBody>(body)
    .map(|b| b.error)
    .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_joins_under_api() {
    assert_eq!(api_url("http://host:8080/", "/events"), "http://host:8080/api/events");
    assert_eq!(api_url("http://host:8080", "/residents"), "http://host:8080/api/residents");
  }

  #[test]
  fn error_message_prefers_the_server_text() {
    let body = br#"{"error":"event not found: srv-1"}"#;
    assert_eq!(error_message(StatusCode::NOT_FOUND, body), "event not found: srv-1");
  }

  #[test]
  fn error_message_falls_back_to_the_reason_phrase() {
    assert_eq!(error_message(StatusCode::BAD_GATEWAY, b"<html>"), "Bad Gateway");
  }

  #[test]
  fn actor_comes_from_config() {
    let remote = HttpRemote::new(ApiConfig {
      base_url: "http://localhost:8080".into(),
      username: String::new(),
      password: String::new(),
      actor:    "T".into(),
    })
    .unwrap();
    assert_eq!(remote.current_actor(), "T");
  }
}
