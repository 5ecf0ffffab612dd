//! Meeting authority HTTP client.
//!
//! The authority owns canonical room data (exists, active, capacity). The
//! gateway asks it once per join and reports live participant counts back.
//!
//! Endpoints:
//! - `GET  {base}/api/meetings/{room_id}` -> `{"success": bool, "meeting": {...}}`
//! - `PUT  {base}/api/meetings/{room_id}/participants` with `{"participantCount": n}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use huddle_core::error::{HuddleError, Result};
use huddle_core::model::MeetingInfo;

use crate::config::AuthoritySection;

/// Source of truth for meetings.
#[async_trait]
pub trait MeetingAuthority: Send + Sync {
    /// `Ok(None)` when the authority says the meeting does not exist.
    /// `Err` when it could not be asked or its answer could not be read.
    async fn get_meeting(&self, room_id: &str) -> Result<Option<MeetingInfo>>;

    async fn update_participant_count(&self, room_id: &str, count: usize) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct MeetingLookup {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    meeting: Option<MeetingInfo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantCountUpdate {
    participant_count: usize,
}

#[derive(Clone)]
pub struct HttpMeetingAuthority {
    client: Client,
    base_url: Url,
    service_token: Option<String>,
}

impl HttpMeetingAuthority {
    pub fn new(cfg: &AuthoritySection) -> Result<Self> {
        let base_url = Url::parse(&cfg.base_url)
            .map_err(|e| HuddleError::BadRequest(format!("authority.base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(HuddleError::BadRequest(
                "authority.base_url cannot be used as a base".into(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .connect_timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()
            .map_err(|e| HuddleError::Internal(format!("http client build failed: {e}")))?;

        Ok(Self {
            client,
            base_url,
            service_token: cfg.service_token.clone(),
        })
    }

    fn meeting_url(&self, room_id: &str, tail: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segs = url
                .path_segments_mut()
                .map_err(|_| HuddleError::Internal("authority url has no path".into()))?;
            segs.pop_if_empty().extend(["api", "meetings", room_id]);
            if let Some(tail) = tail {
                segs.push(tail);
            }
        }
        Ok(url)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.service_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl MeetingAuthority for HttpMeetingAuthority {
    #[instrument(skip(self))]
    async fn get_meeting(&self, room_id: &str) -> Result<Option<MeetingInfo>> {
        let url = self.meeting_url(room_id, None)?;

        let response = self.authorize(self.client.get(url)).send().await.map_err(|e| {
            warn!(target: "huddle.authority", error = %e, "meeting lookup failed");
            HuddleError::Upstream("meeting authority is unavailable".into())
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            warn!(target: "huddle.authority", status = %status, "meeting lookup rejected");
            return Err(HuddleError::Upstream(format!("meeting lookup returned {status}")));
        }

        let lookup: MeetingLookup = response.json().await.map_err(|e| {
            warn!(target: "huddle.authority", error = %e, "meeting lookup unreadable");
            HuddleError::Upstream("meeting lookup response unreadable".into())
        })?;

        if !lookup.success {
            return Ok(None);
        }
        Ok(lookup.meeting.map(|mut m| {
            if m.room_id.is_empty() {
                m.room_id = room_id.to_string();
            }
            m
        }))
    }

    #[instrument(skip(self))]
    async fn update_participant_count(&self, room_id: &str, count: usize) -> Result<()> {
        let url = self.meeting_url(room_id, Some("participants"))?;
        let body = ParticipantCountUpdate {
            participant_count: count,
        };

        let response = self
            .authorize(self.client.put(url).json(&body))
            .send()
            .await
            .map_err(|e| HuddleError::Upstream(format!("participant count report failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HuddleError::Upstream(format!(
                "participant count report returned {status}"
            )));
        }
        Ok(())
    }
}
