use serde::{Deserialize, Serialize};

use crate::models::episode::CanonicalEpisode;
use crate::models::show::ShowRecord;
use crate::services::RefreshMode;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EpisodeQuery {
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EpisodeResponse {
    pub episode: CanonicalEpisode,
    pub show: ShowRecord,
    pub mode: RefreshMode,
    /// Whether the caller should show a loading indicator for this trigger.
    pub loading: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub uptime_seconds: u64,
    pub version: &'static str,
}
