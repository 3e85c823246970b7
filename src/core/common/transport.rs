use std::fmt::Display;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Body of `POST /create-session`, the backend expects an empty object
#[derive(Serialize, Debug, Default)]
pub struct CreateSessionPayload {}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CreateSessionResponse {
    pub url: Option<String>,
    pub session_id: Option<String>,
}

impl CreateSessionResponse {
    /// Both fields are required to leave the start screen, anything else is a soft failure
    pub fn redirect_target(&self) -> Option<(&str, &str)> {
        match (self.url.as_deref(), self.session_id.as_deref()) {
            (Some(url), Some(session_id)) if !url.is_empty() && !session_id.is_empty() => {
                Some((url, session_id))
            }
            _ => None,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug)]
pub struct BackendResponseError {
    pub reason: String,
    pub status: Option<StatusCode>,
}

impl BackendResponseError {
    pub fn new(reason: String) -> Self {
        Self {
            reason,
            status: None,
        }
    }

    pub fn with_status(reason: String, status: StatusCode) -> Self {
        Self {
            reason,
            status: Some(status),
        }
    }
}

impl Display for BackendResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(s) => write!(f, "{} (HTTP {})", self.reason, s.as_u16()),
            None => write!(f, "{}", self.reason),
        }
    }
}

impl std::error::Error for BackendResponseError {}
