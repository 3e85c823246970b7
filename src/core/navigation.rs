use std::fmt::Display;

use log::info;
use mockall::automock;
use reqwest::Url;

/// Query parameter the provider appends to the return URL
pub const SESSION_ID_QUERY_PARAMETER: &str = "session_id";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// `/`
    Start,
    /// `/complete`, with an optional `session_id` query parameter
    Complete { session_id: Option<String> },
}

impl Route {
    /// Resolves a path (`/complete?session_id=vs_1`) or an absolute return URL to a route
    pub fn parse(location: &str) -> Result<Self, RouteError> {
        let base = Url::parse("http://localhost/").map_err(|e| RouteError::new(e.to_string()))?;

        let url = base
            .join(location.trim())
            .map_err(|e| RouteError::new(format!("invalid location {location}: {e}")))?;

        match url.path().trim_end_matches('/') {
            "" => Ok(Route::Start),
            "/complete" => {
                let session_id = url
                    .query_pairs()
                    .find(|(k, _)| k == SESSION_ID_QUERY_PARAMETER)
                    .map(|(_, v)| v.into_owned())
                    .filter(|v| !v.is_empty());

                Ok(Route::Complete { session_id })
            }
            other => Err(RouteError::new(format!("no screen is mounted on {other}"))),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Start => "/".to_string(),
            Route::Complete { session_id: None } => "/complete".to_string(),
            Route::Complete {
                session_id: Some(id),
            } => {
                let query = reqwest::Url::parse_with_params(
                    "http://localhost/complete",
                    &[(SESSION_ID_QUERY_PARAMETER, id)],
                )
                .ok()
                .and_then(|u| u.query().map(str::to_string))
                .unwrap_or_default();

                format!("/complete?{query}")
            }
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Browser-level navigation.
///
/// `redirect` leaves the application for an external page and must stay a full page load,
/// the provider's hosted flow does not work inside the application.
#[automock]
pub trait Navigator: Send + Sync {
    fn redirect(&self, url: &str);
    fn navigate(&self, route: &Route);
}

/// Navigator for a terminal, the user opens the provider page in their own browser
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn redirect(&self, url: &str) {
        info!("redirecting to verification provider");
        println!("Continue your verification at:\n\n    {url}\n");
        println!(
            "Once done, run `complete` (or `navigate` with the return URL) to follow the result."
        );
    }

    fn navigate(&self, route: &Route) {
        info!("navigating to {route}");

        if *route == Route::Start {
            println!("Back to the start screen, run `start` to verify again.");
        }
    }
}

#[derive(Debug)]
pub struct RouteError {
    reason: String,
}

impl RouteError {
    pub fn new(reason: String) -> Self {
        Self { reason }
    }
}

impl Display for RouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for RouteError {}
