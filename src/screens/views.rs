use std::fmt::Display;

use crate::core::navigation::Route;

use super::{polling::VerificationStatus, status::ScreenSnapshot};

pub const RETURN_HOME_LABEL: &str = "Return Home";
pub const PLEASE_WAIT_LABEL: &str = "Please wait…";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub label: String,
    pub route: Route,
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct View {
    pub window_title: &'static str,
    pub heading: String,
    pub body: Vec<String>,
    /// immediate, never gated by the grace timer
    pub action: Option<Action>,
    pub return_home: Action,
    pub session_footer: Option<String>,
}

/// Whether the shared "return home" action is usable for this snapshot.
///
/// Only statuses that may have taken the user time to reach are gated by the grace timer.
pub fn return_home_enabled(snapshot: &ScreenSnapshot) -> bool {
    match snapshot.status {
        VerificationStatus::Loading | VerificationStatus::Error | VerificationStatus::Canceled => {
            true
        }
        _ => snapshot.grace_elapsed,
    }
}

pub fn render(snapshot: &ScreenSnapshot) -> View {
    let start_over = |label: &str| {
        Some(Action {
            label: label.to_string(),
            route: Route::Start,
            enabled: true,
        })
    };

    let (window_title, heading, body, action) = match &snapshot.status {
        VerificationStatus::Loading => (
            "Verification in Progress",
            "Checking your verification…".to_string(),
            vec!["Hang on while we fetch the status of your verification.".to_string()],
            None,
        ),
        VerificationStatus::Verified => (
            "Verification Complete",
            "Identity verified".to_string(),
            vec!["Your identity has been successfully verified. Thank you!".to_string()],
            None,
        ),
        VerificationStatus::Processing => (
            "Verification in Progress",
            "Verification in progress".to_string(),
            vec![
                "Your documents have been submitted. Stripe is currently verifying them."
                    .to_string(),
                "This page refreshes automatically.".to_string(),
            ],
            None,
        ),
        VerificationStatus::RequiresInput => (
            "Verification Incomplete",
            "Additional information required".to_string(),
            vec![
                "We could not verify your identity with the documents provided.".to_string(),
                "Please start over and make sure your documents are clear and valid.".to_string(),
            ],
            start_over("Start Over"),
        ),
        VerificationStatus::Canceled => (
            "Verification Canceled",
            "Verification canceled".to_string(),
            vec!["The verification was canceled before it could complete.".to_string()],
            start_over("Try Again"),
        ),
        VerificationStatus::Error => (
            "Verification Error",
            "Something went wrong".to_string(),
            vec![snapshot
                .error_message
                .clone()
                .unwrap_or_else(|| super::status::GENERIC_STATUS_ERROR.to_string())],
            None,
        ),
        VerificationStatus::Other(status) => (
            "Verification Status",
            "Unknown status".to_string(),
            vec![format!("Received an unexpected verification status: {status}")],
            None,
        ),
    };

    let enabled = return_home_enabled(snapshot);

    View {
        window_title,
        heading,
        body,
        action,
        return_home: Action {
            label: match enabled {
                true => RETURN_HOME_LABEL.to_string(),
                false => PLEASE_WAIT_LABEL.to_string(),
            },
            route: Route::Start,
            enabled,
        },
        session_footer: snapshot
            .session_id
            .as_ref()
            .map(|id| format!("Session ID: {id}")),
    }
}

impl Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[{}]", self.window_title)?;
        writeln!(f, "{}", self.heading)?;
        writeln!(f)?;

        for line in &self.body {
            writeln!(f, "{line}")?;
        }

        writeln!(f)?;

        if let Some(action) = &self.action {
            writeln!(f, "  ({}) -> {}", action.label, action.route)?;
        }

        let marker = if self.return_home.enabled { ">" } else { "x" };
        writeln!(f, "  ({}) {marker}", self.return_home.label)?;

        if let Some(footer) = &self.session_footer {
            writeln!(f)?;
            writeln!(f, "{footer}")?;
        }

        Ok(())
    }
}
