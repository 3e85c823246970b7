use std::{io::Write, sync::Arc};

use log::{debug, info};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::screens::{
    polling::VerificationStatus,
    start::{StartOutcome, StartScreen, VerificationNotStarted, START_SCREEN_TITLE},
    status::{MountedStatusScreen, ScreenSnapshot, StatusScreen},
    views::{self, View},
};

use super::{
    backend::{HttpBackend, VerificationBackend},
    configuration::{Configuration, ConfigurationError},
    navigation::{Navigator, Route, TerminalNavigator},
    session_store::{FileSystemSessionStore, SessionStore},
};

struct Collaborators {
    backend: Arc<dyn VerificationBackend>,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
}

fn create_collaborators(
    conf: &Configuration,
) -> Result<Collaborators, Box<dyn std::error::Error + Send + Sync>> {
    if let Err(e) = conf.assert_data_dir_permissions() {
        return Err(Box::new(ConfigurationError::new(format!(
            "{e}: {}",
            conf.data_directory()
        ))));
    }

    let backend_url = conf.backend_url()?;

    debug!("using backend {backend_url}");

    Ok(Collaborators {
        backend: Arc::new(HttpBackend::new(&backend_url, conf.request_timeout())?),
        store: Arc::new(FileSystemSessionStore::new(&conf.data_directory())),
        navigator: Arc::new(TerminalNavigator),
    })
}

/// ### Start screen
/// Requests a verification session from the backend, stores its identifier and sends the user
/// to the provider's hosted verification page
/// ## Arguments
/// * `conf` - The configuration object
/// ## Errors
/// * When the client cannot be set up
/// * When the attempt failed, the user may run `start` again
pub async fn start(conf: &Configuration) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let collaborators = create_collaborators(conf)?;

    let screen = StartScreen::new(
        collaborators.backend,
        collaborators.store,
        collaborators.navigator,
    );

    run_start_screen(&screen, &mut std::io::stdout()).await
}

async fn run_start_screen<W: Write>(
    screen: &StartScreen,
    out: &mut W,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    writeln!(out, "{START_SCREEN_TITLE}\n")?;
    writeln!(out, "  ({})", screen.button_label())?;

    let attempt = screen.begin_verification();
    tokio::pin!(attempt);

    // the attempt is polled first so the busy label is shown while the request is in flight
    let outcome = tokio::select! {
        biased;
        outcome = &mut attempt => outcome,
        _ = std::future::ready(()) => {
            writeln!(out, "  ({})", screen.button_label())?;
            out.flush()?;
            attempt.await
        }
    };

    match outcome {
        StartOutcome::Redirected(_) => Ok(()),
        StartOutcome::Stayed | StartOutcome::Busy => {
            writeln!(out, "  ({})", screen.button_label())?;
            Err(Box::new(VerificationNotStarted::new(
                "verification could not be started, run `start` again".to_string(),
            )))
        }
    }
}

/// ### Status screen
/// Follows the verification session until it settles, then lets the user return home
/// ## Arguments
/// * `conf` - The configuration object
/// * `session_id` - Session identifier from the return url, the stored one is used when `None`
/// ## Notes
/// * Without any session identifier the user is sent back to the start screen
/// * Ctrl-C unmounts the screen
pub async fn complete(
    conf: &Configuration,
    session_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let collaborators = create_collaborators(conf)?;

    let screen = StatusScreen::new(
        collaborators.backend,
        collaborators.store,
        collaborators.navigator,
        conf.poll_timings(),
    );

    let mut mounted = match screen.mount(session_id).await {
        Some(m) => m,
        None => return Ok(()),
    };

    follow(&mut mounted, conf.auto_return()).await
}

/// Opens a client location such as the provider's return url
pub async fn navigate(
    conf: &Configuration,
    location: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match Route::parse(location)? {
        Route::Start => start(conf).await,
        Route::Complete { session_id } => complete(conf, session_id).await,
    }
}

/// Whether the status screen may be left, on its own when `auto_return` is set.
///
/// Auto return waits for the grace timer whatever the status.
fn can_leave(snapshot: &ScreenSnapshot, auto_return: bool) -> bool {
    if !snapshot.is_settled() {
        return false;
    }

    if auto_return {
        return snapshot.grace_elapsed;
    }

    snapshot.return_home_enabled() || views::render(snapshot).action.is_some()
}

/// Errors never start a grace timer, with auto return they fall back to asking the user
fn waits_for_user(snapshot: &ScreenSnapshot, auto_return: bool) -> bool {
    auto_return && snapshot.status == VerificationStatus::Error
}

async fn follow(
    mounted: &mut MountedStatusScreen,
    auto_return: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut updates = mounted.subscribe();
    let mut shown: Option<View> = None;
    let mut snapshot;

    loop {
        snapshot = updates.borrow_and_update().clone();
        let view = views::render(&snapshot);

        if shown.as_ref() != Some(&view) {
            println!("{view}");
            shown = Some(view);
        }

        if can_leave(&snapshot, auto_return) || waits_for_user(&snapshot, auto_return) {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, leaving status screen");
                mounted.unmount();
                return Ok(());
            }
        }
    }

    if auto_return && can_leave(&snapshot, auto_return) {
        mounted.return_home()?;
        return Ok(());
    }

    let leave_with_action = mounted.view().action.is_some();

    println!("Press Enter to continue.");

    let mut line = String::new();
    let mut reader = BufReader::new(tokio::io::stdin());

    tokio::select! {
        _ = reader.read_line(&mut line) => {}
        _ = tokio::signal::ctrl_c() => {
            mounted.unmount();
            return Ok(());
        }
    }

    match leave_with_action {
        true => mounted.start_over()?,
        false => mounted.return_home()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::{can_leave, run_start_screen, waits_for_user};
    use crate::{
        core::{
            backend::{HttpBackend, MockVerificationBackend},
            common::transport::CreateSessionResponse,
            navigation::MockNavigator,
            session_store::MockSessionStore,
        },
        screens::{
            polling::VerificationStatus,
            start::{StartScreen, VerificationNotStarted},
            status::{ScreenSnapshot, ScreenState},
        },
    };

    fn snapshot(status: VerificationStatus, grace_elapsed: bool) -> ScreenSnapshot {
        ScreenSnapshot {
            state: ScreenState::from(&status),
            status,
            error_message: None,
            session_id: Some("vs_1".to_string()),
            grace_elapsed,
        }
    }

    #[test]
    fn leaves_only_once_settled_and_allowed() {
        assert!(!can_leave(&snapshot(VerificationStatus::Loading, false), false));
        assert!(!can_leave(&snapshot(VerificationStatus::Processing, true), false));
        assert!(!can_leave(&snapshot(VerificationStatus::Verified, false), false));
        assert!(can_leave(&snapshot(VerificationStatus::Verified, true), false));
        assert!(can_leave(&snapshot(VerificationStatus::Error, false), false));
        assert!(can_leave(&snapshot(VerificationStatus::Canceled, false), false));
    }

    #[test]
    fn start_over_short_circuits_grace_unless_auto_returning() {
        let requires_input = snapshot(VerificationStatus::RequiresInput, false);

        assert!(can_leave(&requires_input, false));
        assert!(!can_leave(&requires_input, true));
    }

    #[test]
    fn auto_return_waits_for_grace_period_on_every_status() {
        for status in [
            VerificationStatus::Verified,
            VerificationStatus::RequiresInput,
            VerificationStatus::Canceled,
            VerificationStatus::Error,
        ] {
            assert!(!can_leave(&snapshot(status.clone(), false), true), "{status}");
        }

        assert!(can_leave(&snapshot(VerificationStatus::Canceled, true), true));
        assert!(can_leave(&snapshot(VerificationStatus::Verified, true), true));
        assert!(!can_leave(&snapshot(VerificationStatus::Processing, true), true));
    }

    #[test]
    fn auto_return_hands_errors_back_to_the_user() {
        assert!(waits_for_user(&snapshot(VerificationStatus::Error, false), true));
        assert!(!waits_for_user(&snapshot(VerificationStatus::Error, false), false));
        assert!(!waits_for_user(&snapshot(VerificationStatus::Canceled, false), true));
    }

    #[tokio::test]
    async fn start_screen_shows_busy_label_while_request_is_in_flight() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/create-session"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "url": "https://verify.stripe.com/start/test_1", "session_id": "vs_1"
                    }))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let backend = HttpBackend::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();

        let mut store = MockSessionStore::new();
        store.expect_store().times(1).returning(|_| Ok(()));

        let mut navigator = MockNavigator::new();
        navigator.expect_redirect().times(1).return_const(());

        let screen = StartScreen::new(Arc::new(backend), Arc::new(store), Arc::new(navigator));
        let mut out = Vec::new();

        run_start_screen(&screen, &mut out).await.unwrap();

        let out = String::from_utf8(out).unwrap();
        let lines = out.lines().map(str::trim).collect::<Vec<_>>();

        assert!(lines.contains(&"(Verify Identity)"));
        assert!(lines.contains(&"(Loading…)"));
        assert!(!screen.is_busy());
    }

    #[tokio::test]
    async fn failed_start_is_reported_as_an_error() {
        let mut backend = MockVerificationBackend::new();
        backend.expect_create_session().times(1).returning(|| {
            Ok(CreateSessionResponse {
                url: None,
                session_id: Some("vs_1".to_string()),
            })
        });

        let mut store = MockSessionStore::new();
        store.expect_store().never();

        let mut navigator = MockNavigator::new();
        navigator.expect_redirect().never();

        let screen = StartScreen::new(Arc::new(backend), Arc::new(store), Arc::new(navigator));
        let mut out = Vec::new();

        let err = run_start_screen(&screen, &mut out).await.unwrap_err();

        assert!(err.downcast_ref::<VerificationNotStarted>().is_some());
        assert!(String::from_utf8(out).unwrap().ends_with("(Verify Identity)\n"));
        assert!(!screen.is_busy());
    }
}
