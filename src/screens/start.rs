use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::{debug, error, info};

use crate::core::{
    backend::VerificationBackend, navigation::Navigator, session_store::SessionStore,
};

pub const START_SCREEN_TITLE: &str = "Start Stripe Identity Verification";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// the browser left for the provider's hosted flow
    Redirected(String),
    /// the attempt failed, the user may try again
    Stayed,
    /// an attempt is already in flight
    Busy,
}

#[derive(Debug)]
pub struct VerificationNotStarted {
    reason: String,
}

impl VerificationNotStarted {
    pub fn new(reason: String) -> Self {
        Self { reason }
    }
}

impl Display for VerificationNotStarted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for VerificationNotStarted {}

/// Clears the busy flag however the attempt ends
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct StartScreen {
    backend: Arc<dyn VerificationBackend>,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    busy: AtomicBool,
}

impl StartScreen {
    pub fn new(
        backend: Arc<dyn VerificationBackend>,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            backend,
            store,
            navigator,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn button_label(&self) -> &'static str {
        match self.is_busy() {
            true => "Loading…",
            false => "Verify Identity",
        }
    }

    /// The "begin verification" action.
    ///
    /// Failures are diagnostics only: they are logged and the user stays on the screen.
    pub async fn begin_verification(&self) -> StartOutcome {
        let _busy = match BusyGuard::acquire(&self.busy) {
            Some(g) => g,
            None => {
                debug!("verification already starting, ignoring action");
                return StartOutcome::Busy;
            }
        };

        let res = match self.backend.create_session().await {
            Ok(r) => r,
            Err(e) => {
                error!("error starting verification: {e}");
                return StartOutcome::Stayed;
            }
        };

        let (url, session_id) = match res.redirect_target() {
            Some(target) => target,
            None => {
                error!("no verification url returned from backend");
                return StartOutcome::Stayed;
            }
        };

        if let Err(e) = self.store.store(session_id.to_string()).await {
            error!("error starting verification, cannot store session {session_id}: {e}");
            return StartOutcome::Stayed;
        }

        info!("verification session {session_id} created");

        self.navigator.redirect(url);

        StartOutcome::Redirected(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{atomic::AtomicBool, Arc};

    use mockall::predicate::eq;

    use super::{BusyGuard, StartOutcome, StartScreen};
    use crate::core::{
        backend::MockVerificationBackend, common::transport::CreateSessionResponse,
        common::BackendResponseError, navigation::MockNavigator,
        session_store::MockSessionStore,
    };

    fn backend_returning(url: Option<&str>, session_id: Option<&str>) -> MockVerificationBackend {
        let res = CreateSessionResponse {
            url: url.map(str::to_string),
            session_id: session_id.map(str::to_string),
        };

        let mut backend = MockVerificationBackend::new();
        backend
            .expect_create_session()
            .times(1)
            .returning(move || Ok(res.clone()));
        backend
    }

    #[tokio::test]
    async fn stores_session_then_redirects_once() {
        let backend = backend_returning(Some("https://verify.stripe.com/start/test_1"), Some("vs_1"));

        let mut store = MockSessionStore::new();
        store
            .expect_store()
            .with(eq("vs_1".to_string()))
            .times(1)
            .returning(|_| Ok(()));

        let mut navigator = MockNavigator::new();
        navigator
            .expect_redirect()
            .withf(|url| url == "https://verify.stripe.com/start/test_1")
            .times(1)
            .return_const(());
        navigator.expect_navigate().never();

        let screen = StartScreen::new(Arc::new(backend), Arc::new(store), Arc::new(navigator));

        assert_eq!(
            StartOutcome::Redirected("https://verify.stripe.com/start/test_1".to_string()),
            screen.begin_verification().await
        );
        assert!(!screen.is_busy());
        assert_eq!("Verify Identity", screen.button_label());
    }

    #[tokio::test]
    async fn missing_fields_keep_the_user_on_screen() {
        for (url, session_id) in [
            (None, Some("vs_1")),
            (Some("https://verify.stripe.com/start/test_1"), None),
            (None, None),
        ] {
            let backend = backend_returning(url, session_id);

            let mut store = MockSessionStore::new();
            store.expect_store().never();

            let mut navigator = MockNavigator::new();
            navigator.expect_redirect().never();

            let screen =
                StartScreen::new(Arc::new(backend), Arc::new(store), Arc::new(navigator));

            assert_eq!(StartOutcome::Stayed, screen.begin_verification().await);
            assert!(!screen.is_busy());
        }
    }

    #[tokio::test]
    async fn backend_failure_is_absorbed_and_retry_is_possible() {
        let mut backend = MockVerificationBackend::new();
        let mut calls = 0;
        backend.expect_create_session().times(2).returning(move || {
            calls += 1;
            match calls {
                1 => {
                    let err: Box<dyn std::error::Error + Send + Sync> =
                        Box::new(BackendResponseError::new("connection refused".to_string()));
                    Err(err)
                }
                _ => Ok(CreateSessionResponse {
                    url: Some("https://verify.stripe.com/start/test_2".to_string()),
                    session_id: Some("vs_2".to_string()),
                }),
            }
        });

        let mut store = MockSessionStore::new();
        store.expect_store().times(1).returning(|_| Ok(()));

        let mut navigator = MockNavigator::new();
        navigator.expect_redirect().times(1).return_const(());

        let screen = StartScreen::new(Arc::new(backend), Arc::new(store), Arc::new(navigator));

        assert_eq!(StartOutcome::Stayed, screen.begin_verification().await);
        assert!(!screen.is_busy());
        assert!(matches!(
            screen.begin_verification().await,
            StartOutcome::Redirected(_)
        ));
    }

    #[tokio::test]
    async fn storage_failure_prevents_redirect() {
        let backend = backend_returning(Some("https://verify.stripe.com/start/test_1"), Some("vs_1"));

        let mut store = MockSessionStore::new();
        store.expect_store().times(1).returning(|_| {
            let err: Box<dyn std::error::Error + Send + Sync> = Box::new(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only data directory",
            ));
            Err(err)
        });

        let mut navigator = MockNavigator::new();
        navigator.expect_redirect().never();

        let screen = StartScreen::new(Arc::new(backend), Arc::new(store), Arc::new(navigator));

        assert_eq!(StartOutcome::Stayed, screen.begin_verification().await);
        assert!(!screen.is_busy());
    }

    #[test]
    fn busy_guard_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);

        {
            let _guard = BusyGuard::acquire(&flag).unwrap();
            assert!(BusyGuard::acquire(&flag).is_none());
        }

        assert!(BusyGuard::acquire(&flag).is_some());
    }
}
