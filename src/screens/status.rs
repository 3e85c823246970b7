use std::{
    fmt::Display,
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, error, info, warn};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Duration, MissedTickBehavior},
};

use crate::core::{
    backend::VerificationBackend,
    navigation::{Navigator, Route},
    session_store::SessionStore,
};

use super::{
    polling::{FetchOutcome, PollTimings, StatusPoll, VerificationStatus},
    views::{self, View},
};


pub const GENERIC_STATUS_ERROR: &str =
    "We could not retrieve your verification status. Please try again later.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScreenState {
    Initializing,
    Loading,
    Verified,
    Processing,
    RequiresInput,
    Canceled,
    Error,
    Unknown,
}

impl From<&VerificationStatus> for ScreenState {
    fn from(status: &VerificationStatus) -> Self {
        match status {
            VerificationStatus::Loading => ScreenState::Loading,
            VerificationStatus::Verified => ScreenState::Verified,
            VerificationStatus::Processing => ScreenState::Processing,
            VerificationStatus::RequiresInput => ScreenState::RequiresInput,
            VerificationStatus::Canceled => ScreenState::Canceled,
            VerificationStatus::Error => ScreenState::Error,
            VerificationStatus::Other(_) => ScreenState::Unknown,
        }
    }
}

/// Everything the status screen renders from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScreenSnapshot {
    pub state: ScreenState,
    pub status: VerificationStatus,
    pub error_message: Option<String>,
    pub session_id: Option<String>,
    pub grace_elapsed: bool,
}

impl ScreenSnapshot {
    fn loading(session_id: String) -> Self {
        Self {
            state: ScreenState::Loading,
            status: VerificationStatus::Loading,
            error_message: None,
            session_id: Some(session_id),
            grace_elapsed: false,
        }
    }

    /// No further status change will happen for this mount
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal() || self.status == VerificationStatus::Error
    }

    pub fn return_home_enabled(&self) -> bool {
        views::return_home_enabled(self)
    }
}

impl Default for ScreenSnapshot {
    fn default() -> Self {
        Self {
            state: ScreenState::Initializing,
            status: VerificationStatus::Loading,
            error_message: None,
            session_id: None,
            grace_elapsed: false,
        }
    }
}

struct Publisher {
    mounted: bool,
    sender: watch::Sender<ScreenSnapshot>,
}

type SharedPublisher = Arc<Mutex<Publisher>>;

fn lock(publisher: &SharedPublisher) -> MutexGuard<'_, Publisher> {
    match publisher.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Applies `update` unless the screen has been unmounted, returns whether it was applied
fn publish(publisher: &SharedPublisher, update: impl FnOnce(&mut ScreenSnapshot)) -> bool {
    let guard = lock(publisher);

    if !guard.mounted {
        return false;
    }

    guard.sender.send_modify(update);
    true
}

pub struct StatusScreen {
    backend: Arc<dyn VerificationBackend>,
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    timings: PollTimings,
}

impl StatusScreen {
    pub fn new(
        backend: Arc<dyn VerificationBackend>,
        store: Arc<dyn SessionStore>,
        navigator: Arc<dyn Navigator>,
        timings: PollTimings,
    ) -> Self {
        Self {
            backend,
            store,
            navigator,
            timings,
        }
    }

    /// Mounts the screen and starts polling.
    ///
    /// Returns `None` when no session could be resolved, the user has then been sent back to `/`.
    pub async fn mount(self, query_session_id: Option<String>) -> Option<MountedStatusScreen> {
        let session_id = match self.resolve_session_id(query_session_id).await {
            Some(id) => id,
            None => {
                info!("no verification session to follow, going back to start");
                self.navigator.navigate(&Route::Start);
                return None;
            }
        };

        info!("following verification session {session_id}");

        let (sender, receiver) = watch::channel(ScreenSnapshot::loading(session_id.clone()));

        let publisher = Arc::new(Mutex::new(Publisher {
            mounted: true,
            sender,
        }));

        let task = tokio::spawn(run_poll(
            self.backend.clone(),
            session_id,
            self.timings,
            publisher.clone(),
        ));

        Some(MountedStatusScreen {
            publisher,
            receiver,
            task,
            navigator: self.navigator,
        })
    }

    async fn resolve_session_id(&self, query_session_id: Option<String>) -> Option<String> {
        // the return URL wins, whatever is stored is left for its own attempt
        if let Some(id) = query_session_id.filter(|id| !id.is_empty()) {
            debug!("session identifier taken from the return url");
            return Some(id);
        }

        let stored = match self.store.get().await {
            Ok(s) => s,
            Err(e) => {
                warn!("cannot read stored session identifier: {e}");
                None
            }
        };

        if stored.is_some() {
            debug!("session identifier taken from storage");

            if let Err(e) = self.store.remove().await {
                warn!("cannot clear stored session identifier: {e}");
            }
        }

        stored
    }
}

async fn fetch_status(backend: &dyn VerificationBackend, session_id: &str) -> FetchOutcome {
    match backend.verification_status(session_id.to_string()).await {
        Ok(r) => {
            debug!("session {session_id} status: {}", r.status);
            FetchOutcome::Status(VerificationStatus::from_backend(&r.status))
        }
        Err(e) => {
            error!("failed to fetch verification status for {session_id}: {e}");
            FetchOutcome::Failure
        }
    }
}

async fn run_poll(
    backend: Arc<dyn VerificationBackend>,
    session_id: String,
    timings: PollTimings,
    publisher: SharedPublisher,
) {
    let mut poll = StatusPoll::new();

    // first tick completes immediately
    let mut ticker = time::interval(timings.interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    while !poll.should_stop() {
        ticker.tick().await;

        let outcome = fetch_status(backend.as_ref(), &session_id).await;
        poll.observe(outcome);
        let status = poll.current().clone();

        let applied = publish(&publisher, |snapshot| {
            snapshot.state = ScreenState::from(&status);
            if status == VerificationStatus::Error {
                snapshot.error_message = Some(GENERIC_STATUS_ERROR.to_string());
            }
            snapshot.status = status;
        });

        if !applied {
            return;
        }
    }

    debug!(
        "polling of {session_id} stopped after {} fetches",
        poll.fetches()
    );

    if !poll.starts_grace_timer() {
        return;
    }

    time::sleep(timings.grace_period).await;

    publish(&publisher, |snapshot| snapshot.grace_elapsed = true);
}

/// A status screen currently on display.
///
/// Dropping it unmounts the screen.
pub struct MountedStatusScreen {
    publisher: SharedPublisher,
    receiver: watch::Receiver<ScreenSnapshot>,
    task: JoinHandle<()>,
    navigator: Arc<dyn Navigator>,
}

impl MountedStatusScreen {
    pub fn snapshot(&self) -> ScreenSnapshot {
        self.receiver.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScreenSnapshot> {
        self.receiver.clone()
    }

    pub fn view(&self) -> View {
        views::render(&self.snapshot())
    }

    pub fn is_mounted(&self) -> bool {
        lock(&self.publisher).mounted
    }

    /// Shared footer action, unavailable until the grace timer allows it
    pub fn return_home(&mut self) -> Result<(), ActionUnavailable> {
        if !self.snapshot().return_home_enabled() {
            return Err(ActionUnavailable::new(
                "please wait before returning home".to_string(),
            ));
        }

        self.leave()
    }

    /// "Start over" / "Try again", never gated by the grace timer
    pub fn start_over(&mut self) -> Result<(), ActionUnavailable> {
        if views::render(&self.snapshot()).action.is_none() {
            return Err(ActionUnavailable::new(
                "nothing to start over from this status".to_string(),
            ));
        }

        self.leave()
    }

    fn leave(&mut self) -> Result<(), ActionUnavailable> {
        if !self.is_mounted() {
            return Err(ActionUnavailable::new("screen is not mounted".to_string()));
        }

        self.unmount();
        self.navigator.navigate(&Route::Start);
        Ok(())
    }

    /// Cancels the poll and grace timers, no snapshot update is published afterwards
    pub fn unmount(&mut self) {
        let mut guard = lock(&self.publisher);

        if guard.mounted {
            debug!("unmounting status screen");
        }

        guard.mounted = false;
        self.task.abort();
    }
}

impl Drop for MountedStatusScreen {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ActionUnavailable {
    reason: String,
}

impl ActionUnavailable {
    pub fn new(reason: String) -> Self {
        Self { reason }
    }
}

impl Display for ActionUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

impl std::error::Error for ActionUnavailable {}
