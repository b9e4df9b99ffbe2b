use serde_json::Value;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::AppConfig;
use crate::history::HistoryStore;
use crate::nav::NavigationQueue;
use crate::ports::nav::Navigator;
use crate::ports::notify::LocalNotifier;
use crate::ports::prompt::PermissionPrompt;
use crate::ports::push::{PushGateway, TokenRegistrar};
use crate::ports::store::KeyValueStore;
use crate::ports::time::TimeProvider;
use crate::routing::{self, SessionContext};
use crate::tokens::{PermissionOutcome, TokenManager};
use crate::types::history::NotificationRecord;
use crate::types::message::InboundEvent;

pub(crate) const SESSION_KEY: &str = "userData";
pub(crate) const AUTH_CODE_KEY: &str = "authCode";

/// Teardown handle for an attached event pump.
pub struct EventPumpHandle {
    handle: JoinHandle<()>,
}

impl EventPumpHandle {
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    #[cfg(test)]
    pub(crate) async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.handle.await
    }
}

/// The one owned object the host constructs at application start. Wires
/// the history store, token manager, and navigation queue over the host's
/// port implementations; the navigator is registered later, once the UI
/// tree has mounted.
#[derive(Clone)]
pub struct Dispatcher<K, L, G, R, P, N, T> {
    store: K,
    notifier: L,
    history: HistoryStore<K, L>,
    tokens: TokenManager<K, G, R, P>,
    queue: NavigationQueue<N, T>,
    time: T,
}

impl<K, L, G, R, P, N, T> Dispatcher<K, L, G, R, P, N, T>
where
    K: KeyValueStore,
    L: LocalNotifier,
    G: PushGateway,
    R: TokenRegistrar,
    P: PermissionPrompt,
    N: Navigator,
    T: TimeProvider,
{
    pub fn new(
        config: AppConfig,
        store: K,
        notifier: L,
        gateway: G,
        registrar: R,
        prompt: P,
        time: T,
    ) -> Self {
        Self {
            history: HistoryStore::new(store.clone(), notifier.clone(), config.history_limit),
            tokens: TokenManager::new(
                store.clone(),
                gateway,
                registrar,
                prompt,
                config.platform.clone(),
            ),
            queue: NavigationQueue::new(
                time.clone(),
                config.nav_retry_interval,
                config.nav_retry_budget,
            ),
            store,
            notifier,
            time,
        }
    }

    /// One inbound notification, whatever the channel. Everything lands in
    /// history; a foreground receipt is surfaced as a banner (navigation
    /// waits for the tap, which arrives as its own event), while
    /// open-intent channels route right away.
    pub async fn handle_event(&self, event: InboundEvent) {
        tracing::debug!("notification event on {} channel", event.channel());
        let foreground = matches!(event, InboundEvent::Foreground(_));
        let message = event.canonicalize();
        let record =
            NotificationRecord::from_message(&message, self.next_id(), self.now_millis());

        if foreground
            && let Err(err) = self
                .notifier
                .show(&record.title, &record.body, &record.data)
        {
            tracing::warn!("foreground banner failed: {err}");
        }
        self.history.append(record);

        if !foreground {
            let destination = routing::route(&message, &self.session_context());
            self.queue.execute(destination);
        }
    }

    /// Spawns a pump over the host's event channel. Events are processed
    /// strictly in arrival order; the pump ends when the sender closes or
    /// the handle is aborted.
    pub fn attach_events(&self, mut events: mpsc::Receiver<InboundEvent>) -> EventPumpHandle {
        let dispatcher = self.clone();
        EventPumpHandle {
            handle: tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    dispatcher.handle_event(event).await;
                }
            }),
        }
    }

    /// Runs the permission flow and, when granted, fetches and registers
    /// the device token. Nothing here fails the login itself.
    pub async fn handle_login(&self) {
        match self.tokens.ensure_permission().await {
            PermissionOutcome::Granted => {
                let session = self.session_context();
                if self.tokens.get_token(session.auth_code.as_deref()).await.is_none() {
                    tracing::warn!("push token unavailable after login");
                }
            }
            outcome => tracing::debug!("push setup skipped after login: {outcome:?}"),
        }
    }

    pub async fn handle_logout(&self) {
        let session = self.session_context();
        self.tokens.unregister(session.auth_code.as_deref()).await;
        self.history.clear();
        self.queue.clear_pending();
    }

    pub fn set_navigator_ready(&self, navigator: N) {
        self.queue.set_navigator_ready(navigator);
    }

    pub fn clear_pending_navigation(&self) {
        self.queue.clear_pending();
    }

    pub fn notifications(&self) -> Vec<NotificationRecord> {
        self.history.list()
    }

    pub fn mark_read(&self, id: &str) {
        self.history.mark_read(id);
    }

    pub fn clear_notifications(&self) {
        self.history.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.history.unread_count()
    }

    fn session_context(&self) -> SessionContext {
        let session = match self.store.get(SESSION_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(session) => session,
                Err(err) => {
                    tracing::warn!("cached session unreadable: {err}");
                    Value::Null
                }
            },
            Ok(None) => Value::Null,
            Err(err) => {
                tracing::warn!("cached session read failed: {err}");
                Value::Null
            }
        };

        let auth_code = self.stored_auth_code().or_else(|| {
            session
                .get(AUTH_CODE_KEY)
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        let display_name = ["user_name", "name"]
            .iter()
            .find_map(|key| session.get(key).and_then(Value::as_str))
            .map(str::to_string);

        SessionContext {
            user_type: routing::resolve_user_type(&session),
            auth_code,
            display_name,
        }
    }

    fn stored_auth_code(&self) -> Option<String> {
        match self.store.get(AUTH_CODE_KEY) {
            Ok(code) => code.filter(|code| !code.is_empty()),
            Err(err) => {
                tracing::warn!("auth code read failed: {err}");
                None
            }
        }
    }

    fn next_id(&self) -> String {
        // Time-based with a random tail so near-simultaneous channels
        // cannot collide.
        format!("{}-{:06x}", self.now_millis(), rand::random::<u32>() & 0xff_ffff)
    }

    fn now_millis(&self) -> i64 {
        (self.time.now().unix_timestamp_nanos() / 1_000_000) as i64
    }
}
