use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ports::prompt::PermissionPrompt;
use crate::ports::push::{PushGateway, TokenRegistrar};
use crate::ports::store::KeyValueStore;

pub(crate) const DEVICE_TOKEN_KEY: &str = "deviceToken";
pub(crate) const LEGACY_TOKEN_KEY: &str = "fcmToken";
pub(crate) const LAST_REGISTERED_KEY: &str = "lastRegisteredToken";
pub(crate) const ASKED_KEY: &str = "hasAskedForNotificationPermission";

/// Where the permission flow ended up. Push is an enhancement; none of
/// these outcomes is an error to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    Granted,
    /// The user declined our rationale; the OS dialog was never shown.
    RationaleDeclined,
    Denied,
    /// The gateway failed; notifications stay off this session.
    Unavailable,
}

/// Owns the permission flow, the cached device token, and its backend
/// registration. The rationale dialog is shown once per install; the
/// settings redirect at most once per process session.
#[derive(Clone)]
pub struct TokenManager<K, G, R, P> {
    store: K,
    gateway: G,
    registrar: R,
    prompt: P,
    platform: String,
    settings_offered: Arc<AtomicBool>,
}

impl<K, G, R, P> TokenManager<K, G, R, P>
where
    K: KeyValueStore,
    G: PushGateway,
    R: TokenRegistrar,
    P: PermissionPrompt,
{
    pub fn new(store: K, gateway: G, registrar: R, prompt: P, platform: String) -> Self {
        Self {
            store,
            gateway,
            registrar,
            prompt,
            platform,
            settings_offered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn ensure_permission(&self) -> PermissionOutcome {
        if !self.has_asked_before() {
            return self.first_ask().await;
        }

        // Later sessions query silently; no dialog unless the user was
        // denied and has not been pointed at settings yet.
        match self.gateway.current_authorization().await {
            Ok(authorization) if authorization.allows_token() => PermissionOutcome::Granted,
            Ok(_) => {
                if !self.settings_offered.swap(true, Ordering::SeqCst) {
                    let accepted = self.prompt.offer_settings_redirect().await;
                    tracing::debug!("settings redirect offered, accepted: {accepted}");
                }
                PermissionOutcome::Denied
            }
            Err(err) => {
                tracing::warn!("notification authorization check failed: {err}");
                PermissionOutcome::Unavailable
            }
        }
    }

    async fn first_ask(&self) -> PermissionOutcome {
        if !self.prompt.show_rationale().await {
            self.remember_asked();
            return PermissionOutcome::RationaleDeclined;
        }
        self.remember_asked();

        match self.gateway.request_permission().await {
            Ok(authorization) if authorization.allows_token() => PermissionOutcome::Granted,
            Ok(_) => PermissionOutcome::Denied,
            Err(err) => {
                tracing::warn!("notification permission request failed: {err}");
                PermissionOutcome::Unavailable
            }
        }
    }

    /// Cached token when present, otherwise a fresh one from the gateway.
    /// Registration is attempted on both paths so the dedup marker, not
    /// call order, decides whether the backend is hit. `None` means push
    /// is unavailable this session.
    pub async fn get_token(&self, auth_code: Option<&str>) -> Option<String> {
        if let Some(token) = self.cached_token() {
            self.maybe_register(&token, auth_code).await;
            return Some(token);
        }

        let token = match self.gateway.fetch_token().await {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!("push token fetch failed: {err}");
                return None;
            }
        };
        self.persist_token(&token);
        self.maybe_register(&token, auth_code).await;
        Some(token)
    }

    /// Best-effort removal of the remote registration and the gateway
    /// token. Local cache is cleared regardless of what the remote calls
    /// do. The asked-for-permission flag survives; it is per install.
    pub async fn unregister(&self, auth_code: Option<&str>) {
        if let (Some(auth_code), Some(token)) = (auth_code, self.cached_token())
            && let Err(err) = self
                .registrar
                .unregister(auth_code, &token, &self.platform)
                .await
        {
            tracing::warn!("push token unregister failed: {err}");
        }

        if let Err(err) = self.gateway.delete_token().await {
            tracing::warn!("push token delete failed: {err}");
        }

        if let Err(err) =
            self.store
                .remove_many(&[DEVICE_TOKEN_KEY, LEGACY_TOKEN_KEY, LAST_REGISTERED_KEY])
        {
            tracing::warn!("push token cache clear failed: {err}");
        }
    }

    async fn maybe_register(&self, token: &str, auth_code: Option<&str>) {
        let Some(auth_code) = auth_code else {
            return;
        };
        if self.last_registered_token().as_deref() == Some(token) {
            tracing::debug!("push token already registered, skipping");
            return;
        }

        match self
            .registrar
            .register(auth_code, token, &self.platform)
            .await
        {
            Ok(()) => {
                if let Err(err) = self.store.set(LAST_REGISTERED_KEY, token) {
                    tracing::warn!("registered-token marker write failed: {err}");
                }
            }
            // The token itself stays usable; registration retries on the
            // next get_token because the marker was not advanced.
            Err(err) => tracing::warn!("push token registration failed: {err}"),
        }
    }

    fn cached_token(&self) -> Option<String> {
        for key in [DEVICE_TOKEN_KEY, LEGACY_TOKEN_KEY] {
            match self.store.get(key) {
                Ok(Some(token)) if !token.is_empty() => return Some(token),
                Ok(_) => {}
                Err(err) => tracing::warn!("push token read failed for {key}: {err}"),
            }
        }
        None
    }

    fn persist_token(&self, token: &str) {
        for key in [DEVICE_TOKEN_KEY, LEGACY_TOKEN_KEY] {
            if let Err(err) = self.store.set(key, token) {
                tracing::warn!("push token write failed for {key}: {err}");
            }
        }
    }

    fn last_registered_token(&self) -> Option<String> {
        match self.store.get(LAST_REGISTERED_KEY) {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!("registered-token marker read failed: {err}");
                None
            }
        }
    }

    fn has_asked_before(&self) -> bool {
        matches!(self.store.get(ASKED_KEY), Ok(Some(flag)) if flag == "true")
    }

    fn remember_asked(&self) {
        if let Err(err) = self.store.set(ASKED_KEY, "true") {
            tracing::warn!("permission flag write failed: {err}");
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::ports::push::PushAuthorization;
    use std::future::{Ready, ready};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone)]
    struct StubGateway {
        request_result: PushAuthorization,
        query_result: PushAuthorization,
        token: Result<String, String>,
        delete_fails: bool,
        requests: Arc<AtomicUsize>,
        queries: Arc<AtomicUsize>,
        fetches: Arc<AtomicUsize>,
        deletes: Arc<AtomicUsize>,
    }

    impl Default for StubGateway {
        fn default() -> Self {
            Self {
                request_result: PushAuthorization::Authorized,
                query_result: PushAuthorization::Authorized,
                token: Ok("tok-1".to_string()),
                delete_fails: false,
                requests: Arc::default(),
                queries: Arc::default(),
                fetches: Arc::default(),
                deletes: Arc::default(),
            }
        }
    }

    impl PushGateway for StubGateway {
        type Error = String;
        type RequestFut<'a>
            = Ready<Result<PushAuthorization, String>>
        where
            Self: 'a;
        type QueryFut<'a>
            = Ready<Result<PushAuthorization, String>>
        where
            Self: 'a;
        type TokenFut<'a>
            = Ready<Result<String, String>>
        where
            Self: 'a;
        type DeleteFut<'a>
            = Ready<Result<(), String>>
        where
            Self: 'a;

        fn request_permission<'a>(&'a self) -> Self::RequestFut<'a> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            ready(Ok(self.request_result))
        }

        fn current_authorization<'a>(&'a self) -> Self::QueryFut<'a> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            ready(Ok(self.query_result))
        }

        fn fetch_token<'a>(&'a self) -> Self::TokenFut<'a> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            ready(self.token.clone())
        }

        fn delete_token<'a>(&'a self) -> Self::DeleteFut<'a> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            ready(if self.delete_fails {
                Err("gateway offline".to_string())
            } else {
                Ok(())
            })
        }
    }

    #[derive(Clone, Default)]
    struct StubRegistrar {
        fail: bool,
        registered: Arc<Mutex<Vec<(String, String, String)>>>,
        unregistered: Arc<Mutex<Vec<String>>>,
        unregister_fails: bool,
    }

    impl StubRegistrar {
        fn registrations(&self) -> usize {
            self.registered.lock().expect("registered lock").len()
        }
    }

    impl TokenRegistrar for StubRegistrar {
        type Error = String;
        type Fut<'a>
            = Ready<Result<(), String>>
        where
            Self: 'a;

        fn register<'a>(
            &'a self,
            auth_code: &'a str,
            token: &'a str,
            platform: &'a str,
        ) -> Self::Fut<'a> {
            if self.fail {
                return ready(Err("backend 500".to_string()));
            }
            self.registered.lock().expect("registered lock").push((
                auth_code.to_string(),
                token.to_string(),
                platform.to_string(),
            ));
            ready(Ok(()))
        }

        fn unregister<'a>(
            &'a self,
            _auth_code: &'a str,
            token: &'a str,
            _platform: &'a str,
        ) -> Self::Fut<'a> {
            if self.unregister_fails {
                return ready(Err("backend 500".to_string()));
            }
            self.unregistered
                .lock()
                .expect("unregistered lock")
                .push(token.to_string());
            ready(Ok(()))
        }
    }

    #[derive(Clone)]
    struct StubPrompt {
        rationale_answer: bool,
        settings_answer: bool,
        rationales: Arc<AtomicUsize>,
        settings_offers: Arc<AtomicUsize>,
    }

    impl Default for StubPrompt {
        fn default() -> Self {
            Self {
                rationale_answer: true,
                settings_answer: false,
                rationales: Arc::default(),
                settings_offers: Arc::default(),
            }
        }
    }

    impl PermissionPrompt for StubPrompt {
        type RationaleFut<'a>
            = Ready<bool>
        where
            Self: 'a;
        type SettingsFut<'a>
            = Ready<bool>
        where
            Self: 'a;

        fn show_rationale<'a>(&'a self) -> Self::RationaleFut<'a> {
            self.rationales.fetch_add(1, Ordering::SeqCst);
            ready(self.rationale_answer)
        }

        fn offer_settings_redirect<'a>(&'a self) -> Self::SettingsFut<'a> {
            self.settings_offers.fetch_add(1, Ordering::SeqCst);
            ready(self.settings_answer)
        }
    }

    fn manager(
        store: MemoryStore,
        gateway: StubGateway,
        registrar: StubRegistrar,
        prompt: StubPrompt,
    ) -> TokenManager<MemoryStore, StubGateway, StubRegistrar, StubPrompt> {
        TokenManager::new(store, gateway, registrar, prompt, "android".to_string())
    }

    #[tokio::test]
    async fn ensure_permission__should_ask_once_then_query_silently() {
        // Given a fresh install
        let store = MemoryStore::new();
        let gateway = StubGateway::default();
        let prompt = StubPrompt::default();
        let tokens = manager(
            store.clone(),
            gateway.clone(),
            StubRegistrar::default(),
            prompt.clone(),
        );

        // When
        let first = tokens.ensure_permission().await;
        let second = tokens.ensure_permission().await;

        // Then: one rationale + one OS dialog, then silent queries only
        assert_eq!(first, PermissionOutcome::Granted);
        assert_eq!(second, PermissionOutcome::Granted);
        assert_eq!(prompt.rationales.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.requests.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.queries.load(Ordering::SeqCst), 1);
        assert_eq!(store.get(ASKED_KEY).expect("get").as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn ensure_permission__should_persist_the_flag_on_decline() {
        let store = MemoryStore::new();
        let gateway = StubGateway::default();
        let prompt = StubPrompt {
            rationale_answer: false,
            ..StubPrompt::default()
        };
        let tokens = manager(
            store.clone(),
            gateway.clone(),
            StubRegistrar::default(),
            prompt,
        );

        let outcome = tokens.ensure_permission().await;

        assert_eq!(outcome, PermissionOutcome::RationaleDeclined);
        assert_eq!(gateway.requests.load(Ordering::SeqCst), 0);
        assert_eq!(store.get(ASKED_KEY).expect("get").as_deref(), Some("true"));
    }

    #[tokio::test]
    async fn ensure_permission__should_offer_settings_redirect_at_most_once() {
        let store = MemoryStore::new();
        store.set(ASKED_KEY, "true").expect("seed flag");
        let gateway = StubGateway {
            query_result: PushAuthorization::Denied,
            ..StubGateway::default()
        };
        let prompt = StubPrompt::default();
        let tokens = manager(store, gateway, StubRegistrar::default(), prompt.clone());

        let first = tokens.ensure_permission().await;
        let second = tokens.ensure_permission().await;

        assert_eq!(first, PermissionOutcome::Denied);
        assert_eq!(second, PermissionOutcome::Denied);
        assert_eq!(prompt.settings_offers.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_token__should_register_at_most_once_per_token() {
        // Given
        let store = MemoryStore::new();
        let gateway = StubGateway::default();
        let registrar = StubRegistrar::default();
        let tokens = manager(
            store.clone(),
            gateway.clone(),
            registrar.clone(),
            StubPrompt::default(),
        );

        // When: two calls with no token rotation in between
        let first = tokens.get_token(Some("T1")).await;
        let second = tokens.get_token(Some("T1")).await;

        // Then: one fetch, one registration; the second call short-circuits
        assert_eq!(first.as_deref(), Some("tok-1"));
        assert_eq!(second.as_deref(), Some("tok-1"));
        assert_eq!(gateway.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(registrar.registrations(), 1);
        assert_eq!(
            store.get(LAST_REGISTERED_KEY).expect("get").as_deref(),
            Some("tok-1")
        );
    }

    #[tokio::test]
    async fn get_token__should_register_again_after_rotation() {
        let store = MemoryStore::new();
        store.set(LAST_REGISTERED_KEY, "tok-old").expect("seed");
        let registrar = StubRegistrar::default();
        let tokens = manager(
            store,
            StubGateway::default(),
            registrar.clone(),
            StubPrompt::default(),
        );

        tokens.get_token(Some("T1")).await;

        assert_eq!(registrar.registrations(), 1);
    }

    #[tokio::test]
    async fn get_token__should_keep_the_token_when_registration_fails() {
        let store = MemoryStore::new();
        let registrar = StubRegistrar {
            fail: true,
            ..StubRegistrar::default()
        };
        let tokens = manager(
            store.clone(),
            StubGateway::default(),
            registrar,
            StubPrompt::default(),
        );

        let token = tokens.get_token(Some("T1")).await;

        // Token survives; the marker is not advanced so the next call
        // retries registration.
        assert_eq!(token.as_deref(), Some("tok-1"));
        assert!(store.get(LAST_REGISTERED_KEY).expect("get").is_none());
    }

    #[tokio::test]
    async fn get_token__should_persist_under_both_legacy_keys() {
        let store = MemoryStore::new();
        let tokens = manager(
            store.clone(),
            StubGateway::default(),
            StubRegistrar::default(),
            StubPrompt::default(),
        );

        tokens.get_token(None).await;

        assert_eq!(
            store.get(DEVICE_TOKEN_KEY).expect("get").as_deref(),
            Some("tok-1")
        );
        assert_eq!(
            store.get(LEGACY_TOKEN_KEY).expect("get").as_deref(),
            Some("tok-1")
        );
    }

    #[tokio::test]
    async fn get_token__should_reuse_a_token_cached_under_the_legacy_key() {
        let store = MemoryStore::new();
        store.set(LEGACY_TOKEN_KEY, "tok-legacy").expect("seed");
        let gateway = StubGateway::default();
        let tokens = manager(
            store,
            gateway.clone(),
            StubRegistrar::default(),
            StubPrompt::default(),
        );

        let token = tokens.get_token(None).await;

        assert_eq!(token.as_deref(), Some("tok-legacy"));
        assert_eq!(gateway.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn get_token__should_skip_registration_without_an_auth_code() {
        let registrar = StubRegistrar::default();
        let tokens = manager(
            MemoryStore::new(),
            StubGateway::default(),
            registrar.clone(),
            StubPrompt::default(),
        );

        tokens.get_token(None).await;

        assert_eq!(registrar.registrations(), 0);
    }

    #[tokio::test]
    async fn unregister__should_clear_the_cache_even_when_remote_calls_fail() {
        let store = MemoryStore::new();
        store.set(DEVICE_TOKEN_KEY, "tok-1").expect("seed");
        store.set(LEGACY_TOKEN_KEY, "tok-1").expect("seed");
        store.set(LAST_REGISTERED_KEY, "tok-1").expect("seed");
        store.set(ASKED_KEY, "true").expect("seed");
        let gateway = StubGateway {
            delete_fails: true,
            ..StubGateway::default()
        };
        let registrar = StubRegistrar {
            unregister_fails: true,
            ..StubRegistrar::default()
        };
        let tokens = manager(store.clone(), gateway, registrar, StubPrompt::default());

        tokens.unregister(Some("T1")).await;

        assert!(store.get(DEVICE_TOKEN_KEY).expect("get").is_none());
        assert!(store.get(LEGACY_TOKEN_KEY).expect("get").is_none());
        assert!(store.get(LAST_REGISTERED_KEY).expect("get").is_none());
        // The install-level flag is never reset.
        assert_eq!(store.get(ASKED_KEY).expect("get").as_deref(), Some("true"));
    }
}
