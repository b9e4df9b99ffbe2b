/// Authorization state reported by the OS for this app's notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushAuthorization {
    Undetermined,
    Denied,
    Authorized,
    Provisional,
}

impl PushAuthorization {
    pub fn allows_token(self) -> bool {
        matches!(
            self,
            PushAuthorization::Authorized | PushAuthorization::Provisional
        )
    }
}

/// The push-messaging provider on the device. Implemented by the host
/// over its platform SDK; every call can fail and the core degrades
/// rather than propagating.
pub trait PushGateway: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type RequestFut<'a>: Future<Output = Result<PushAuthorization, Self::Error>> + Send + 'a
    where
        Self: 'a;
    type QueryFut<'a>: Future<Output = Result<PushAuthorization, Self::Error>> + Send + 'a
    where
        Self: 'a;
    type TokenFut<'a>: Future<Output = Result<String, Self::Error>> + Send + 'a
    where
        Self: 'a;
    type DeleteFut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    /// Shows the OS permission dialog and reports the resulting state.
    fn request_permission<'a>(&'a self) -> Self::RequestFut<'a>;
    /// Reads the current authorization without any prompt.
    fn current_authorization<'a>(&'a self) -> Self::QueryFut<'a>;
    fn fetch_token<'a>(&'a self) -> Self::TokenFut<'a>;
    fn delete_token<'a>(&'a self) -> Self::DeleteFut<'a>;
}

/// Backend device-token registration endpoint.
pub trait TokenRegistrar: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn register<'a>(
        &'a self,
        auth_code: &'a str,
        token: &'a str,
        platform: &'a str,
    ) -> Self::Fut<'a>;

    fn unregister<'a>(
        &'a self,
        auth_code: &'a str,
        token: &'a str,
        platform: &'a str,
    ) -> Self::Fut<'a>;
}
