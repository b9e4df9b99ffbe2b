/// User-facing dialogs owned by the host UI. Both are dismissible; a
/// headless host can answer `false` to everything and the permission flow
/// simply stops.
pub trait PermissionPrompt: Clone + Send + Sync + 'static {
    type RationaleFut<'a>: Future<Output = bool> + Send + 'a
    where
        Self: 'a;
    type SettingsFut<'a>: Future<Output = bool> + Send + 'a
    where
        Self: 'a;

    /// Explains why notifications are worth allowing, before the OS dialog
    /// is ever shown. Returns whether the user agreed to continue.
    fn show_rationale<'a>(&'a self) -> Self::RationaleFut<'a>;

    /// Offers a redirect to system settings after a denial. Returns whether
    /// the user took the redirect.
    fn offer_settings_redirect<'a>(&'a self) -> Self::SettingsFut<'a>;
}
