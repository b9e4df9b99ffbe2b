pub mod nav;
pub mod notify;
pub mod prompt;
pub mod push;
pub mod store;
pub mod time;

pub use nav::Navigator;
pub use notify::LocalNotifier;
pub use prompt::PermissionPrompt;
pub use push::{PushAuthorization, PushGateway, TokenRegistrar};
pub use store::KeyValueStore;
pub use time::TimeProvider;
