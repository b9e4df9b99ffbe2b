pub mod adapters;
pub mod config;
pub mod dispatch;
pub mod history;
pub mod nav;
pub mod ports;
pub mod routing;
pub mod tokens;
pub mod types;

pub use config::AppConfig;
pub use dispatch::{Dispatcher, EventPumpHandle};
pub use history::HistoryStore;
pub use nav::NavigationQueue;
pub use routing::{Destination, SessionContext, UserType};
pub use tokens::{PermissionOutcome, TokenManager};
pub use types::history::NotificationRecord;
pub use types::message::{CanonicalMessage, InboundEvent, RemoteMessage, TappedNotification};
