use crate::routing::Destination;

/// Live handle to the UI navigation controller. Only valid once the UI
/// tree has mounted; `is_ready` reports that state and the queue treats a
/// `false` as a transient condition, not an error.
pub trait Navigator: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;

    fn is_ready(&self) -> bool;
    fn navigate(&self, destination: &Destination) -> Result<(), Self::Error>;
}
