/// Local key-value persistence. Values are JSON text; keys are plain
/// strings shared with earlier releases of the app, so key names are part
/// of the stored format.
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;
    fn remove(&self, key: &str) -> Result<(), Self::Error>;

    fn remove_many(&self, keys: &[&str]) -> Result<(), Self::Error> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}
