use std::collections::HashMap;
use std::convert::Infallible;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::config::AppConfig;
use crate::ports::notify::LocalNotifier;
use crate::ports::push::TokenRegistrar;
use crate::ports::store::KeyValueStore;
use crate::ports::time::TimeProvider;

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

/// In-process store. The default when the host wires no persistence, and
/// the double every storage-touching test runs against.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self
            .entries
            .lock()
            .expect("memory store lock")
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.entries
            .lock()
            .expect("memory store lock")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        self.entries.lock().expect("memory store lock").remove(key);
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FileStoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// One JSON object file, one entry per key. Every operation is a
/// read-modify-write; concurrent writers are not guarded and the last
/// write wins.
#[derive(Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<HashMap<String, String>, FileStoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HashMap::new());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), FileStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(entries)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    type Error = FileStoreError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), Self::Error> {
        let mut entries = self.load()?;
        let mut changed = false;
        for key in keys {
            changed |= entries.remove(*key).is_some();
        }
        if changed {
            self.save(&entries)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("registration request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("registration rejected: {0}")]
    Rejected(String),
}

#[derive(Serialize)]
struct TokenBody<'a> {
    #[serde(rename = "authCode")]
    auth_code: &'a str,
    token: &'a str,
    platform: &'a str,
}

#[derive(Deserialize)]
struct TokenAck {
    success: bool,
    error: Option<String>,
}

/// Backend device-token registration over HTTP.
#[derive(Clone)]
pub struct HttpTokenRegistrar {
    client: reqwest::Client,
    register_url: String,
    unregister_url: String,
}

impl HttpTokenRegistrar {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            register_url: config.register_url.clone(),
            unregister_url: config.unregister_url.clone(),
        }
    }

    async fn post(&self, url: &str, body: &TokenBody<'_>) -> Result<(), RegisterError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        let ack: TokenAck = response.json().await?;
        if ack.success {
            Ok(())
        } else {
            Err(RegisterError::Rejected(
                ack.error.unwrap_or_else(|| "unspecified".to_string()),
            ))
        }
    }
}

impl TokenRegistrar for HttpTokenRegistrar {
    type Error = RegisterError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn register<'a>(
        &'a self,
        auth_code: &'a str,
        token: &'a str,
        platform: &'a str,
    ) -> Self::Fut<'a> {
        Box::pin(async move {
            self.post(
                &self.register_url,
                &TokenBody {
                    auth_code,
                    token,
                    platform,
                },
            )
            .await
        })
    }

    fn unregister<'a>(
        &'a self,
        auth_code: &'a str,
        token: &'a str,
        platform: &'a str,
    ) -> Self::Fut<'a> {
        Box::pin(async move {
            self.post(
                &self.unregister_url,
                &TokenBody {
                    auth_code,
                    token,
                    platform,
                },
            )
            .await
        })
    }
}

/// No-op local-notification provider for headless hosts and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl LocalNotifier for NullNotifier {
    type Error = Infallible;

    fn show(
        &self,
        title: &str,
        _body: &str,
        _data: &HashMap<String, Value>,
    ) -> Result<(), Self::Error> {
        tracing::debug!("local notification suppressed: {title}");
        Ok(())
    }

    fn set_badge(&self, _count: usize) -> Result<(), Self::Error> {
        Ok(())
    }
}
