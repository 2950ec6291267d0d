//! File-backed collaborator holding device records, users, runtime config,
//! and the append-only event log. The core only reads and writes the
//! narrow set of fields it owns; record lifecycle (registration, removal)
//! belongs to the dashboard.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use projector_common::schedule::DesiredSchedule;
use projector_common::types::PowerState;
use projector_common::{Error, Result, RuntimeConfig};

pub const DEFAULT_DEVICE_PORT: u16 = 8080;

fn default_port() -> u16 {
    DEFAULT_DEVICE_PORT
}

fn default_role() -> String {
    "user".to_string()
}

fn unix_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    #[serde(rename = "ipAddress")]
    pub ip_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub status: PowerState,
    #[serde(default)]
    pub temperature: f32,
    #[serde(rename = "lampHours", default)]
    pub lamp_hours: u32,
    #[serde(flatten)]
    pub schedule: DesiredSchedule,
    /// Alerts for this device are suppressed while now < this instant.
    #[serde(rename = "nextAlertDate", default = "unix_epoch")]
    pub next_alert_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(rename = "lastName", default)]
    pub last_name: String,
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "ipAddress")]
    pub ip_address: String,
    #[serde(rename = "eventType")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ControlStore {
    devices_path: Arc<PathBuf>,
    users_path: Arc<PathBuf>,
    config_path: Arc<PathBuf>,
    events_path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl ControlStore {
    pub fn new() -> Self {
        let data_dir = std::env::var("PROJECTOR_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.projector"));
        Self::at(data_dir)
    }

    pub fn at(data_dir: PathBuf) -> Self {
        Self {
            devices_path: Arc::new(data_dir.join("devices.json")),
            users_path: Arc::new(data_dir.join("users.json")),
            config_path: Arc::new(data_dir.join("config.json")),
            events_path: Arc::new(data_dir.join("events.log")),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn load_config(&self) -> Result<RuntimeConfig> {
        let _guard = self.lock.lock().await;
        match tokio::fs::read(self.config_path.as_ref()).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(RuntimeConfig::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn load_devices(&self) -> Result<Vec<Device>> {
        let _guard = self.lock.lock().await;
        self.read_devices().await
    }

    pub async fn load_device(&self, ip_address: &str) -> Result<Device> {
        let _guard = self.lock.lock().await;
        self.read_devices()
            .await?
            .into_iter()
            .find(|device| device.ip_address == ip_address)
            .ok_or_else(|| Error::NotFound(ip_address.to_string()))
    }

    #[cfg(test)]
    pub async fn save_devices(&self, devices: &[Device]) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write_devices(devices).await
    }

    /// Applies `apply` to the record for `ip_address` and persists the
    /// result, returning the updated record.
    pub async fn update_device<F>(&self, ip_address: &str, apply: F) -> Result<Device>
    where
        F: FnOnce(&mut Device),
    {
        let _guard = self.lock.lock().await;
        let mut devices = self.read_devices().await?;
        let device = devices
            .iter_mut()
            .find(|device| device.ip_address == ip_address)
            .ok_or_else(|| Error::NotFound(ip_address.to_string()))?;

        apply(device);
        let updated = device.clone();
        self.write_devices(&devices).await?;
        Ok(updated)
    }

    pub async fn save_schedule(&self, ip_address: &str, schedule: &DesiredSchedule) -> Result<()> {
        self.update_device(ip_address, |device| device.schedule = schedule.clone())
            .await?;
        Ok(())
    }

    pub async fn clear_schedule(&self, ip_address: &str) -> Result<()> {
        self.update_device(ip_address, |device| {
            device.schedule = DesiredSchedule::default()
        })
        .await?;
        Ok(())
    }

    pub async fn save_next_alert_date(
        &self,
        ip_address: &str,
        next_alert_date: DateTime<Utc>,
    ) -> Result<()> {
        self.update_device(ip_address, |device| device.next_alert_date = next_alert_date)
            .await?;
        Ok(())
    }

    /// Users with the administrator role, the recipients of overheat alerts.
    pub async fn admin_recipients(&self) -> Result<Vec<User>> {
        let _guard = self.lock.lock().await;
        let users: Vec<User> = match tokio::fs::read(self.users_path.as_ref()).await {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(users.into_iter().filter(|user| user.role == "admin").collect())
    }

    /// Appends one record to the event log. Failures are logged and
    /// swallowed; event logging must never fail the originating request.
    pub async fn append_event(&self, ip_address: &str, event_type: &str) {
        let record = EventRecord {
            ip_address: ip_address.to_string(),
            event_type: event_type.to_string(),
            timestamp: Utc::now(),
        };

        if let Err(err) = self.try_append_event(&record).await {
            warn!("failed to append event log record: {err}");
        }
    }

    async fn try_append_event(&self, record: &EventRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        if let Some(parent) = self.events_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.events_path.as_ref())
            .await?;
        file.write_all(&line).await?;
        Ok(())
    }

    async fn read_devices(&self) -> Result<Vec<Device>> {
        match tokio::fs::read(self.devices_path.as_ref()).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_devices(&self, devices: &[Device]) -> Result<()> {
        if let Some(parent) = self.devices_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(devices)?;
        tokio::fs::write(self.devices_path.as_ref(), payload).await?;
        Ok(())
    }

    #[cfg(test)]
    pub async fn save_users(&self, users: &[User]) -> Result<()> {
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.users_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(users)?;
        tokio::fs::write(self.users_path.as_ref(), payload).await?;
        Ok(())
    }
}
