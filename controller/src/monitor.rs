//! Overheat monitor.
//!
//! Runs as a side effect of status refresh, never on its own timer. One
//! pass walks every registered projector sequentially, polls its
//! temperature, and alerts every administrator when the threshold is
//! crossed. Alerts are throttled per device through the persisted
//! suppression timestamp.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use projector_common::{command, decode, Result, RuntimeConfig};

use crate::net::CommandSender;
use crate::store::{ControlStore, Device, User};

/// Delivery seam for overheat alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_overheat(
        &self,
        device: &Device,
        temperature: f32,
        recipient: &User,
    ) -> anyhow::Result<()>;
}

/// POSTs one JSON alert per recipient to the configured webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_overheat(
        &self,
        device: &Device,
        temperature: f32,
        recipient: &User,
    ) -> anyhow::Result<()> {
        let payload = serde_json::json!({
            "to": recipient.email,
            "subject": format!("Overheating Alert: {}", device.name),
            "projector": device.name,
            "ipAddress": device.ip_address,
            "temperature": temperature,
        });

        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Fallback when no webhook is configured: alerts surface only in logs.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_overheat(
        &self,
        device: &Device,
        temperature: f32,
        recipient: &User,
    ) -> anyhow::Result<()> {
        warn!(
            "projector {} overheating at {temperature}°C (alert for {})",
            device.name, recipient.email
        );
        Ok(())
    }
}

pub struct OverheatMonitor {
    store: ControlStore,
    sender: Arc<dyn CommandSender>,
    notifier: Arc<dyn Notifier>,
    threshold_c: f32,
    suppression: Duration,
    /// Serializes passes so suppression timestamps have a single writer.
    pass_lock: Mutex<()>,
}

impl OverheatMonitor {
    pub fn new(
        store: ControlStore,
        sender: Arc<dyn CommandSender>,
        notifier: Arc<dyn Notifier>,
        config: &RuntimeConfig,
    ) -> Self {
        Self {
            store,
            sender,
            notifier,
            threshold_c: config.overheat_threshold_c,
            suppression: Duration::minutes(config.alert_suppression_minutes as i64),
            pass_lock: Mutex::new(()),
        }
    }

    /// One monitoring pass over every registered projector. With no admin
    /// recipients the pass exits before polling a single device.
    pub async fn run_pass(&self) -> Result<()> {
        let _guard = self.pass_lock.lock().await;

        let admins = self.store.admin_recipients().await?;
        if admins.is_empty() {
            info!("no admin users found, skipping projector monitoring");
            return Ok(());
        }

        for device in self.store.load_devices().await? {
            if let Err(err) = self.check_device(&device, &admins).await {
                warn!("error monitoring projector {}: {err}", device.name);
            }
        }

        Ok(())
    }

    async fn check_device(&self, device: &Device, admins: &[User]) -> Result<()> {
        let now = Utc::now();
        if now < device.next_alert_date {
            debug!(
                "skipping alert for {} until {}",
                device.name, device.next_alert_date
            );
            return Ok(());
        }

        let frame = command::encode_frame(command::GET_TEMPERATURE)?;
        let reply = self
            .sender
            .send(&device.ip_address, device.port, &frame)
            .await?;
        let Some(temperature) = decode::temperature(&command::format_frame(&reply)) else {
            warn!("unreadable temperature reply from {}", device.name);
            return Ok(());
        };

        if temperature <= self.threshold_c {
            return Ok(());
        }

        info!(
            "overheating detected on {} ({temperature}°C), alerting admins",
            device.name
        );
        for admin in admins {
            if let Err(err) = self.notifier.notify_overheat(device, temperature, admin).await {
                warn!("failed to notify {}: {err:#}", admin.email);
            }
        }

        self.store
            .save_next_alert_date(&device.ip_address, now + self.suppression)
            .await?;
        self.store
            .append_event(&device.ip_address, "OVERHEAT_ALERT")
            .await;
        Ok(())
    }
}
