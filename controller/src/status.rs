//! Device status refresh: polls power state, temperature, and lamp hours
//! for each projector and writes the decoded values back onto its record.

use std::sync::Arc;

use tracing::warn;

use projector_common::types::PowerState;
use projector_common::{command, decode, Result};

use crate::monitor::OverheatMonitor;
use crate::net::CommandSender;
use crate::store::{ControlStore, Device};

pub struct StatusRefresher {
    store: ControlStore,
    sender: Arc<dyn CommandSender>,
}

impl StatusRefresher {
    pub fn new(store: ControlStore, sender: Arc<dyn CommandSender>) -> Self {
        Self { store, sender }
    }

    /// Refreshes every registered projector sequentially, then runs one
    /// overheat monitoring pass over the updated records.
    pub async fn refresh_all(&self, monitor: &OverheatMonitor) -> Result<Vec<Device>> {
        for device in self.store.load_devices().await? {
            if let Err(err) = self.refresh_device(&device).await {
                warn!("failed to refresh projector {}: {err}", device.name);
            }
        }

        monitor.run_pass().await?;
        self.store.load_devices().await
    }

    /// Polls one projector. An unreadable power reply marks the device
    /// unavailable; unreadable temperature or lamp replies leave the last
    /// stored value in place.
    pub async fn refresh_device(&self, device: &Device) -> Result<Device> {
        let status = match self.query(device, command::QUERY_POWER_STATUS).await {
            Ok(reply) => match decode::power_status(&reply) {
                Ok(state) => state,
                Err(err) => {
                    warn!("bad power status reply from {}: {err}", device.name);
                    PowerState::Unavailable
                }
            },
            Err(err) => {
                warn!("power status unavailable for {}: {err}", device.name);
                PowerState::Unavailable
            }
        };

        let temperature = match self.query(device, command::GET_TEMPERATURE).await {
            Ok(reply) => decode::temperature(&reply),
            Err(err) => {
                warn!("temperature unavailable for {}: {err}", device.name);
                None
            }
        };

        let lamp_hours = match self.query(device, command::GET_LAMP_HOURS).await {
            Ok(reply) => decode::lamp_hours(&reply),
            Err(err) => {
                warn!("lamp hours unavailable for {}: {err}", device.name);
                None
            }
        };

        self.store
            .update_device(&device.ip_address, |record| {
                record.status = status;
                if let Some(temperature) = temperature {
                    record.temperature = temperature;
                }
                if let Some(lamp_hours) = lamp_hours {
                    record.lamp_hours = lamp_hours;
                }
            })
            .await
    }

    async fn query(&self, device: &Device, frame_hex: &str) -> Result<String> {
        let frame = command::encode_frame(frame_hex)?;
        let reply = self
            .sender
            .send(&device.ip_address, device.port, &frame)
            .await?;
        Ok(command::format_frame(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{LogNotifier, OverheatMonitor};
    use crate::testutil::{self, ScriptedSender};
    use hex_literal::hex;
    use pretty_assertions::assert_eq;
    use projector_common::{Error, RuntimeConfig};

    fn power_on_reply() -> Vec<u8> {
        hex!("05 14 00 03 00 00 00 02 19").to_vec()
    }

    fn temperature_reply() -> Vec<u8> {
        hex!("05 14 00 0A 00 00 00 29 01 00 00 00 00 00 00 48").to_vec()
    }

    fn lamp_reply() -> Vec<u8> {
        hex!("05 14 00 06 00 00 00 B8 0B 00 00 DD").to_vec()
    }

    #[tokio::test]
    async fn refresh_updates_all_status_fields() {
        let (_dir, store) = testutil::store_with_devices(vec![testutil::device("10.0.0.5")]).await;
        let sender = Arc::new(ScriptedSender::with_replies(vec![
            Ok(power_on_reply()),
            Ok(temperature_reply()),
            Ok(lamp_reply()),
        ]));
        let refresher = StatusRefresher::new(store.clone(), sender);

        let device = store.load_device("10.0.0.5").await.unwrap();
        let updated = refresher.refresh_device(&device).await.unwrap();

        assert_eq!(updated.status, PowerState::On);
        assert_eq!(updated.temperature, 29.7);
        assert_eq!(updated.lamp_hours, 3000);
    }

    #[tokio::test]
    async fn unreachable_device_keeps_last_known_values() {
        let mut seeded = testutil::device("10.0.0.5");
        seeded.temperature = 29.7;
        seeded.lamp_hours = 2500;
        let (_dir, store) = testutil::store_with_devices(vec![seeded]).await;
        let sender = Arc::new(ScriptedSender::with_replies(vec![
            Err(Error::Timeout),
            Err(Error::Timeout),
            Err(Error::Timeout),
        ]));
        let refresher = StatusRefresher::new(store.clone(), sender);

        let device = store.load_device("10.0.0.5").await.unwrap();
        let updated = refresher.refresh_device(&device).await.unwrap();

        assert_eq!(updated.status, PowerState::Unavailable);
        assert_eq!(updated.temperature, 29.7);
        assert_eq!(updated.lamp_hours, 2500);
    }

    #[tokio::test]
    async fn refresh_all_runs_a_monitor_pass() {
        let (_dir, store) = testutil::store_with_devices(vec![testutil::device("10.0.0.5")]).await;
        store
            .save_users(&[testutil::user("ops@example.com", "admin")])
            .await
            .unwrap();

        // Three refresh polls, then the monitor's temperature poll.
        let sender = Arc::new(ScriptedSender::with_replies(vec![
            Ok(power_on_reply()),
            Ok(temperature_reply()),
            Ok(lamp_reply()),
            Ok(temperature_reply()),
        ]));
        let refresher = StatusRefresher::new(store.clone(), sender.clone());
        let monitor = OverheatMonitor::new(
            store,
            sender.clone(),
            Arc::new(LogNotifier),
            &RuntimeConfig::default(),
        );

        let devices = refresher.refresh_all(&monitor).await.unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].status, PowerState::On);
        assert_eq!(sender.sent().len(), 4);
    }
}
