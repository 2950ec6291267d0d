//! Recurring job scheduler.
//!
//! Every installed schedule becomes one Job Entry per device, weekday, and
//! action. A Job Entry owns a tokio task that sleeps until the next weekly
//! occurrence of its wall-clock slot and then fires; firings run as their
//! own tasks so a slow projector never holds up a trigger loop or a
//! sibling device. Handles live only in the in-process Job Registry: a
//! restart loses them even though the desired-schedule fields persist, and
//! nothing re-fires until the next install request.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use projector_common::command;
use projector_common::schedule::{next_occurrence, DayOfWeek, DesiredSchedule, ScheduleTime};
use projector_common::{Error, Result, RuntimeConfig};

use crate::net::CommandSender;
use crate::store::{ControlStore, Device};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    PowerOn,
    PowerOff,
}

/// One live weekly trigger. Owns the task that waits for its slot.
pub struct JobEntry {
    pub day: DayOfWeek,
    pub at: ScheduleTime,
    pub kind: JobKind,
    pub input: Option<String>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub day: DayOfWeek,
    pub at: String,
    pub kind: JobKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallScheduleRequest {
    #[serde(rename = "ipAddresses")]
    pub ip_addresses: Vec<String>,
    #[serde(rename = "fromTime", default)]
    pub from_time: Option<String>,
    #[serde(rename = "toTime", default)]
    pub to_time: Option<String>,
    #[serde(rename = "daysOfWeek", default)]
    pub days_of_week: Vec<String>,
    #[serde(default)]
    pub input: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelScheduleRequest {
    #[serde(rename = "ipAddresses")]
    pub ip_addresses: Vec<String>,
}

pub struct Scheduler {
    store: ControlStore,
    sender: Arc<dyn CommandSender>,
    timezone: Tz,
    input_switch_delay: Duration,
    registry: Mutex<HashMap<String, Vec<JobEntry>>>,
}

impl Scheduler {
    pub fn new(
        store: ControlStore,
        sender: Arc<dyn CommandSender>,
        config: &RuntimeConfig,
    ) -> Result<Self> {
        let timezone: Tz = config
            .timezone
            .parse()
            .map_err(|_| Error::Validation(format!("invalid timezone: {}", config.timezone)))?;

        Ok(Self {
            store,
            sender,
            timezone,
            input_switch_delay: Duration::from_millis(config.input_switch_delay_ms),
            registry: Mutex::new(HashMap::new()),
        })
    }

    /// Validates the whole request, persists the desired schedule on every
    /// target record, then installs one trigger per device, weekday, and
    /// provided action. New entries are appended to whatever is already
    /// tracked for an address; installing twice without a cancel doubles
    /// the firings. Returns the number of jobs installed.
    pub async fn install(&self, request: &InstallScheduleRequest) -> Result<usize> {
        if request.ip_addresses.is_empty() {
            return Err(Error::Validation("ipAddresses must not be empty".to_string()));
        }
        if request.days_of_week.is_empty() {
            return Err(Error::Validation("daysOfWeek must not be empty".to_string()));
        }

        // One unknown address fails the whole request before any schedule
        // is persisted or any trigger installed.
        let mut targets = Vec::new();
        for ip_address in &request.ip_addresses {
            targets.push(self.store.load_device(ip_address).await?);
        }

        let mut days = Vec::new();
        for token in &request.days_of_week {
            let day = DayOfWeek::from_abbrev(token).ok_or_else(|| {
                Error::Validation(format!(
                    "invalid daysOfWeek token: {token}. Use abbreviations like Lu,Ma,Mi"
                ))
            })?;
            days.push(day);
        }

        if request.from_time.is_none() && request.to_time.is_none() {
            return Err(Error::Validation(
                "at least one of fromTime or toTime must be provided".to_string(),
            ));
        }
        let turn_on_at: Option<ScheduleTime> =
            request.from_time.as_deref().map(str::parse).transpose()?;
        let turn_off_at: Option<ScheduleTime> =
            request.to_time.as_deref().map(str::parse).transpose()?;

        let desired = DesiredSchedule {
            turn_on_at,
            turn_off_at,
            days: days.clone(),
            input: request.input.clone(),
        };

        // Persisted before trigger installation; not rolled back if the
        // installation below fails.
        for device in &targets {
            self.store.save_schedule(&device.ip_address, &desired).await?;
        }

        let mut installed = 0;
        let mut registry = self.registry.lock().await;
        for device in &targets {
            let entries = registry.entry(device.ip_address.clone()).or_default();
            for &day in &days {
                if let Some(at) = turn_on_at {
                    entries.push(self.spawn_job(
                        device,
                        day,
                        at,
                        JobKind::PowerOn,
                        request.input.clone(),
                    ));
                    installed += 1;
                }
                if let Some(at) = turn_off_at {
                    entries.push(self.spawn_job(device, day, at, JobKind::PowerOff, None));
                    installed += 1;
                }
            }
        }

        info!(
            "installed {installed} schedule jobs for {} projectors",
            targets.len()
        );
        Ok(installed)
    }

    /// Stops and discards every tracked job for each address, clears the
    /// persisted schedule fields, and drops the registry entry. Addresses
    /// with nothing tracked are a no-op; once this returns, no further
    /// firings occur for the given addresses.
    pub async fn cancel(&self, request: &CancelScheduleRequest) -> Result<()> {
        if request.ip_addresses.is_empty() {
            return Err(Error::Validation("ipAddresses must not be empty".to_string()));
        }

        for ip_address in &request.ip_addresses {
            let removed = self.registry.lock().await.remove(ip_address);
            let Some(entries) = removed else {
                debug!("no tracked jobs for projector {ip_address}");
                continue;
            };

            for entry in &entries {
                entry.handle.abort();
            }
            info!(
                "cancelled {} scheduled jobs for projector {ip_address}",
                entries.len()
            );

            match self.store.clear_schedule(ip_address).await {
                Ok(()) => {}
                Err(Error::NotFound(_)) => {
                    debug!("projector {ip_address} has no record to clear");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Snapshot of the live registry.
    pub async fn jobs(&self) -> HashMap<String, Vec<JobSummary>> {
        let registry = self.registry.lock().await;
        registry
            .iter()
            .map(|(ip_address, entries)| {
                let summaries = entries
                    .iter()
                    .map(|entry| JobSummary {
                        day: entry.day,
                        at: entry.at.to_string(),
                        kind: entry.kind,
                        input: entry.input.clone(),
                    })
                    .collect();
                (ip_address.clone(), summaries)
            })
            .collect()
    }

    fn spawn_job(
        &self,
        device: &Device,
        day: DayOfWeek,
        at: ScheduleTime,
        kind: JobKind,
        input: Option<String>,
    ) -> JobEntry {
        let job = TriggerJob {
            sender: self.sender.clone(),
            store: self.store.clone(),
            timezone: self.timezone,
            ip_address: device.ip_address.clone(),
            port: device.port,
            day,
            at,
            kind,
            input: input.clone(),
            input_switch_delay: self.input_switch_delay,
        };

        JobEntry {
            day,
            at,
            kind,
            input,
            handle: tokio::spawn(job.run()),
        }
    }
}

fn now_in_timezone(timezone: Tz) -> DateTime<FixedOffset> {
    let local = Utc::now().with_timezone(&timezone);
    local.with_timezone(&local.offset().fix())
}

struct TriggerJob {
    sender: Arc<dyn CommandSender>,
    store: ControlStore,
    timezone: Tz,
    ip_address: String,
    port: u16,
    day: DayOfWeek,
    at: ScheduleTime,
    kind: JobKind,
    input: Option<String>,
    input_switch_delay: Duration,
}

impl TriggerJob {
    async fn run(self) {
        loop {
            let now = now_in_timezone(self.timezone);
            let Some(next) = next_occurrence(now, self.day, self.at) else {
                warn!(
                    "no upcoming occurrence for projector {} at {}",
                    self.ip_address, self.at
                );
                tokio::time::sleep(Duration::from_secs(3600)).await;
                continue;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            // The firing gets its own task so network latency here never
            // delays this trigger loop or any other device's.
            let firing = Firing {
                sender: self.sender.clone(),
                store: self.store.clone(),
                ip_address: self.ip_address.clone(),
                port: self.port,
                kind: self.kind,
                input: self.input.clone(),
                input_switch_delay: self.input_switch_delay,
            };
            tokio::spawn(firing.run());
        }
    }
}

/// One scheduled command execution against one projector. All failures are
/// logged here and never propagate; sibling jobs keep running.
struct Firing {
    sender: Arc<dyn CommandSender>,
    store: ControlStore,
    ip_address: String,
    port: u16,
    kind: JobKind,
    input: Option<String>,
    input_switch_delay: Duration,
}

impl Firing {
    async fn run(self) {
        match self.kind {
            JobKind::PowerOn => self.fire_power_on().await,
            JobKind::PowerOff => self.fire_power_off().await,
        }
    }

    async fn fire_power_on(&self) {
        info!("turning on projector {}", self.ip_address);
        match self.send_frame(command::POWER_ON).await {
            Ok(_) => {
                self.store.append_event(&self.ip_address, "POWER_ON").await;
            }
            Err(err) => {
                warn!("failed to turn on projector {}: {err}", self.ip_address);
                return;
            }
        }

        let Some(input) = self.input.as_deref() else {
            return;
        };

        // Projectors need a warm-up window before they accept an input
        // switch; the switch is an independent action with no retry.
        tokio::time::sleep(self.input_switch_delay).await;
        if let Err(err) = self.send_frame(command::set_input(input)).await {
            warn!(
                "failed to set input {input:?} on projector {}: {err}",
                self.ip_address
            );
        }
    }

    async fn fire_power_off(&self) {
        info!("turning off projector {}", self.ip_address);
        match self.send_frame(command::POWER_OFF).await {
            Ok(_) => {
                self.store.append_event(&self.ip_address, "POWER_OFF").await;
            }
            Err(err) => {
                warn!("failed to turn off projector {}: {err}", self.ip_address);
            }
        }
    }

    async fn send_frame(&self, frame_hex: &str) -> Result<Vec<u8>> {
        let frame = command::encode_frame(frame_hex)?;
        self.sender.send(&self.ip_address, self.port, &frame).await
    }
}
