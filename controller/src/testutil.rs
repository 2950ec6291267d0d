//! Shared fixtures for controller tests: a scripted transport and
//! temp-directory stores seeded with device and user records.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use projector_common::Result;

use crate::net::CommandSender;
use crate::store::{ControlStore, Device, User};

/// Transport double that records every frame and replays scripted replies.
/// Once the script is exhausted it answers with a generic short ack.
pub struct ScriptedSender {
    sent: Mutex<Vec<(String, u16, Vec<u8>)>>,
    replies: Mutex<VecDeque<Result<Vec<u8>>>>,
}

impl ScriptedSender {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_replies(replies: Vec<Result<Vec<u8>>>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into()),
        }
    }

    pub fn sent(&self) -> Vec<(String, u16, Vec<u8>)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent()
            .into_iter()
            .map(|(_, _, frame)| frame)
            .collect()
    }
}

#[async_trait]
impl CommandSender for ScriptedSender {
    async fn send(&self, host: &str, port: u16, frame: &[u8]) -> Result<Vec<u8>> {
        self.sent
            .lock()
            .unwrap()
            .push((host.to_string(), port, frame.to_vec()));

        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => Ok(vec![0x03, 0x14, 0x00, 0x00, 0x00, 0x14]),
        }
    }
}

pub fn device(ip_address: &str) -> Device {
    Device {
        name: format!("projector-{ip_address}"),
        ip_address: ip_address.to_string(),
        port: crate::store::DEFAULT_DEVICE_PORT,
        status: Default::default(),
        temperature: 0.0,
        lamp_hours: 0,
        schedule: Default::default(),
        next_alert_date: chrono::DateTime::UNIX_EPOCH,
    }
}

pub fn user(email: &str, role: &str) -> User {
    User {
        email: email.to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        role: role.to_string(),
    }
}

pub fn empty_store() -> (TempDir, ControlStore) {
    let dir = TempDir::new().unwrap();
    let store = ControlStore::at(dir.path().to_path_buf());
    (dir, store)
}

pub async fn store_with_devices(devices: Vec<Device>) -> (TempDir, ControlStore) {
    let (dir, store) = empty_store();
    store.save_devices(&devices).await.unwrap();
    (dir, store)
}
