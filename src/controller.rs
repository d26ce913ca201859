// src/controller.rs
use futures::future::join_all;
use log::{error, info, warn};
use std::process::Command;
use std::time::Duration;

use crate::config::Config;
use crate::types::{DeviceRecord, PowerAction, TellstickDevice, TellstickDeviceList};

/// Sends turn-on/turn-off commands to the Tellstick unit, one HTTP request
/// per registered device. Dispatch is best-effort: a failing device is
/// logged and the rest of the batch still runs.
pub struct DeviceController {
    client: reqwest::Client,
    host: String,
    auth: String,
    timeout: Duration,
    on_command: String,
    off_command: String,
}

impl DeviceController {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            host: config.tellstick_host.clone(),
            auth: config.tellstick_auth.clone(),
            timeout: config.request_timeout,
            on_command: config.on_command.clone(),
            off_command: config.off_command.clone(),
        }
    }

    /// Devices the Tellstick unit reports. An answer without a "device" key
    /// is an empty list, which the unit uses for error responses as well.
    pub async fn list_devices(&self) -> Result<Vec<TellstickDevice>, reqwest::Error> {
        let url = format!("http://{}/api/devices/list", self.host);
        let response = self
            .client
            .get(&url)
            .header("Authorization", &self.auth)
            .timeout(self.timeout)
            .send()
            .await?;

        let list: TellstickDeviceList = response.json().await?;
        if list.device.is_empty() {
            warn!("[CONTROLLER] No devices in response.");
        } else {
            info!("[CONTROLLER] {} devices found", list.device.len());
        }
        Ok(list.device)
    }

    /// Switch every given device to the desired state, running the local
    /// side-effect command first. Commands fan out concurrently and are all
    /// joined before returning, so the caller's cycle stays sequential.
    pub async fn apply_state(&self, desired: PowerAction, devices: &[DeviceRecord]) {
        self.run_side_effect(desired);

        let commands = devices.iter().map(|device| async move {
            let result = self.send_command(desired, device).await;
            (device, result)
        });

        for (device, result) in join_all(commands).await {
            match result {
                Ok(()) => info!(
                    "[CONTROLLER] {} {} ({})",
                    device.id,
                    desired.as_command(),
                    device.name
                ),
                Err(e) => error!(
                    "[CONTROLLER] {} failed for device {} ({}): {}",
                    desired.as_command(),
                    device.id,
                    device.name,
                    e
                ),
            }
        }
    }

    async fn send_command(
        &self,
        desired: PowerAction,
        device: &DeviceRecord,
    ) -> Result<(), reqwest::Error> {
        let url = format!("http://{}/api/device/{}", self.host, desired.as_command());
        let response = self
            .client
            .get(&url)
            .query(&[("id", device.id.as_str())])
            .header("Authorization", &self.auth)
            .timeout(self.timeout)
            .send()
            .await?;
        // Only transport-level success matters; any JSON body is accepted.
        response.error_for_status()?;
        Ok(())
    }

    // A misconfigured command must never block device control, so launch
    // failures are logged and swallowed.
    fn run_side_effect(&self, desired: PowerAction) {
        let command = match desired {
            PowerAction::On => &self.on_command,
            PowerAction::Off => &self.off_command,
        };
        if command.trim().is_empty() {
            return;
        }

        let mut parts = command.split_whitespace();
        let program = match parts.next() {
            Some(program) => program,
            None => return,
        };

        info!("[CONTROLLER] Executing: {}", command);
        match Command::new(program).args(parts).spawn() {
            Ok(child) => drop(child), // detached, never awaited
            Err(e) => error!("[CONTROLLER] Failed to launch '{}': {}", command, e),
        }
    }
}
