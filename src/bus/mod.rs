//! Event bus publisher: a blocking `rumqttc` client wrapping one station (§6).
//!
//! `rumqttc`'s blocking `Client` requires its paired `Connection` to be drained on
//! a separate thread to drive the network loop; this mirrors the receiver-thread
//! idiom used for the other network input paths in this codebase, just for an
//! outbound connection instead of an inbound socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info};
use rumqttc::{Client, LastWill, MqttOptions, QoS};

use crate::config::MqttConfig;
use crate::error::PublishError;
use crate::pick::Pick;

/// Publishes picks to `{topic_prefix}/{station}/picks` and drives the online/offline
/// status topic with a broker-side last will.
pub struct EventBus {
    client: Client,
    picks_topic: String,
    status_topic: String,
    station_id: String,
    running: Arc<AtomicBool>,
    drain_thread: Option<JoinHandle<()>>,
}

impl EventBus {
    /// Connect to the configured broker and start draining the connection loop.
    pub fn connect(config: &MqttConfig, station_id: &str) -> Self {
        let mut opts = MqttOptions::new(station_id, config.server_address.clone(), config.port);
        opts.set_keep_alive(Duration::from_secs(30));
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            opts.set_credentials(user.clone(), pass.clone());
        }

        let offline_payload = serde_json::json!({"id": station_id, "status": "offline"}).to_string();
        opts.set_last_will(LastWill::new(config.topic_status.clone(), offline_payload, QoS::AtLeastOnce, false));

        let (client, mut connection) = Client::new(opts, 10);

        let running = Arc::new(AtomicBool::new(true));
        let running_thread = running.clone();
        let drain_thread = thread::spawn(move || {
            for notification in connection.iter() {
                if !running_thread.load(Ordering::Relaxed) {
                    break;
                }
                if let Err(e) = notification {
                    error!("mqtt connection error: {e}");
                }
            }
        });

        let bus = Self {
            client,
            picks_topic: format!("{}/{}/picks", config.topic_prefix, station_id),
            status_topic: config.topic_status.clone(),
            station_id: station_id.to_string(),
            running,
            drain_thread: Some(drain_thread),
        };
        bus.publish_status("online");
        bus
    }

    fn publish_status(&self, status: &str) {
        let payload = serde_json::json!({"id": self.station_id, "status": status}).to_string();
        if let Err(e) = self.client.publish(&self.status_topic, QoS::AtLeastOnce, false, payload) {
            error!("failed to publish status {status}: {e}");
        } else {
            debug!("published status {status}");
        }
    }

    /// Publish one pick as JSON, QoS 1. Never retried on failure (§7).
    pub fn publish_pick(&self, pick: &Pick) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(&pick.to_bus_payload())
            .map_err(|e| PublishError::Bus(format!("failed to serialize pick: {e}")))?;
        self.client
            .publish(&self.picks_topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| PublishError::Bus(e.to_string()))?;
        info!("published pick: {}", pick.to_log_line());
        Ok(())
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.publish_status("offline");
        self.running.store(false, Ordering::Relaxed);
        self.client.disconnect().ok();
        if let Some(handle) = self.drain_thread.take() {
            let _ = handle.join();
        }
    }
}
