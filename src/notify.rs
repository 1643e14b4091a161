//! Notify Publisher — fire-and-forget MQTT publish of accepted raw
//! transactions, used when `enable_notify` (`EnableActiveMQ`) is on.
//!
//! A bounded channel decouples the hot request path from the publish
//! client: `notify()` never blocks, and a full channel just drops the
//! transaction with a warning, exactly like the original's
//! `select { case txCh <- raw: default: ... }`. The background task owns
//! the `rumqttc` event loop, whose `.poll()` loop already reconnects on its
//! own; we just keep calling it.

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc;
use tracing::{info, warn};

const CHANNEL_CAPACITY: usize = 4096;

#[derive(Clone)]
pub struct Notifier {
    sender: mpsc::Sender<String>,
}

/// Maps the config's raw `qos` knob (`0|1|2`) onto `rumqttc::QoS`, falling
/// back to `AtLeastOnce` for anything else — config.rs validates this range
/// at load time, but the fallback keeps this function total.
fn qos_from_u8(qos: u8) -> QoS {
    match qos {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

impl Notifier {
    /// Connects to `server` under `client_id` and spawns the background
    /// publish loop, which publishes every queued raw transaction to
    /// `topic` at `qos`.
    pub async fn connect(
        server: &str,
        username: &str,
        password: &str,
        client_id: &str,
        topic: &str,
        qos: u8,
    ) -> anyhow::Result<Self> {
        let mut mqtt_options = MqttOptions::parse_url(format!("{server}?client_id={client_id}"))
            .unwrap_or_else(|_| MqttOptions::new(client_id, server, 1883));
        mqtt_options.set_credentials(username, password);

        let (client, event_loop) = AsyncClient::new(mqtt_options, CHANNEL_CAPACITY);
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(run_event_loop(event_loop));
        tokio::spawn(run_publish_loop(client, rx, topic.to_string(), qos_from_u8(qos)));

        Ok(Self { sender: tx })
    }

    /// Enqueues a raw transaction for publish. Drops and logs on a full
    /// channel rather than applying backpressure to the caller.
    pub fn notify(&self, raw_tx_hex: String) {
        if self.sender.try_send(raw_tx_hex).is_err() {
            warn!("discarding raw transaction, notify channel is full");
        }
    }
}

async fn run_publish_loop(client: AsyncClient, mut rx: mpsc::Receiver<String>, topic: String, qos: QoS) {
    while let Some(raw) = rx.recv().await {
        if let Err(err) = client.publish(&topic, qos, false, raw.into_bytes()).await {
            warn!(%err, "mqtt publish failed");
        }
    }
}

async fn run_event_loop(mut event_loop: rumqttc::EventLoop) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("mqtt broker connected/reconnected");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(%err, "mqtt event loop error, retrying");
            }
        }
    }
}
