//! MQTT broker adapter.
//!
//! Implements [`BrokerPort`] for outbound payloads and hands inbound
//! messages to the main loop through a channel, so the controller stays
//! single-threaded.
//!
//! ```text
//!  mqtt-rx thread ──(topic, payload)──▶ mpsc ──▶ main loop ──▶ Controller
//!  Controller ──▶ BrokerPort::publish ──▶ EspMqttClient
//! ```
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`;
//!   the request topic is (re)subscribed on every `Connected` event.
//! - **all other targets**: an in-memory broker that records publishes
//!   and accepts injected inbound messages.

use core::net::Ipv4Addr;
use std::sync::mpsc::{self, Receiver, Sender};

use log::{debug, warn};

use crate::app::ports::BrokerPort;

#[cfg(target_os = "espidf")]
use std::sync::{Arc, Mutex};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
};

#[cfg(target_os = "espidf")]
use crate::error::CommsError;

/// One complete message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

pub struct MqttAdapter {
    #[cfg(target_os = "espidf")]
    client: Arc<Mutex<EspMqttClient<'static>>>,
    #[cfg(not(target_os = "espidf"))]
    outbox: Vec<(String, String)>,
    #[cfg(not(target_os = "espidf"))]
    inject: Sender<InboundMessage>,
    inbox: Receiver<InboundMessage>,
    local_ip: Option<Ipv4Addr>,
    max_payload_len: usize,
}

impl MqttAdapter {
    /// Connect to `url` and subscribe to `request_topic`.
    #[cfg(target_os = "espidf")]
    pub fn connect(
        url: &str,
        client_id: &str,
        request_topic: &str,
        local_ip: Option<Ipv4Addr>,
        max_payload_len: usize,
    ) -> Result<Self, CommsError> {
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };
        let (client, conn) = EspMqttClient::new(url, &conf).map_err(|e| {
            warn!("MQTT: client init failed: {:?}", e);
            CommsError::Network
        })?;
        let client = Arc::new(Mutex::new(client));
        let (tx, inbox) = mpsc::channel();
        spawn_receiver(conn, Arc::clone(&client), String::from(request_topic), tx)?;
        log::info!("MQTT: connecting to {} as {}", url, client_id);
        Ok(Self {
            client,
            inbox,
            local_ip,
            max_payload_len,
        })
    }

    /// In-memory broker for host runs.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim(local_ip: Option<Ipv4Addr>, max_payload_len: usize) -> Self {
        let (inject, inbox) = mpsc::channel();
        Self {
            outbox: Vec::new(),
            inject,
            inbox,
            local_ip,
            max_payload_len,
        }
    }

    /// Queue a message as if the broker had delivered it.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject(&self, topic: &str, payload: &[u8]) {
        let _ = self.inject.send(InboundMessage {
            topic: String::from(topic),
            payload: payload.to_vec(),
        });
    }

    /// Everything published so far, oldest first.
    #[cfg(not(target_os = "espidf"))]
    pub fn published(&self) -> &[(String, String)] {
        &self.outbox
    }

    /// Up to `limit` queued inbound messages, oldest first.  Never
    /// blocks; anything beyond `limit` stays queued for the next call.
    pub fn poll_batch(&self, limit: usize) -> Vec<InboundMessage> {
        self.inbox.try_iter().take(limit).collect()
    }

    #[cfg(target_os = "espidf")]
    fn send(&mut self, topic: &str, payload: &str) -> bool {
        let Ok(mut client) = self.client.lock() else {
            warn!("MQTT: client lock poisoned");
            return false;
        };
        match client.publish(topic, QoS::AtMostOnce, false, payload.as_bytes()) {
            Ok(_) => true,
            Err(e) => {
                warn!("MQTT: publish to {} failed: {:?}", topic, e);
                false
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn send(&mut self, topic: &str, payload: &str) -> bool {
        self.outbox.push((String::from(topic), String::from(payload)));
        true
    }
}

impl BrokerPort for MqttAdapter {
    fn publish(&mut self, topic: &str, payload: &str) -> bool {
        if payload.len() > self.max_payload_len {
            warn!(
                "MQTT: {} byte payload for {} exceeds {} bytes",
                payload.len(),
                topic,
                self.max_payload_len
            );
            return false;
        }
        debug!("MQTT: -> {} ({} bytes)", topic, payload.len());
        self.send(topic, payload)
    }

    #[cfg(target_os = "espidf")]
    fn rssi(&self) -> Option<i8> {
        // SAFETY: wifi_ap_record_t is plain data; the driver fills it in.
        let mut info: esp_idf_svc::sys::wifi_ap_record_t = unsafe { core::mem::zeroed() };
        let rc = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut info) };
        (rc == esp_idf_svc::sys::ESP_OK as i32).then_some(info.rssi)
    }

    #[cfg(not(target_os = "espidf"))]
    fn rssi(&self) -> Option<i8> {
        None
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.local_ip
    }
}

// ───────────────────────────────────────────────────────────────
// Receiver thread (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn spawn_receiver(
    mut conn: EspMqttConnection,
    client: Arc<Mutex<EspMqttClient<'static>>>,
    request_topic: String,
    tx: Sender<InboundMessage>,
) -> Result<(), CommsError> {
    std::thread::Builder::new()
        .name("mqtt-rx".into())
        .stack_size(6 * 1024)
        .spawn(move || {
            while let Ok(event) = conn.next() {
                match event.payload() {
                    EventPayload::Connected(_) => {
                        let subscribed = client
                            .lock()
                            .map(|mut c| c.subscribe(&request_topic, QoS::AtMostOnce).is_ok())
                            .unwrap_or(false);
                        if subscribed {
                            log::info!("MQTT: subscribed to {}", request_topic);
                        } else {
                            warn!("MQTT: subscribe to {} failed", request_topic);
                        }
                    }
                    EventPayload::Received {
                        topic: Some(topic),
                        data,
                        details: Details::Complete,
                        ..
                    } => {
                        let msg = InboundMessage {
                            topic: String::from(topic),
                            payload: data.to_vec(),
                        };
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    EventPayload::Disconnected => warn!("MQTT: disconnected"),
                    _ => {}
                }
            }
            warn!("MQTT: receiver stopped");
        })
        .map(|_| ())
        .map_err(|_| CommsError::Network)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_payload_is_refused() {
        let mut broker = MqttAdapter::sim(None, 10);
        assert!(broker.publish("a/b", "0123456789"));
        assert!(!broker.publish("a/b", "0123456789x"));
        assert_eq!(broker.published().len(), 1);
    }

    #[test]
    fn injected_messages_arrive_in_order() {
        let broker = MqttAdapter::sim(Some(Ipv4Addr::new(10, 0, 0, 7)), 150);
        broker.inject("x/request", b"ToggleOnOff;1;100");
        broker.inject("x/request", b"ReadValues;4;0");
        let batch = broker.poll_batch(8);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].payload, b"ToggleOnOff;1;100");
        assert_eq!(batch[1].topic, "x/request");
        assert!(broker.poll_batch(8).is_empty());
        assert_eq!(broker.local_ip(), Some(Ipv4Addr::new(10, 0, 0, 7)));
    }

    #[test]
    fn batch_leaves_the_rest_queued() {
        let broker = MqttAdapter::sim(None, 150);
        for pin in 0..5 {
            broker.inject("x/request", format!("ToggleOnOff;{pin};10").as_bytes());
        }
        let first = broker.poll_batch(3);
        assert_eq!(first.len(), 3);
        assert_eq!(first[2].payload, b"ToggleOnOff;2;10");
        let rest = broker.poll_batch(3);
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].payload, b"ToggleOnOff;3;10");
    }
}
