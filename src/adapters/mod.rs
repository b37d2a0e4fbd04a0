//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements            | Connects to               |
//! |-------------|-----------------------|---------------------------|
//! | `hardware`  | PinPort, ClimatePort  | ESP32 GPIO, DHT22         |
//! |             | DelayNs, TimePort     | FreeRTOS / esp_timer      |
//! | `log_sink`  | EventSink             | Serial log output         |
//! | `mqtt`      | BrokerPort            | ESP-IDF MQTT client       |
//! | `ntp`       | TimeSourcePort        | SNTP over UDP             |
//! | `time`      | TimePort              | ESP32 system timer        |
//! | `wifi`      | —                     | ESP-IDF WiFi STA          |
//! | `device_id` | —                     | eFuse factory MAC         |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod ntp;
pub mod time;
pub mod wifi;
