//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements         | Connects to                      |
//! |-------------|--------------------|----------------------------------|
//! | `hardware`  | AccessPointPort    | `wifi` (AP mode) + `portal`      |
//! |             | NetworkJoinPort    | `wifi` (station mode)            |
//! |             | TimeFetchPort      | `sntp`                           |
//! |             | ClockPort          | `time`                           |
//! | `i2c_slave` | BusTransport       | ESP32 I²C slave peripheral       |
//! | `log_sink`  | EventSink          | Serial log output                |
//! | `nvs`       | PersistentStore    | NVS blob / in-memory image       |
//! | `portal`    | (via `hardware`)   | ESP-IDF HTTP server              |
//! | `sntp`      | TimeFetchPort      | ESP-IDF SNTP client              |
//! | `time`      | ClockPort          | gettimeofday + esp_timer         |
//! | `wifi`      | NetworkJoinPort    | ESP-IDF WiFi (AP / STA)          |

pub mod hardware;
#[cfg(target_os = "espidf")]
pub mod i2c_slave;
pub mod log_sink;
pub mod nvs;
pub mod portal;
pub mod sntp;
pub mod time;
pub mod wifi;
