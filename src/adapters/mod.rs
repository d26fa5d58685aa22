//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements             | Connects to                  |
//! |------------|------------------------|------------------------------|
//! | `flash`    | FlashWriter            | esp-ota inactive slot        |
//! |            | RebootPort             | esp_ota::restart             |
//! | `http`     | HttpPort               | ESP-IDF HTTP client          |
//! | `log_sink` | EventSink              | Serial log output            |
//! | `nvs`      | ConfigPort             | NVS / in-memory store        |
//! | `wifi`     | (bootstrap only)       | ESP-IDF WiFi STA             |

pub mod flash;
pub mod http;
pub mod log_sink;
pub mod nvs;
pub mod wifi;
