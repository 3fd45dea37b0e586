//! Board configuration
//!
//! `device.toml` is validated and turned into Rust by build.rs; edit it and
//! rebuild to change timings, module addresses or bus identifiers.

use biogate_core::config::{BusConfig, DeviceConfig, FaceConfig, FingerConfig, SupervisorConfig};

include!(concat!(env!("OUT_DIR"), "/device_config.rs"));
