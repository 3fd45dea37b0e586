//! Build script for biogate-firmware
//!
//! - Sets up linker arguments (memory.x comes from embassy-stm32)
//! - Validates device.toml at compile time
//! - Generates `device_config.rs` holding the board's `DeviceConfig`

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// `(key, default, min, max)`
type Field = (&'static str, i64, i64, i64);

const SECTIONS: &[&str] = &["finger", "face", "bus", "supervisor"];

const ROOT: &[Field] = &[("tick_ms", 10, 1, 1_000)];

const FINGER: &[Field] = &[
    ("address", 0xFFFF_FFFF, 0, 0xFFFF_FFFF),
    ("password", 0x7864_1644, 0, 0xFFFF_FFFF),
    ("enroll_captures", 5, 1, 6),
    ("score_threshold", 20, 0, 255),
    ("led_notice_ms", 200, 1, 60_000),
    ("led_revert_ms", 800, 1, 60_000),
    ("led_idle_ms", 2_000, 1, 60_000),
    ("verify_gate_ms", 1_000, 0, 60_000),
    ("enroll_timeout_ms", 20_000, 1_000, 600_000),
];

const FACE: &[Field] = &[
    ("verify_timeout_s", 20, 1, 255),
    ("capture_timeout_s", 20, 1, 255),
    ("identify_retry_ms", 21_000, 1_000, 600_000),
    ("lead_in_ms", 2_500, 0, 60_000),
    ("prompt_gap_ms", 500, 0, 60_000),
    ("capture_timeout_ms", 20_000, 1_000, 600_000),
    ("settle_ms", 2_000, 0, 60_000),
];

const BUS: &[Field] = &[
    ("bitrate", 250_000, 10_000, 1_000_000),
    ("identify_success_id", 0x100, 0, 0x7FF),
    ("status_update_id", 0x101, 0, 0x7FF),
    ("request_id", 0x102, 0, 0x7FF),
    ("status_report_id", 0x103, 0, 0x7FF),
];

const SUPERVISOR: &[Field] = &[
    ("boot_delay_ms", 500, 0, 60_000),
    ("user_count_wait_ms", 100, 0, 60_000),
    ("success_hold_ms", 3_000, 0, 60_000),
];

fn main() {
    setup_linker();
    let config = validate_config();
    generate_config(&config);
}

/// Linker scripts for cortex-m-rt and defmt
fn setup_linker() {
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    if env::var_os("CARGO_FEATURE_DEFMT").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate device.toml configuration at compile time
fn validate_config() -> toml::Value {
    println!("cargo:rerun-if-changed=device.toml");

    let config_path = Path::new("device.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: device.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a device.toml configuration file.         ║\n\
            ║  Please create one in the biogate-firmware directory.            ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read device.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in device.toml                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_section(&config, None, ROOT, &mut errors);
    validate_section(&config, Some("finger"), FINGER, &mut errors);
    validate_section(&config, Some("face"), FACE, &mut errors);
    validate_section(&config, Some("bus"), BUS, &mut errors);
    validate_section(&config, Some("supervisor"), SUPERVISOR, &mut errors);
    validate_bus_ids(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid device configuration                             ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=device.toml validated successfully");
    config
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn section<'a>(config: &'a toml::Value, name: Option<&str>) -> Option<&'a toml::Value> {
    match name {
        Some(name) => config.get(name),
        None => Some(config),
    }
}

fn label(name: Option<&str>, key: &str) -> String {
    match name {
        Some(name) => format!("[{}] {}", name, key),
        None => key.to_string(),
    }
}

/// Check types and ranges; unknown keys are rejected
fn validate_section(
    config: &toml::Value,
    name: Option<&str>,
    fields: &[Field],
    errors: &mut Vec<String>,
) {
    let table = match section(config, name) {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push(format!("[{}] must be a table", name.unwrap_or("root")));
            return;
        }
        None => return,
    };

    for (key, value) in table {
        if name.is_none() && SECTIONS.contains(&key.as_str()) {
            continue;
        }
        let Some(&(_, _, min, max)) = fields.iter().find(|f| f.0 == key.as_str()) else {
            errors.push(format!("{} is not a known setting", label(name, key)));
            continue;
        };
        match value {
            toml::Value::Integer(v) if (min..=max).contains(v) => {}
            toml::Value::Integer(_) => {
                errors.push(format!("{} must be {}-{}", label(name, key), min, max));
            }
            _ => errors.push(format!("{} must be an integer", label(name, key))),
        }
    }
}

fn validate_bus_ids(config: &toml::Value, errors: &mut Vec<String>) {
    let ids: Vec<i64> = BUS[1..]
        .iter()
        .map(|field| read(config, Some("bus"), field))
        .collect();

    for (i, id) in ids.iter().enumerate() {
        if ids[..i].contains(id) {
            errors.push(format!("[bus] id 0x{:03X} is used twice", id));
        }
    }
}

fn read(config: &toml::Value, name: Option<&str>, field: &Field) -> i64 {
    section(config, name)
        .and_then(|s| s.get(field.0))
        .and_then(toml::Value::as_integer)
        .unwrap_or(field.1)
}

fn struct_body(out: &mut String, config: &toml::Value, name: &str, fields: &[Field]) {
    for field in fields {
        let _ = writeln!(out, "        {}: {},", field.0, read(config, Some(name), field));
    }
}

/// Write `device_config.rs` into OUT_DIR
fn generate_config(config: &toml::Value) {
    let mut out = String::new();
    out.push_str("// Generated by build.rs from device.toml\n\n");

    let _ = writeln!(
        out,
        "pub const CAN_BITRATE: u32 = {};\n",
        read(config, Some("bus"), &BUS[0])
    );

    out.push_str("pub const DEVICE_CONFIG: DeviceConfig = DeviceConfig {\n");
    out.push_str("    finger: FingerConfig {\n");
    struct_body(&mut out, config, "finger", FINGER);
    out.push_str("    },\n    face: FaceConfig {\n");
    struct_body(&mut out, config, "face", FACE);
    out.push_str("    },\n    bus: BusConfig {\n");
    struct_body(&mut out, config, "bus", &BUS[1..]);
    out.push_str("    },\n    supervisor: SupervisorConfig {\n");
    struct_body(&mut out, config, "supervisor", SUPERVISOR);
    out.push_str("    },\n");
    let _ = writeln!(out, "    tick_ms: {},", read(config, None, &ROOT[0]));
    out.push_str("};\n");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("device_config.rs"), out).unwrap();
}
