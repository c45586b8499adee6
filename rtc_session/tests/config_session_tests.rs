//! Config-driven session tests.
//!
//! Loads `rtc.toml` files from disk and connects with the values they carry.

use rtc_common::card::types::LaserMode;
use rtc_common::config::{ConfigLoader, SessionConfig};
use rtc_session::gateways::simulation::{SimulatedCard, SimulationOptions};
use rtc_session::{ConnectionSession, SessionState};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
[shared]
service_name = "rtc6-eth"
log_level = "debug"

[card]
address = "10.0.0.7"
program_file = "/opt/rtc/program"
correction_file = "/opt/rtc/D2_2034.ct5"

[retry]
enabled = true
attempts = 5
interval_ms = 250

[control]
laser_mode = "YAG3"
mark_speed = 500.0
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
fn test_shipped_config_is_valid() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/rtc.toml");
    let config = SessionConfig::load(&path).expect("load shipped config");
    config.validate().expect("shipped config validates");
    assert_eq!(config.card.address, "172.23.17.192");
    assert_eq!(config.retry.effective_attempts(), 1);
    assert_eq!(config.control.laser_mode, LaserMode::Yag5);
    assert_eq!(config.control.delays, None);
}

#[test]
#[serial_test::serial]
fn test_session_uses_configured_files() {
    let file = write_config(CONFIG);
    let config = SessionConfig::load(file.path()).expect("load config");
    config.validate().expect("validate");
    assert_eq!(config.retry.effective_attempts(), 5);

    let mut session = ConnectionSession::new(SimulatedCard::with_options(SimulationOptions {
        card_address: Some(config.card.address.clone()),
        ..SimulationOptions::default()
    }));
    let handle = session
        .connect(
            &config.card.address,
            &config.card.program_file,
            &config.card.correction_file,
        )
        .expect("connect");

    assert_eq!(
        session.gateway().program(),
        Some(config.card.program_file.as_path())
    );
    assert_eq!(handle.address().to_string(), config.card.address);

    session
        .apply_control_settings(&handle, &config.control)
        .expect("control settings");
    assert_eq!(session.gateway().control().laser_mode, Some(3));
    assert_eq!(session.gateway().control().mark_speed, Some(500.0));

    session.disconnect(&handle).expect("disconnect");
    assert_eq!(session.state(), SessionState::Disconnected);
}
