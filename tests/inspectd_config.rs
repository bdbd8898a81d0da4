use std::sync::Mutex;

use tempfile::NamedTempFile;

use beltsight::config::InspectdConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "INSPECT_CONFIG",
        "INSPECT_ENDPOINT_URL",
        "INSPECT_DEVICE_ID",
        "INSPECT_CAMERA_DEVICE",
        "INSPECT_MODEL_PATH",
        "INSPECT_INTERVAL_MS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = InspectdConfig::load().expect("load config");

    assert_eq!(cfg.device_id, "Laptop_Faja_Principal");
    assert_eq!(cfg.endpoint.url, "http://127.0.0.1:8799/classify");
    assert_eq!(cfg.endpoint.timeout.as_secs(), 5);
    assert_eq!(cfg.camera.device, "0");
    assert_eq!(cfg.camera.target_fps, 10);
    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.camera.height, 480);
    assert_eq!(cfg.model.path, "best.onnx");
    assert_eq!(cfg.model.labels, vec!["Mal Estado", "Buen Estado"]);
    assert_eq!(cfg.interval.as_millis(), 500);
    assert!(!cfg.dispatch_on_change);

    clear_env();
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "device_id": "Banda_Norte_01",
        "endpoint": {
            "url": "http://collector.plant.local:9000/classify",
            "timeout_secs": 10
        },
        "camera": {
            "device": "/dev/video2",
            "target_fps": 15,
            "width": 800,
            "height": 600
        },
        "model": {
            "path": "models/belt_v3.onnx",
            "labels": ["Mal Estado", "Buen Estado", "Revisar"],
            "confidence_threshold": 0.4
        },
        "loop": {
            "interval_ms": 250,
            "dispatch_on_change": true
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("INSPECT_CONFIG", file.path());
    std::env::set_var("INSPECT_DEVICE_ID", "Banda_Norte_02");
    std::env::set_var("INSPECT_INTERVAL_MS", "750");

    let cfg = InspectdConfig::load().expect("load config");

    assert_eq!(cfg.device_id, "Banda_Norte_02");
    assert_eq!(cfg.endpoint.url, "http://collector.plant.local:9000/classify");
    assert_eq!(cfg.endpoint.timeout.as_secs(), 10);
    assert_eq!(cfg.camera.device, "/dev/video2");
    assert_eq!(cfg.camera.target_fps, 15);
    assert_eq!(cfg.camera.width, 800);
    assert_eq!(cfg.camera.height, 600);
    assert_eq!(cfg.model.path, "models/belt_v3.onnx");
    assert_eq!(cfg.model.labels, vec!["Mal Estado", "Buen Estado", "Revisar"]);
    assert!((cfg.model.confidence_threshold - 0.4).abs() < 1e-6);
    assert_eq!(cfg.interval.as_millis(), 750);
    assert!(cfg.dispatch_on_change);

    clear_env();
}

#[test]
fn rejects_non_http_endpoint_url() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("INSPECT_ENDPOINT_URL", "ftp://collector.plant.local");
    let err = InspectdConfig::load().expect_err("validation must fail");
    assert!(err.to_string().contains("http"));

    clear_env();
}

#[test]
fn validate_catches_overrides_applied_after_load() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    // CLI overrides land after load(); the daemon re-validates them.
    let mut cfg = InspectdConfig::load().expect("load config");
    cfg.device_id = String::new();
    assert!(cfg.validate().is_err());

    cfg.device_id = "Banda_Norte_01".to_string();
    cfg.endpoint.url = "not-a-url".to_string();
    assert!(cfg.validate().is_err());

    clear_env();
}

#[test]
fn rejects_zero_camera_resolution() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{ "camera": { "width": 0, "height": 480 } }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    std::env::set_var("INSPECT_CONFIG", file.path());

    let err = InspectdConfig::load().expect_err("validation must fail");
    assert!(err.to_string().contains("resolution"));

    clear_env();
}

#[test]
fn rejects_zero_loop_interval() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("INSPECT_INTERVAL_MS", "0");
    assert!(InspectdConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_malformed_interval_override() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("INSPECT_INTERVAL_MS", "half a second");
    assert!(InspectdConfig::load().is_err());

    clear_env();
}
