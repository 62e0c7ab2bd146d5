use super::*;

use std::{collections::HashMap, io::Write};

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn missing_config_file_keeps_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut settings = Settings::default();
    apply_file_settings(&mut settings, FileSettings::default()).expect("empty file");
    apply_env_overrides(&mut settings, env(&[])).expect("no overrides");

    assert_eq!(settings, Settings::default());
    assert!(load_settings(&dir.path().join("scanner.toml")).is_ok());
}

#[test]
fn config_file_values_override_defaults() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        r#"
platform = "ios"
camera_facing = "front"
formats = ["qr_code", "EAN_13"]
scan_area = 250.0
"#
    )
    .expect("write config");

    let settings = load_settings(file.path()).expect("load");

    assert_eq!(settings.platform, HostPlatform::Ios);
    assert_eq!(settings.camera_facing, CameraFacing::Front);
    assert_eq!(
        settings.formats,
        vec![BarcodeFormat::QrCode, BarcodeFormat::Ean13]
    );
    assert_eq!(settings.scan_area, 250.0);
    assert_eq!(settings.view_width, Settings::default().view_width);
}

#[test]
fn environment_overrides_win_over_file_values() {
    let mut settings = Settings {
        platform: HostPlatform::Ios,
        ..Settings::default()
    };

    apply_env_overrides(
        &mut settings,
        env(&[
            ("APP__PLATFORM", "android"),
            ("APP__FORMATS", "CODE_128, pdf_417"),
            ("APP__VIEW_WIDTH", "412"),
        ]),
    )
    .expect("overrides");

    assert_eq!(settings.platform, HostPlatform::Android);
    assert_eq!(
        settings.formats,
        vec![BarcodeFormat::Code128, BarcodeFormat::Pdf417]
    );
    assert_eq!(settings.view_width, 412.0);
}

#[test]
fn invalid_values_are_rejected() {
    let mut settings = Settings::default();
    for (key, value) in [
        ("APP__FORMATS", "QR_CODE,HOLOGRAM"),
        ("APP__SCAN_AREA", "-5"),
        ("APP__VIEW_HEIGHT", "tall"),
        ("APP__PLATFORM", "symbian"),
    ] {
        assert!(
            apply_env_overrides(&mut settings, env(&[(key, value)])).is_err(),
            "{key}={value} should be rejected"
        );
    }
    assert!(parse_camera_facing("sideways").is_err());
}

#[test]
fn negative_dimensions_in_the_config_file_are_rejected() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "scan_area = -120.0").expect("write config");

    let err = load_settings(file.path()).expect_err("negative scan area");

    assert!(format!("{err:#}").contains("scan_area"));
    let mut settings = Settings::default();
    let file_cfg = FileSettings {
        view_width: Some(f64::INFINITY),
        ..FileSettings::default()
    };
    assert!(apply_file_settings(&mut settings, file_cfg).is_err());
}

#[test]
fn empty_format_list_means_all_formats() {
    assert!(parse_format_list("").expect("empty").is_empty());
    assert!(parse_format_list(" , ").expect("blank").is_empty());
}
