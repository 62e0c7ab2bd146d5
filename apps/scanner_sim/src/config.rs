use std::{fs, path::Path};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use shared::domain::{BarcodeFormat, CameraFacing, HostPlatform, ViewGeometry};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub platform: HostPlatform,
    pub camera_facing: CameraFacing,
    pub formats: Vec<BarcodeFormat>,
    pub view_width: f64,
    pub view_height: f64,
    pub scan_area: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            platform: HostPlatform::Android,
            camera_facing: CameraFacing::Back,
            formats: Vec::new(),
            view_width: 390.0,
            view_height: 844.0,
            scan_area: 300.0,
        }
    }
}

impl Settings {
    pub fn geometry(&self) -> ViewGeometry {
        ViewGeometry::new(self.view_width, self.view_height, self.scan_area)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    platform: Option<String>,
    camera_facing: Option<String>,
    formats: Option<Vec<String>>,
    view_width: Option<f64>,
    view_height: Option<f64>,
    scan_area: Option<f64>,
}

/// Defaults, then `path` if it exists, then `APP__*` environment variables.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let file_cfg: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        apply_file_settings(&mut settings, file_cfg)?;
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file_settings(settings: &mut Settings, file_cfg: FileSettings) -> anyhow::Result<()> {
    if let Some(v) = file_cfg.platform {
        settings.platform = parse_platform(&v)?;
    }
    if let Some(v) = file_cfg.camera_facing {
        settings.camera_facing = parse_camera_facing(&v)?;
    }
    if let Some(v) = file_cfg.formats {
        settings.formats = v
            .iter()
            .map(|name| parse_format(name))
            .collect::<anyhow::Result<_>>()?;
    }
    if let Some(v) = file_cfg.view_width {
        settings.view_width = check_dimension("view_width", v)?;
    }
    if let Some(v) = file_cfg.view_height {
        settings.view_height = check_dimension("view_height", v)?;
    }
    if let Some(v) = file_cfg.scan_area {
        settings.scan_area = check_dimension("scan_area", v)?;
    }
    Ok(())
}

pub fn apply_env_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("APP__PLATFORM") {
        settings.platform = parse_platform(&v)?;
    }
    if let Some(v) = lookup("APP__CAMERA_FACING") {
        settings.camera_facing = parse_camera_facing(&v)?;
    }
    if let Some(v) = lookup("APP__FORMATS") {
        settings.formats = parse_format_list(&v)?;
    }
    if let Some(v) = lookup("APP__VIEW_WIDTH") {
        settings.view_width = parse_dimension("APP__VIEW_WIDTH", &v)?;
    }
    if let Some(v) = lookup("APP__VIEW_HEIGHT") {
        settings.view_height = parse_dimension("APP__VIEW_HEIGHT", &v)?;
    }
    if let Some(v) = lookup("APP__SCAN_AREA") {
        settings.scan_area = parse_dimension("APP__SCAN_AREA", &v)?;
    }
    Ok(())
}

pub fn parse_platform(raw: &str) -> anyhow::Result<HostPlatform> {
    raw.parse::<HostPlatform>().map_err(|err| anyhow!(err))
}

pub fn parse_camera_facing(raw: &str) -> anyhow::Result<CameraFacing> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "back" => Ok(CameraFacing::Back),
        "front" => Ok(CameraFacing::Front),
        other => Err(anyhow!("unsupported camera facing '{other}'")),
    }
}

pub fn parse_format(raw: &str) -> anyhow::Result<BarcodeFormat> {
    Ok(raw.trim().to_ascii_uppercase().parse::<BarcodeFormat>()?)
}

/// Comma-separated format names; an empty string means every format.
pub fn parse_format_list(raw: &str) -> anyhow::Result<Vec<BarcodeFormat>> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(parse_format)
        .collect()
}

fn parse_dimension(key: &str, raw: &str) -> anyhow::Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a number, got '{raw}'"))?;
    check_dimension(key, value)
}

fn check_dimension(key: &str, value: f64) -> anyhow::Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(anyhow!("{key} must be a non-negative number, got {value}"));
    }
    Ok(value)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
