use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use futures::StreamExt;
use platform_channel::{loopback, SimulatedCameraHost};
use scanner_core::{next_view_id, ControllerOptions, DecodedItem, QrViewController};
use shared::{domain::SystemFeatures, protocol::channel_name};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, parse_camera_facing, parse_format, parse_format_list, parse_platform};

const DEFAULT_SCANS: &[&str] = &["QR_CODE=https://example.org/ticket/42", "EAN_13=4006381333931"];

/// Drives a scanner view controller against a simulated camera host.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "scanner.toml")]
    config: PathBuf,
    /// android, ios, macos or web.
    #[arg(long)]
    platform: Option<String>,
    /// back or front.
    #[arg(long)]
    facing: Option<String>,
    /// Comma-separated formats to accept, e.g. QR_CODE,EAN_13. Empty accepts all.
    #[arg(long)]
    formats: Option<String>,
    /// Scan the host should report, as FORMAT=payload. Repeatable.
    #[arg(long = "scan")]
    scans: Vec<String>,
    #[arg(long)]
    deny_permission: bool,
    /// Simulate a host without a torch.
    #[arg(long)]
    no_flash: bool,
}

fn parse_scan(raw: &str) -> Result<DecodedItem> {
    let (format, payload) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("scan '{raw}' must look like FORMAT=payload"))?;
    Ok(DecodedItem::new(payload, parse_format(format)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    if let Some(v) = &args.platform {
        settings.platform = parse_platform(v)?;
    }
    if let Some(v) = &args.facing {
        settings.camera_facing = parse_camera_facing(v)?;
    }
    if let Some(v) = &args.formats {
        settings.formats = parse_format_list(v)?;
    }
    let scans = if args.scans.is_empty() {
        DEFAULT_SCANS.iter().map(|raw| parse_scan(raw)).collect::<Result<Vec<_>>>()?
    } else {
        args.scans.iter().map(|raw| parse_scan(raw)).collect::<Result<Vec<_>>>()?
    };

    let options = ControllerOptions::new(settings.platform)
        .with_camera_facing(settings.camera_facing)
        .with_formats(settings.formats.iter().copied())
        .on_permission_set(|granted| println!("permission granted: {granted}"));
    let creation_params = serde_json::to_value(options.creation_params())
        .context("failed to encode view creation params")?;
    let host = Arc::new(
        SimulatedCameraHost::create(
            SystemFeatures {
                has_flash: !args.no_flash,
                has_back_camera: true,
                has_front_camera: true,
            },
            creation_params,
        )
        .context("host rejected view creation params")?,
    );
    let view_id = next_view_id();
    let (transport, endpoint) = loopback(channel_name(view_id), host.clone());

    let controller =
        QrViewController::on_view_created(view_id, transport, settings.geometry(), options)
            .await
            .context("failed to start scanner view")?;
    info!(
        view_id = view_id.0,
        channel = controller.channel_name(),
        "scanner view started"
    );

    let mut items = controller.scanned_items();
    let consumer = tokio::spawn(async move {
        let mut count = 0usize;
        while let Some(item) = items.next().await {
            count += 1;
            match &item.raw_bytes {
                Some(raw) => println!(
                    "scanned {} ({} raw bytes): {}",
                    item.format,
                    raw.len(),
                    item.payload
                ),
                None => println!("scanned {}: {}", item.format, item.payload),
            }
        }
        count
    });

    endpoint
        .push_permission(!args.deny_permission)
        .await
        .context("host failed to report permission")?;
    if let Some(features) = controller.system_features().await {
        println!(
            "features: flash={} back={} front={}",
            features.has_flash, features.has_back_camera, features.has_front_camera
        );
    }

    for item in &scans {
        if !settings.formats.is_empty() && !settings.formats.contains(&item.format) {
            info!(format = %item.format, "host filters out scan of a format not allowed");
            continue;
        }
        endpoint
            .push_recognized(item)
            .await
            .with_context(|| format!("host failed to deliver scan of {}", item.format))?;
    }

    println!("camera facing: {:?}", controller.get_camera_info().await?);
    println!("flipped to: {:?}", controller.flip_camera().await?);
    match controller.toggle_flash().await {
        Ok(()) => println!("flash on: {}", controller.get_flash_info().await?),
        Err(err) => println!("flash unavailable: {err}"),
    }
    controller.pause_camera().await?;
    controller.resume_camera().await?;

    controller.dispose()?;
    let delivered = consumer.await.context("scan consumer panicked")?;
    println!(
        "delivered {delivered} item(s); host saw calls: {}",
        host.call_names().join(", ")
    );

    Ok(())
}
