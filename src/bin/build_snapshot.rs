use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wind_blender::config::SnapshotConfig;
use wind_blender::snapshot::{
    build_snapshot, write_snapshot, OpenMeteoClient, SnapshotLocation, MODEL_SPECS,
};

#[derive(Parser)]
#[command(name = "build-snapshot")]
#[command(about = "Fetch hourly wind forecasts from Open-Meteo and write a snapshot document", long_about = None)]
struct Cli {
    /// Output file
    #[arg(long, env = "SNAPSHOT_OUTPUT")]
    output: Option<String>,

    /// Location name recorded in the snapshot
    #[arg(long, env = "SNAPSHOT_LOCATION")]
    location: Option<String>,

    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true, env = "SNAPSHOT_LATITUDE")]
    latitude: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true, env = "SNAPSHOT_LONGITUDE")]
    longitude: Option<f64>,

    /// Days of forecast to request
    #[arg(long, env = "SNAPSHOT_FORECAST_DAYS")]
    forecast_days: Option<u32>,

    /// Open-Meteo base URL
    #[arg(long, env = "OPEN_METEO_URL")]
    api_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = SnapshotConfig::from_env()?;
    if let Some(output) = cli.output {
        config.output_path = output;
    }
    if let Some(location) = cli.location {
        config.location = location;
    }
    if let Some(latitude) = cli.latitude {
        config.latitude = latitude;
    }
    if let Some(longitude) = cli.longitude {
        config.longitude = longitude;
    }
    if let Some(days) = cli.forecast_days {
        config.forecast_days = days;
    }
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }

    println!(
        "Building snapshot for {} ({}, {})",
        config.location, config.latitude, config.longitude
    );

    let client = OpenMeteoClient::new(&config)?;
    let location = SnapshotLocation {
        name: config.location.clone(),
        latitude: config.latitude,
        longitude: config.longitude,
    };

    let pb = ProgressBar::new(MODEL_SPECS.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} models ({msg})")?
            .progress_chars("##-"),
    );

    let forecast = build_snapshot(&client, &location, |spec, ok| {
        pb.set_message(format!("{} {}", spec.id, if ok { "ok" } else { "failed" }));
        pb.inc(1);
    })
    .await;
    pb.finish_and_clear();

    let forecast = forecast?;
    write_snapshot(&forecast, &config.output_path).await?;
    info!("Snapshot written to {}", config.output_path);

    let meta = forecast.meta.as_ref();
    let models = meta.and_then(|m| m.models.clone()).unwrap_or_default();
    println!("OK models: {}", models.join(", "));
    if let Some(meta) = meta {
        for (model, alias) in &meta.aliases {
            println!("  using alias {model}: {alias}");
        }
    }
    println!("{} hours written to {}", forecast.hours.len(), config.output_path);

    Ok(())
}
