use clap::{Parser, ValueEnum};
use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wind_blender::config::Config;
use wind_blender::loader::ForecastLoader;
use wind_blender::render::render_text;
use wind_blender::scheduler;
use wind_blender::services::{DashboardService, DashboardState};
use wind_blender::view::DashboardView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "wind-blender")]
#[command(about = "Blend multi-model wind forecasts into one hourly estimate", long_about = None)]
struct Cli {
    /// Snapshot to load: a local path or an http(s) URL
    #[arg(long, env = "FORECAST_SOURCE")]
    source: Option<String>,

    /// Number of upcoming hours in the table
    #[arg(long, env = "WINDOW_HOURS")]
    window: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Keep running and re-render periodically
    #[arg(long)]
    watch: bool,

    /// Minutes between refreshes in watch mode
    #[arg(long, env = "REFRESH_MINUTES")]
    refresh_minutes: Option<u64>,
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so the rendered dashboard owns stdout
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,wind_blender=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(source) = cli.source {
        config.forecast_source = source;
    }
    if let Some(window) = cli.window {
        config.window_hours = window;
    }
    if let Some(minutes) = cli.refresh_minutes {
        config.refresh_minutes = minutes;
    }
    info!("Starting wind blender with config: {:?}", config);

    let service = DashboardService::new(ForecastLoader::new()?, config.window_hours);
    let format = cli.format;

    if cli.watch {
        scheduler::start_refresh_loop(
            service,
            DashboardState::new(),
            config.forecast_source,
            config.refresh_minutes,
            |view| print_view(view, format),
        )
        .await;
        return Ok(());
    }

    let mut state = DashboardState::new();
    let view = service.refresh(&mut state, &config.forecast_source).await?;
    print_view(&view, format);
    Ok(())
}

fn print_view(view: &DashboardView, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", render_text(view)),
        OutputFormat::Json => match serde_json::to_string_pretty(view) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!("Failed to serialize dashboard: {}", e),
        },
    }
}
