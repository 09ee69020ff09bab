use analytics_dashboard::bootstrap;
use analytics_dashboard::config::{ConfigLoader, DashboardConfig, DashboardOptions};
use analytics_dashboard::controller::{ControlEvent, DashboardController};
use analytics_dashboard::output::console::ConsoleSink;
use analytics_dashboard::output::{FrameSink, RenderedFrame};
use analytics_dashboard::page::{self, Variant};
use analytics_dashboard::render;
use analytics_dashboard::snapshot::Snapshot;
use chrono::Utc;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

#[derive(Parser)]
#[command(name = "analytics-dashboard")]
#[command(version = "0.1.0")]
#[command(about = "Live analytics dashboard renderer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the analytics API and render every dashboard found in the page
    Run {
        /// Path to the configuration file (JSON/YAML/TOML)
        #[arg(short, long)]
        config: PathBuf,

        /// Show a refresh status spinner (stderr)
        #[arg(short, long, default_value_t = false)]
        progress: bool,
    },
    /// Render a saved snapshot into a page once
    Render {
        /// HTML page holding the dashboard markup
        #[arg(short = 'p', long = "page")]
        page_path: PathBuf,

        /// Snapshot JSON as returned by the `/stats` endpoint
        #[arg(short, long)]
        snapshot: PathBuf,

        #[arg(long, value_enum, default_value_t = Variant::Full)]
        variant: Variant,
    },
    /// Validate a configuration file and list the dashboards it would run
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let level = logger.filter();
    let multi = Arc::new(indicatif::MultiProgress::new());

    match cli.command {
        Commands::Run { config, progress } => {
            let bootstrap_config = ConfigLoader::load(&config)?;
            let progress = progress || bootstrap_config.progress;

            if progress {
                indicatif_log_bridge::LogWrapper::new((*multi).clone(), logger).try_init()?;
            } else {
                log::set_boxed_logger(Box::new(logger))?;
            }
            log::set_max_level(level);

            log::info!("Loaded config from {:?}", config);
            let html = std::fs::read_to_string(&bootstrap_config.page)?;
            let regions = bootstrap::discover(&html);
            if regions.is_empty() {
                anyhow::bail!("No analytics dashboard found in {}", bootstrap_config.page);
            }

            let sink_multi = progress.then(|| multi.clone());
            let sink = Arc::new(Mutex::new(ConfigLoader::create_sink(
                &bootstrap_config,
                sink_multi,
            )?));

            let mut controllers = Vec::new();
            let mut control_senders = Vec::new();
            let mut tasks = Vec::new();
            let mut init_tasks = Vec::new();

            for region in regions {
                let options = bootstrap::options_for(&bootstrap_config, region.variant).clone();
                let controller = Arc::new(bootstrap::controller_for(region, &options)?);
                tasks.push(spawn_frame_publisher(controller.clone(), sink.clone()));

                let (tx, rx) = mpsc::channel(16);
                init_tasks.push(bootstrap::spawn_instance(controller.clone(), rx));

                control_senders.push(tx);
                controllers.push(controller);
            }

            if progress {
                let pb = multi.add(ProgressBar::new_spinner());
                pb.set_style(
                    ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
                );
                pb.enable_steady_tick(Duration::from_millis(120));
                tasks.push(spawn_status_line(pb, controllers.clone()));
            }

            tasks.push(tokio::spawn(forward_stdin_controls(control_senders)));

            log::info!("Running {} dashboard(s); type `refresh` or `range <1h|24h|7d|30d|90d>`", controllers.len());
            tokio::signal::ctrl_c().await?;
            log::info!("Shutting down...");

            for task in &tasks {
                task.abort();
            }
            for task in &init_tasks {
                task.abort();
            }
            for controller in &controllers {
                controller.shutdown();
            }
            sink.lock().await.close().await?;

            for controller in &controllers {
                let stats = controller.get_stats();
                println!("\n✅ {} stopped:", controller.name());
                println!("   Refreshes: {} ({} skipped)", stats.requested, stats.skipped);
                println!(
                    "   Rendered: {} | No data: {} | Failed: {}",
                    stats.succeeded, stats.no_data, stats.failed
                );
                println!("   Success Rate: {:.1}%", stats.success_rate);
                println!("   Average Fetch: {}ms", stats.avg_fetch_time_ms);
            }
        }
        Commands::Render {
            page_path,
            snapshot,
            variant,
        } => {
            log::set_boxed_logger(Box::new(logger))?;
            log::set_max_level(level);

            let html = std::fs::read_to_string(&page_path)?;
            let mut region = page::bind(&html, variant).inspect_err(|e| {
                log::error!("Analytics dashboard container not found ({})", e);
            })?;
            let config = DashboardConfig::resolve(&DashboardOptions::default(), &region.attributes)?;

            let body = std::fs::read_to_string(&snapshot)?;
            let data: Option<Snapshot> = serde_json::from_str(&body)?;

            let (outcome, errors) = match render::render(&mut region.view, data.as_ref(), Utc::now()) {
                Ok(()) => ("rendered", Vec::new()),
                Err(e) => ("no_data", vec![e.to_string()]),
            };

            let frame = RenderedFrame::capture(
                variant.name(),
                config.time_range.as_str(),
                outcome,
                &region.view,
                errors,
            );
            ConsoleSink::default().write(&frame).await?;
        }
        Commands::Check { config } => {
            log::set_boxed_logger(Box::new(logger))?;
            log::set_max_level(level);

            let bootstrap_config = match ConfigLoader::load(&config) {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!("❌ Config error: {}", e);
                    std::process::exit(1);
                }
            };

            let html = std::fs::read_to_string(&bootstrap_config.page)?;
            let regions = bootstrap::discover(&html);

            println!("✅ Config is valid:");
            println!("   Page: {}", bootstrap_config.page);
            println!("   Dashboards: {}", regions.len());
            for region in &regions {
                let options = bootstrap::options_for(&bootstrap_config, region.variant);
                match DashboardConfig::resolve(options, &region.attributes) {
                    Ok(resolved) => println!(
                        "   - {}: {} shop={:?} range={} every {}s",
                        region.variant,
                        resolved.endpoint,
                        resolved.shop_id,
                        resolved.time_range,
                        resolved.refresh_interval_secs
                    ),
                    Err(e) => println!("   - {}: ❌ {}", region.variant, e),
                }
            }
        }
    }

    Ok(())
}

/// Publishes the view after every completed refresh of `controller`.
fn spawn_frame_publisher(
    controller: Arc<DashboardController>,
    sink: Arc<Mutex<Box<dyn FrameSink>>>,
) -> JoinHandle<()> {
    let mut completed = controller.watch_completed();
    tokio::spawn(async move {
        while completed.changed().await.is_ok() {
            let Some(done) = completed.borrow_and_update().clone() else {
                continue;
            };
            let frame = controller.frame(&done.outcome);
            if let Err(e) = sink.lock().await.write(&frame).await {
                log::error!("Failed to write frame for {}: {}", controller.name(), e);
            }
        }
    })
}

fn spawn_status_line(pb: ProgressBar, controllers: Vec<Arc<DashboardController>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(500));
        loop {
            interval.tick().await;
            let message = controllers
                .iter()
                .map(|c| {
                    let stats = c.get_stats();
                    format!(
                        "{} [{}]: {} ok / {} failed / {} skipped",
                        c.name(),
                        c.config().time_range,
                        stats.succeeded,
                        stats.failed,
                        stats.skipped
                    )
                })
                .collect::<Vec<_>>()
                .join(" | ");
            pb.set_message(message);
        }
    })
}

/// Turns stdin lines into control events for every dashboard.
async fn forward_stdin_controls(senders: Vec<mpsc::Sender<ControlEvent>>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let words: Vec<&str> = line.split_whitespace().collect();
        let event = match words.as_slice() {
            [] => continue,
            ["refresh"] | ["r"] => ControlEvent::RefreshClicked,
            ["range", value] => ControlEvent::TimeRangeChanged(value.to_string()),
            _ => {
                log::warn!("Unknown command {:?}, try `refresh` or `range 7d`", line);
                continue;
            }
        };
        for tx in &senders {
            let _ = tx.send(event.clone()).await;
        }
    }
}
