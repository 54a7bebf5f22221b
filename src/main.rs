mod agent;
mod alarm;
mod reminder;

#[cfg(test)]
mod testing;

use agent::Agent;
use alarm::AlarmScheduler;
use clap::{Parser, Subcommand};
use medbot_channels::{console::ConsoleChannel, telegram::TelegramChannel};
use medbot_core::{
    config::{self, Config, RuntimeFlavor, Transport},
    traits::{ChatGateway, RecipientResolver},
};
use reminder::{EngineSettings, ReminderEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(name = "medbot", version, about = "MedBot: medication reminder chat agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the reminder agent.
    Start,
    /// Validate the config and show the next alarm.
    Status,
    /// Send a one-off message to the recipient.
    Send {
        /// The message to send.
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Commands::Start => {
            cfg.validate()?;
            let _guard = init_logging(&cfg)?;
            build_runtime(cfg.runtime.flavor)?.block_on(start(cfg))
        }
        Commands::Status => status(&cli.config, &cfg),
        Commands::Send { message } => {
            if message.is_empty() {
                anyhow::bail!("no message provided. Usage: medbot send <message>");
            }
            cfg.validate()?;
            let _guard = init_logging(&cfg)?;
            build_runtime(cfg.runtime.flavor)?.block_on(send(cfg, message.join(" ")))
        }
    }
}

/// Terminal logs go to stderr so the console transport owns stdout.
fn init_logging(cfg: &Config) -> anyhow::Result<WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = PathBuf::from(config::shellexpand(&cfg.medbot.data_dir)).join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "medbot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.medbot.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

fn build_runtime(flavor: RuntimeFlavor) -> std::io::Result<tokio::runtime::Runtime> {
    let mut builder = match flavor {
        RuntimeFlavor::CurrentThread => tokio::runtime::Builder::new_current_thread(),
        RuntimeFlavor::MultiThread => tokio::runtime::Builder::new_multi_thread(),
    };
    builder.enable_all().build()
}

/// Build the configured transport, as gateway and as resolver.
fn build_transport(cfg: &Config) -> (Arc<dyn ChatGateway>, Arc<dyn RecipientResolver>) {
    match cfg.channel.transport {
        Transport::Telegram => {
            let tg = cfg.channel.telegram.clone().unwrap_or_default();
            let channel = Arc::new(TelegramChannel::new(tg));
            let gateway: Arc<dyn ChatGateway> = channel.clone();
            let resolver: Arc<dyn RecipientResolver> = channel;
            (gateway, resolver)
        }
        Transport::Console => {
            let channel = Arc::new(ConsoleChannel::new(cfg.channel.console.clone()));
            let gateway: Arc<dyn ChatGateway> = channel.clone();
            let resolver: Arc<dyn RecipientResolver> = channel;
            (gateway, resolver)
        }
    }
}

async fn start(cfg: Config) -> anyhow::Result<()> {
    let (gateway, resolver) = build_transport(&cfg);
    let settings = EngineSettings::from_config(&cfg)?;
    let scheduler = AlarmScheduler::from_config(&cfg.reminder)?;
    let engine = Arc::new(ReminderEngine::new(settings, gateway.clone(), resolver));

    info!(
        "{} starting ({} transport, {:?} runtime)",
        cfg.medbot.name,
        cfg.channel.transport.display_name(),
        cfg.runtime.flavor
    );

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => shutdown.cancel(),
                Err(e) => warn!("failed to listen for ctrl-c: {e}"),
            }
        }
    });

    Agent::new(engine, scheduler, gateway).run(shutdown).await?;
    Ok(())
}

fn status(path: &str, cfg: &Config) -> anyhow::Result<()> {
    println!("{} status\n", cfg.medbot.name);
    println!("Config: {path}");
    println!("Transport: {}", cfg.channel.transport.display_name());
    println!("Recipient: {}", cfg.reminder.recipient);
    println!(
        "Retries: {} every {}s",
        cfg.reminder.max_retries, cfg.reminder.retry_interval_secs
    );
    println!();

    match cfg.validate() {
        Ok(()) => println!("  config: ok"),
        Err(e) => {
            println!("  config: {e}");
            return Ok(());
        }
    }

    let scheduler = AlarmScheduler::from_config(&cfg.reminder)?;
    let now = chrono::Local::now().naive_local();
    let wait = scheduler.duration_until_next(now).as_secs();
    println!(
        "  next alarm: {} (in {}h {:02}m)",
        scheduler.next_fire(now).format("%Y-%m-%d %H:%M"),
        wait / 3600,
        (wait % 3600) / 60
    );
    Ok(())
}

async fn send(cfg: Config, text: String) -> anyhow::Result<()> {
    let (gateway, _) = build_transport(&cfg);
    gateway.send_message(&cfg.reminder.recipient, &text).await?;
    info!("sent one-off message to {}", cfg.reminder.recipient);
    Ok(())
}
