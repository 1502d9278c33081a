use std::str::FromStr;

use anyhow::{Context, Result};
use auto_clicker::config::{format_duration, parse_duration};
use auto_clicker::{
    ClickAction, ClickConfig, ClickLoop, EnigoBackend, HotkeyBinding, HotkeyController,
    LoopStatus, MouseButton, Profile, StopReason,
};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "aclk",
    version,
    about = "Cross-platform auto clicker with global start/stop hotkeys"
)]
struct Cli {
    /// Delay between click cycles (e.g. 100ms, 2s).
    #[arg(short, long, default_value = "100ms")]
    interval: String,

    /// Mouse button to click: left, right or middle.
    #[arg(short, long, default_value = "left", conflicts_with = "keys")]
    button: String,

    /// Tap a key chord instead of clicking (e.g. space, ctrl+shift+p).
    #[arg(short, long)]
    keys: Option<String>,

    /// Dispatch double clicks.
    #[arg(long, conflicts_with = "keys")]
    double: bool,

    /// Random cadence spread of up to +/- this much per cycle.
    #[arg(long, default_value = "0ms")]
    jitter: String,

    /// Actions per cycle.
    #[arg(long, default_value_t = 1)]
    burst: u32,

    /// Stop automatically after this many actions.
    #[arg(long)]
    limit: Option<u64>,

    /// Countdown before the first cycle.
    #[arg(long, default_value = "0s")]
    start_delay: String,

    /// Global hotkey that starts clicking.
    #[arg(long, default_value = "f6")]
    start_hotkey: String,

    /// Global hotkey that stops clicking.
    #[arg(long, default_value = "f7")]
    stop_hotkey: String,

    /// Load settings from a JSON profile instead of the flags above.
    #[arg(short, long)]
    profile: Option<String>,

    /// Write the effective settings to a JSON profile and exit.
    #[arg(long)]
    save_profile: Option<String>,

    /// Start clicking immediately instead of waiting for the hotkey.
    #[arg(long)]
    immediate: bool,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn profile(&self) -> Result<Profile> {
        if let Some(path) = &self.profile {
            return Ok(Profile::from_file(path)?);
        }

        let action = match &self.keys {
            Some(keys) => ClickAction::KeyPress { keys: keys.clone() },
            None => ClickAction::MouseClick {
                button: MouseButton::from_str(&self.button)?,
                double: self.double,
            },
        };
        let profile = Profile {
            click: ClickConfig {
                action,
                interval: parse_duration(&self.interval)?,
                jitter: parse_duration(&self.jitter)?,
                burst: self.burst,
                start_delay: parse_duration(&self.start_delay)?,
                limit: self.limit,
            },
            hotkeys: HotkeyBinding {
                start: self.start_hotkey.clone(),
                stop: self.stop_hotkey.clone(),
            },
        };
        profile.validate()?;
        Ok(profile)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let profile = cli.profile()?;

    if let Some(path) = &cli.save_profile {
        profile.save_to_file(path)?;
        println!("{} profile saved to {path}", "✔".green());
        return Ok(());
    }

    let backend = EnigoBackend::new()?;
    let clicker = ClickLoop::new(backend, profile.click.clone())?;

    let mut hotkeys = HotkeyController::new()?;
    let start = clicker.clone();
    let stop = clicker.clone();
    hotkeys.register(&profile.hotkeys, move || start.start(), move || stop.stop())?;

    println!(
        "{} {} every {} — press {} to start, {} to stop, ctrl-c to quit",
        "▶".green().bold(),
        profile.click.action.describe(),
        format_duration(&profile.click.interval),
        profile.hotkeys.start.to_uppercase().cyan().bold(),
        profile.hotkeys.stop.to_uppercase().cyan().bold(),
    );

    let mut status_rx = clicker.subscribe_status();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            match status {
                LoopStatus::Idle => {}
                LoopStatus::Countdown => println!("{} starting shortly...", "…".yellow()),
                LoopStatus::Running => println!("{} clicking", "▶".green()),
                LoopStatus::Stopped(StopReason::Requested) => {
                    println!("{} stopped", "⏸".yellow());
                }
                LoopStatus::Stopped(StopReason::LimitReached) => {
                    println!("{} click limit reached", "⏹".yellow());
                }
                LoopStatus::Stopped(StopReason::Failure(reason)) => {
                    println!("{} {reason}", "✖".red().bold());
                }
            }
        }
    });

    if cli.immediate {
        clicker.start();
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    clicker.stop();
    hotkeys.unregister()?;
    println!("{} {} actions dispatched", "∑".bold(), clicker.clicks());
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "auto_clicker=debug"
    } else {
        "auto_clicker=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
