/// Crisis Monitor - volume ceiling enforcement host
///
/// Drives the ceiling enforcer against a simulated device and exposes the
/// ceiling, preset, and diagnostic surfaces on the command line.
use clap::{Parser, Subcommand};
use crisis_core::clock::SystemClock;
use crisis_core::types::{level_to_percent, percent_to_level, CreatePreset, DeviceClass};
use crisis_enforcer::sim::{SimConfig, SimDevice};
use crisis_enforcer::{
    CeilingEnforcer, DirectSetOutcome, EnforcerEvent, SampleSource, TestToneSource,
};
use crisis_storage::diagnostics::{self, Severity};
use crisis_storage::{presets, profiles, settings};
use rand::Rng;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use crate::config::MonitorConfig;

/// Diagnostics rows kept after each run
const DIAGNOSTICS_KEEP: i64 = 500;

#[derive(Parser)]
#[command(name = "crisis-monitor")]
#[command(about = "Volume Crisis enforcement monitor", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the enforcer against the simulated device
    Run {
        /// How long to run, in seconds
        #[arg(short, long, default_value_t = 30)]
        duration: u64,
    },
    /// Print the persisted volume ceiling
    Ceiling,
    /// Set the volume ceiling (percent, 0-100)
    SetCeiling {
        /// New ceiling as a percentage
        percent: u8,
    },
    /// List presets of a profile (created if missing)
    Presets {
        /// Profile name
        #[arg(short, long, default_value = "Default")]
        profile: String,
    },
    /// Save a preset
    AddPreset {
        /// Preset name
        name: String,
        /// Level as a percentage
        percent: u8,
        /// Profile name
        #[arg(short, long, default_value = "Default")]
        profile: String,
    },
    /// Apply a preset through a short simulated session
    ApplyPreset {
        /// Preset name
        name: String,
        /// Profile name
        #[arg(short, long, default_value = "Default")]
        profile: String,
    },
    /// Show recent diagnostics
    Diag {
        /// Maximum entries to print
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },
    /// Render an audition tone at a level and report its peak
    Tone {
        /// Level as a percentage
        percent: u8,
        /// Tone duration in milliseconds
        #[arg(short, long, default_value_t = 500)]
        millis: u64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crisis_monitor=info,enforcement=info,actuator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = MonitorConfig::load(cli.config.as_deref())?;

    let pool = crisis_storage::create_pool(&config.storage.database_url).await?;
    crisis_storage::run_migrations(&pool).await?;

    match cli.command {
        Commands::Run { duration } => {
            run(&config, &pool, Duration::from_secs(duration)).await?;
        }
        Commands::Ceiling => {
            let ceiling = settings::load_ceiling(&pool).await?;
            println!("ceiling: {}%", level_to_percent(ceiling));
        }
        Commands::SetCeiling { percent } => {
            settings::store_ceiling(&pool, percent_to_level(percent)).await?;
            println!("ceiling set to {}%", percent.min(100));
        }
        Commands::Presets { profile } => {
            let profile = find_or_create_profile(&pool, &profile).await?;
            let list = presets::get_for_profile(&pool, profile.id).await?;
            if list.is_empty() {
                println!("no presets in profile '{}'", profile.name);
            }
            for preset in list {
                println!("{}: {}%", preset.name, level_to_percent(preset.level));
            }
        }
        Commands::AddPreset {
            name,
            percent,
            profile,
        } => {
            let profile = find_or_create_profile(&pool, &profile).await?;
            let preset = presets::create(
                &pool,
                CreatePreset {
                    profile_id: profile.id,
                    name,
                    level: percent_to_level(percent),
                },
            )
            .await?;
            println!(
                "saved '{}' at {}%",
                preset.name,
                level_to_percent(preset.level)
            );
        }
        Commands::ApplyPreset { name, profile } => {
            apply_preset(&config, &pool, &profile, &name).await?;
        }
        Commands::Diag { limit } => {
            for entry in diagnostics::recent(&pool, limit).await? {
                println!(
                    "[{}] {} {}: {}",
                    entry.created_at,
                    entry.severity.as_str(),
                    entry.category,
                    entry.message
                );
            }
        }
        Commands::Tone { percent, millis } => {
            audition_tone(percent, Duration::from_millis(millis));
        }
    }

    Ok(())
}

fn build_device(config: &MonitorConfig) -> SimDevice {
    SimDevice::new(SimConfig {
        initial_level: config.sim.initial_level,
        discovery_failures: config.sim.discovery_failures,
        inert: config.sim.inert,
        ..SimConfig::default()
    })
}

async fn build_enforcer(
    config: &MonitorConfig,
    pool: &SqlitePool,
    device: &SimDevice,
) -> anyhow::Result<CeilingEnforcer> {
    let ceiling = settings::load_ceiling(pool).await?;
    let class = DeviceClass::classify(config.device.form_factor);

    Ok(CeilingEnforcer::new(
        config.enforcer.clone(),
        class,
        ceiling,
        Box::new(device.actuator()),
        Box::new(device.keepalive()),
        Box::new(SystemClock),
    ))
}

async fn run(config: &MonitorConfig, pool: &SqlitePool, duration: Duration) -> anyhow::Result<()> {
    let device = build_device(config);
    let mut enforcer = build_enforcer(config, pool, &device).await?;

    tracing::info!(
        ceiling = enforcer.ceiling(),
        class = %enforcer.device_class(),
        "monitoring for {:?}",
        duration
    );

    enforcer.start();

    let mut rng = rand::thread_rng();
    let mut disturb =
        tokio::time::interval(Duration::from_millis(config.sim.disturb_interval_ms));
    disturb.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let end = tokio::time::Instant::now() + duration;

    loop {
        drain_events(&mut enforcer, pool).await?;

        let now = tokio::time::Instant::now();
        if now >= end {
            break;
        }

        let next = enforcer
            .next_deadline()
            .map_or(end, tokio::time::Instant::from_std)
            .min(end);

        tokio::select! {
            () = tokio::time::sleep_until(next) => {
                enforcer.run_due_tasks();
            }
            _ = disturb.tick() => {
                let level: f32 = rng.gen_range(0.0..=1.0);
                device.set_true_level(level);
                if rng.gen_bool(config.sim.push_reliability.clamp(0.0, 1.0)) {
                    enforcer.on_level_changed(level);
                } else {
                    // missed push; the fallback poll picks it up
                    tracing::debug!(target: "volume", level, "push dropped");
                }
            }
        }
    }

    enforcer.stop();
    drain_events(&mut enforcer, pool).await?;
    diagnostics::prune(pool, DIAGNOSTICS_KEEP).await?;

    let stats = enforcer.stats();
    println!(
        "done: {} enforced, {} failed, level {}%, ceiling {}%",
        stats.successes(),
        stats.failures(),
        enforcer.level_percent(),
        enforcer.ceiling_percent()
    );

    Ok(())
}

/// React to drained enforcer events: persist, record diagnostics, log
async fn drain_events(enforcer: &mut CeilingEnforcer, pool: &SqlitePool) -> anyhow::Result<()> {
    for event in enforcer.take_events() {
        match &event {
            EnforcerEvent::CeilingChanged { ceiling } => {
                settings::store_ceiling(pool, *ceiling).await?;
            }
            EnforcerEvent::EnforcementSucceeded { attempts, level } => {
                tracing::info!(attempts = *attempts, level = *level, "enforcement succeeded");
            }
            EnforcerEvent::EnforcementFailed { reason, level } => {
                diagnostics::append(
                    pool,
                    "enforcement",
                    Severity::Error,
                    &format!("enforcement failed ({reason:?}) at level {level:.2}"),
                )
                .await?;
            }
            EnforcerEvent::ActuatorDiscoveryExhausted { attempts } => {
                diagnostics::append(
                    pool,
                    "actuator",
                    Severity::Error,
                    &format!("actuator not found after {attempts} attempts"),
                )
                .await?;
            }
            EnforcerEvent::ActuatorInert { workaround } => {
                diagnostics::append(pool, "actuator", Severity::Error, workaround).await?;
                println!("volume enforcement unavailable: {workaround}");
            }
            EnforcerEvent::KeepAliveFailed { message } => {
                diagnostics::append(pool, "background", Severity::Warning, message).await?;
            }
            _ => {}
        }
        tracing::debug!(?event, "enforcer event");
    }
    Ok(())
}

/// Render the audition tone a real host would hand to its audio output
fn audition_tone(percent: u8, duration: Duration) {
    const SAMPLE_RATE: u32 = 44100;

    let mut source = TestToneSource::new(SAMPLE_RATE, percent_to_level(percent), duration);
    let mut buffer = vec![0.0f32; 4096];
    let mut peak = 0.0f32;
    let mut samples = 0usize;

    while !source.is_finished() {
        let read = source.read_samples(&mut buffer);
        if read == 0 {
            break;
        }
        samples += read;
        peak = buffer[..read].iter().fold(peak, |acc, s| acc.max(s.abs()));
    }

    println!(
        "tone: {}% for {:?}, {} frames, peak {:.3}",
        percent.min(100),
        duration,
        samples / 2,
        peak
    );
}

async fn find_or_create_profile(
    pool: &SqlitePool,
    name: &str,
) -> anyhow::Result<crisis_core::types::Profile> {
    let existing = profiles::get_all(pool)
        .await?
        .into_iter()
        .find(|p| p.name == name);

    Ok(match existing {
        Some(profile) => profile,
        None => profiles::create(pool, name).await?,
    })
}

async fn apply_preset(
    config: &MonitorConfig,
    pool: &SqlitePool,
    profile_name: &str,
    preset_name: &str,
) -> anyhow::Result<()> {
    let profile = find_or_create_profile(pool, profile_name).await?;
    let preset = presets::get_for_profile(pool, profile.id)
        .await?
        .into_iter()
        .find(|p| p.name == preset_name)
        .ok_or_else(|| anyhow::anyhow!("no preset '{preset_name}' in '{profile_name}'"))?;

    let device = build_device(config);
    let mut enforcer = build_enforcer(config, pool, &device).await?;
    enforcer.start();

    // Applying a preset is a direct set with the stored fraction
    match enforcer.request_level(preset.level) {
        DirectSetOutcome::Applied => {
            tokio::time::sleep(config.enforcer.settle_delay()).await;
            enforcer.run_due_tasks();
            println!(
                "applied '{}': level now {}%",
                preset.name,
                enforcer.level_percent()
            );
        }
        DirectSetOutcome::RefusedIncrease => {
            println!(
                "'{}' would raise the volume; this device only allows reductions",
                preset.name
            );
        }
        DirectSetOutcome::ActuatorUnavailable => {
            println!("volume control is not reachable right now");
        }
    }

    drain_events(&mut enforcer, pool).await?;
    Ok(())
}
