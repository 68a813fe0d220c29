/// Monitor configuration
use crisis_core::types::FormFactor;
use crisis_enforcer::EnforcerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_device")]
    pub device: DeviceSettings,

    #[serde(default = "default_sim")]
    pub sim: SimSettings,

    #[serde(default)]
    pub enforcer: EnforcerConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceSettings {
    #[serde(default = "default_form_factor")]
    pub form_factor: FormFactor,
}

/// Simulated device behavior for `run`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimSettings {
    /// True output level when the simulation starts
    #[serde(default = "default_initial_level")]
    pub initial_level: f32,

    /// How often another "app" disturbs the volume (ms)
    #[serde(default = "default_disturb_interval_ms")]
    pub disturb_interval_ms: u64,

    /// Fraction of level changes the push channel actually delivers;
    /// the rest are left for the fallback poll to catch
    #[serde(default = "default_push_reliability")]
    pub push_reliability: f64,

    /// Discovery attempts that fail before the hidden control is found
    #[serde(default)]
    pub discovery_failures: u32,

    /// Simulate an inert actuator
    #[serde(default)]
    pub inert: bool,
}

fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_device() -> DeviceSettings {
    DeviceSettings {
        form_factor: default_form_factor(),
    }
}

fn default_sim() -> SimSettings {
    SimSettings {
        initial_level: default_initial_level(),
        disturb_interval_ms: default_disturb_interval_ms(),
        push_reliability: default_push_reliability(),
        discovery_failures: 0,
        inert: false,
    }
}

fn default_database_url() -> String {
    "sqlite://crisis.db".to_string()
}

fn default_form_factor() -> FormFactor {
    FormFactor::Phone
}

fn default_initial_level() -> f32 {
    0.5
}

fn default_disturb_interval_ms() -> u64 {
    3000
}

fn default_push_reliability() -> f64 {
    0.8
}

impl MonitorConfig {
    /// Load configuration from an optional TOML file plus `CRISIS_*`
    /// environment overrides
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();

        builder = match path {
            Some(path) => builder.add_source(config::File::with_name(path)),
            None => builder.add_source(config::File::with_name("crisis-monitor").required(false)),
        };

        let settings = builder
            .add_source(config::Environment::with_prefix("CRISIS").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
