use std::path::Path;
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use skiload_core::{PhasePlan, RunConfig, TimeWindow};

use crate::cli::RunArgs;

/// On-disk run configuration. Every field is optional; unset fields keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_threads: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skier_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lift_count: Option<u32>,
    #[serde(rename = "resortID", skip_serializing_if = "Option::is_none")]
    pub resort_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ski_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_percent: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub request_timeout: Option<YamlDuration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warmup: Option<PhaseYaml>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak: Option<PhaseYaml>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<PhaseYaml>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct PhaseYaml {
    /// Inclusive `[low, high]` minute-of-day bounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_window: Option<[u32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writes_per_worker: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reads_per_worker: Option<u32>,
}

impl PhaseYaml {
    fn apply(&self, plan: &mut PhasePlan) {
        if let Some([low, high]) = self.time_window {
            plan.time_window = TimeWindow::new(low, high);
        }
        if let Some(v) = self.writes_per_worker {
            plan.writes_per_worker = v;
        }
        if let Some(v) = self.reads_per_worker {
            plan.reads_per_worker = v;
        }
    }
}

impl ConfigFile {
    pub(crate) fn apply(&self, cfg: &mut RunConfig) {
        if let Some(v) = &self.target {
            cfg.target = v.clone();
        }
        if let Some(v) = self.max_threads {
            cfg.max_threads = v;
        }
        if let Some(v) = self.skier_count {
            cfg.skier_count = v;
        }
        if let Some(v) = self.lift_count {
            cfg.lift_count = v;
        }
        if let Some(v) = &self.resort_id {
            cfg.resort_id = v.clone();
        }
        if let Some(v) = self.ski_day {
            cfg.ski_day = v;
        }
        if let Some(v) = self.trigger_percent {
            cfg.trigger_percent = v;
        }
        if let Some(v) = self.request_timeout {
            cfg.request_timeout = Some(v.into_inner());
        }
        if let Some(p) = &self.warmup {
            p.apply(&mut cfg.warmup);
        }
        if let Some(p) = &self.peak {
            p.apply(&mut cfg.peak);
        }
        if let Some(p) = &self.cooldown {
            p.apply(&mut cfg.cooldown);
        }
    }
}

pub(crate) fn parse_config_yaml(text: &str) -> anyhow::Result<ConfigFile> {
    serde_yaml::from_str(text).context("invalid config yaml")
}

pub(crate) async fn read_config_file(path: &Path) -> anyhow::Result<ConfigFile> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    parse_config_yaml(&text).with_context(|| format!("in {}", path.display()))
}

/// Defaults, then the config file, then CLI flags (which clap already merged with env vars).
pub(crate) fn resolve_run_config(file: Option<&ConfigFile>, args: &RunArgs) -> RunConfig {
    let mut cfg = RunConfig::default();
    if let Some(file) = file {
        file.apply(&mut cfg);
    }

    if let Some(v) = &args.target {
        cfg.target = v.clone();
    }
    if let Some(v) = args.threads {
        cfg.max_threads = v;
    }
    if let Some(v) = args.skiers {
        cfg.skier_count = v;
    }
    if let Some(v) = args.lifts {
        cfg.lift_count = v;
    }
    if let Some(v) = &args.resort {
        cfg.resort_id = v.clone();
    }
    if let Some(v) = args.day {
        cfg.ski_day = v;
    }
    if let Some(v) = args.trigger_percent {
        cfg.trigger_percent = v;
    }
    if let Some(v) = args.request_timeout {
        cfg.request_timeout = Some(v);
    }
    cfg
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct YamlDuration(Duration);

impl YamlDuration {
    fn into_inner(self) -> Duration {
        self.0
    }
}

impl Serialize for YamlDuration {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(self.0).to_string())
    }
}

impl<'de> Deserialize<'de> for YamlDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = YamlDuration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("duration as string (e.g. 5s, 500ms) or integer seconds")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v == 0 {
                    return Err(E::custom("duration must be positive"));
                }
                Ok(YamlDuration(Duration::from_secs(v)))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let v = u64::try_from(v).map_err(|_| E::custom("duration must be positive"))?;
                self.visit_u64(v)
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                let d = humantime::parse_duration(v).map_err(E::custom)?;
                if d.is_zero() {
                    return Err(E::custom("duration must be positive"));
                }
                Ok(YamlDuration(d))
            }
        }

        deserializer.deserialize_any(V)
    }
}
