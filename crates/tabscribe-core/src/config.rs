use crate::engine::executor::{default_fallbacks, ModelFallbacks};
use crate::errors::ConfigError;
use crate::model::ChatRequest;
use crate::template::safe_substitute;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub mod path_resolver;
pub mod runtime;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;

pub const SCHEMA_DEFINITION_VAR: &str = "schema_definition";

/// Registry compiled into the binary, used when no config file is given.
pub const BUILTIN_DATASETS: &str = include_str!("../../../datasets.yaml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetsConfig {
    pub version: u32,
    #[serde(default = "default_fallbacks")]
    pub fallbacks: ModelFallbacks,
    pub datasets: Vec<DatasetSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub id: String,
    pub data_path: String,
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default)]
    pub schema_definition: String,
    #[serde(default)]
    pub units: Units,
    pub request: ChatRequest,
}

fn default_output_path() -> String {
    "cache".to_string()
}

/// Tables making up a dataset, in processing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Units {
    /// `phase_<P>_<S>` for every phase, then every split.
    Phases {
        phases: Vec<String>,
        splits: Vec<String>,
    },
    Tables { tables: Vec<String> },
}

impl Default for Units {
    fn default() -> Self {
        Units::Tables {
            tables: vec!["data".to_string()],
        }
    }
}

impl Units {
    pub fn names(&self) -> Vec<String> {
        match self {
            Units::Phases { phases, splits } => phases
                .iter()
                .flat_map(|p| splits.iter().map(move |s| format!("phase_{}_{}", p, s)))
                .collect(),
            Units::Tables { tables } => tables.clone(),
        }
    }
}

impl DatasetSpec {
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_path)
    }

    /// Where the result streams of every unit live.
    pub fn output_dir(&self) -> PathBuf {
        self.data_dir().join(&self.output_path)
    }

    /// The request template with the schema definition filled in; `$linearization` stays.
    pub fn request_template(&self) -> ChatRequest {
        let mut req = self.request.clone();
        if let Some(last) = req.messages.last_mut() {
            last.content = safe_substitute(
                &last.content,
                &[(SCHEMA_DEFINITION_VAR, &self.schema_definition)],
            );
        }
        req
    }
}

pub fn load_config(path: &Path, strict: bool) -> Result<DatasetsConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let mut cfg = parse_config(&raw, strict)
        .map_err(|e| ConfigError(format!("{} (file: {})", e, path.display())))?;
    normalize_paths(&mut cfg, path);
    Ok(cfg)
}

pub fn builtin_config() -> Result<DatasetsConfig, ConfigError> {
    parse_config(BUILTIN_DATASETS, true)
}

pub fn parse_config(raw: &str, strict: bool) -> Result<DatasetsConfig, ConfigError> {
    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);
    let cfg: DatasetsConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    // anchors-only sections
    let meaningful_unknowns: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with("x-") && !k.starts_with('_'))
        .collect();
    if !meaningful_unknowns.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "Unknown fields detected in strict mode: {:?}",
                meaningful_unknowns
            )));
        }
        tracing::warn!(fields = ?meaningful_unknowns, "ignored unknown config fields");
    }

    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &DatasetsConfig) -> Result<(), ConfigError> {
    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    if cfg.datasets.is_empty() {
        return Err(ConfigError("config has no datasets".into()));
    }

    let mut seen = HashSet::new();
    for ds in &cfg.datasets {
        if !seen.insert(ds.id.as_str()) {
            return Err(ConfigError(format!("duplicate dataset id '{}'", ds.id)));
        }
        if ds.request.messages.is_empty() {
            return Err(ConfigError(format!(
                "dataset '{}': request needs at least one message",
                ds.id
            )));
        }
        if ds.units.names().is_empty() {
            return Err(ConfigError(format!("dataset '{}': no units to process", ds.id)));
        }
    }
    Ok(())
}

fn normalize_paths(cfg: &mut DatasetsConfig, config_path: &Path) {
    let r = path_resolver::PathResolver::new(config_path);
    for ds in &mut cfg.datasets {
        r.resolve_str(&mut ds.data_path);
    }
}

/// Picks the requested datasets in the given order; an empty request means all of them.
pub fn select_datasets<'a>(
    cfg: &'a DatasetsConfig,
    tasks: &[String],
) -> Result<Vec<&'a DatasetSpec>, ConfigError> {
    if tasks.is_empty() {
        return Ok(cfg.datasets.iter().collect());
    }

    tasks
        .iter()
        .map(|task| {
            cfg.datasets.iter().find(|d| &d.id == task).ok_or_else(|| {
                let hint = closest_id(cfg, task)
                    .map(|s| format!(" (did you mean '{}'?)", s))
                    .unwrap_or_default();
                ConfigError(format!("unknown dataset '{}'{}", task, hint))
            })
        })
        .collect()
}

fn closest_id<'a>(cfg: &'a DatasetsConfig, task: &str) -> Option<&'a str> {
    cfg.datasets
        .iter()
        .map(|d| (strsim::jaro_winkler(&d.id, task), d.id.as_str()))
        .filter(|(score, _)| *score > 0.8)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, id)| id)
}

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, BUILTIN_DATASETS)
        .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
