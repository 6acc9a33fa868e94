use crate::bounds::BoundSpec;
use crate::partition::{EntrySpec, PartKey, PartitionError};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct GenomeSettings {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub name: Option<String>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub progress: bool,
}

fn default_seed() -> u64 {
    0
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartitionEntryConfig {
    pub name: String,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub end: Option<usize>,
}

impl PartitionEntryConfig {
    /// Maps the optional fields onto the construction sugar: both offsets
    /// give a full span, an end alone continues from the previous entry, and
    /// neither claims the remainder.
    pub fn to_spec(&self) -> Result<EntrySpec, PartitionError> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Ok(EntrySpec::span(self.name.clone(), start, end)),
            (None, Some(end)) => Ok(EntrySpec::up_to(self.name.clone(), end)),
            (None, None) => Ok(EntrySpec::rest(self.name.clone())),
            (Some(_), None) => Err(PartitionError::InvalidSpec(format!(
                "entry {:?} has a start but no end",
                self.name
            ))),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum BoundConfig {
    Index(usize),
    Name(String),
}

impl BoundConfig {
    pub fn to_bound(&self) -> BoundSpec {
        match self {
            BoundConfig::Index(index) => BoundSpec::Index(*index),
            BoundConfig::Name(name) => BoundSpec::Name(name.clone()),
        }
    }

    pub fn to_key(&self) -> PartKey {
        match self {
            BoundConfig::Index(index) => PartKey::Index(*index),
            BoundConfig::Name(name) => PartKey::Name(name.clone()),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(tag = "op", rename_all_fields = "kebab-case")]
pub enum OpConfig {
    Mutate {
        ratio: f64,
        sigma: i32,
        #[serde(default)]
        bounds: Vec<BoundConfig>,
    },
    Geneswap {
        amount: usize,
        max_chunk: usize,
        #[serde(default)]
        bounds: Vec<BoundConfig>,
    },
    Invert {
        #[serde(default)]
        bounds: Vec<BoundConfig>,
    },
    Format {
        order: Vec<BoundConfig>,
    },
    Resize {
        target: BoundConfig,
        #[serde(default)]
        before: isize,
        #[serde(default)]
        after: isize,
    },
    Check {},
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct GenromConfig {
    pub genome: GenomeSettings,
    #[serde(default)]
    pub partition: Vec<PartitionEntryConfig>,
    #[serde(default)]
    pub ops: Vec<OpConfig>,
}

impl GenromConfig {
    pub fn load_from_file(path: &PathBuf) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config: GenromConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;

        Ok(config)
    }
}
