use crate::alignment::{AlignmentSettings, ToolSet};
use crate::api::{EngineError, EngineResult};
use crate::utils::external_tools::ToolCommand;
use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Root under which every job gets its own directory
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlignmentConfig {
    #[serde(default = "default_gate_threshold")]
    pub gate_threshold: f64,
    #[serde(default = "default_threads")]
    pub threads: u32,
    /// 0 disables the limit
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
}

/// Command lines for the external tools. Each entry is split on whitespace
/// into a program and leading arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolsConfig {
    #[serde(default = "default_bwa")]
    pub bwa: String,
    #[serde(default = "default_samtools")]
    pub samtools: String,
    #[serde(default = "default_freebayes")]
    pub freebayes: String,
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_workers() -> usize {
    2
}

fn default_gate_threshold() -> f64 {
    1.0
}

fn default_threads() -> u32 {
    4
}

fn default_stage_timeout_secs() -> u64 {
    3600
}

fn default_bwa() -> String {
    "bwa".to_string()
}

fn default_samtools() -> String {
    "samtools".to_string()
}

fn default_freebayes() -> String {
    "freebayes".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            results_dir: default_results_dir(),
            workers: default_workers(),
            alignment: AlignmentConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            gate_threshold: default_gate_threshold(),
            threads: default_threads(),
            stage_timeout_secs: default_stage_timeout_secs(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            bwa: default_bwa(),
            samtools: default_samtools(),
            freebayes: default_freebayes(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "seqlab", "seqlab-jobs")
}

impl EngineConfig {
    /// Location of the user config file, when a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from the user config dir, falling back to defaults when the
    /// file is missing or unreadable.
    pub fn load() -> Self {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                match Self::from_file(&config_path) {
                    Ok(config) => return config,
                    Err(e) => warn!("Ignoring {}: {}", config_path.display(), e),
                }
            }
        }
        EngineConfig::default()
    }

    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            EngineError::validation(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.workers == 0 {
            return Err(EngineError::validation("workers must be at least 1"));
        }
        if self.alignment.threads == 0 {
            return Err(EngineError::validation("alignment.threads must be at least 1"));
        }
        if !(0.0..=100.0).contains(&self.alignment.gate_threshold) {
            return Err(EngineError::validation(
                "alignment.gate_threshold must be a percentage",
            ));
        }
        for (name, command) in [
            ("bwa", &self.tools.bwa),
            ("samtools", &self.tools.samtools),
            ("freebayes", &self.tools.freebayes),
        ] {
            if command.trim().is_empty() {
                return Err(EngineError::validation(format!("tools.{} must not be empty", name)));
            }
        }
        Ok(())
    }

    pub fn save(&self) -> EngineResult<PathBuf> {
        let config_path = Self::default_path()
            .ok_or_else(|| EngineError::internal("no home directory for configuration"))?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> EngineResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| EngineError::internal(format!("could not encode config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn toolset(&self) -> ToolSet {
        ToolSet {
            bwa: parse_command(&self.tools.bwa),
            samtools: parse_command(&self.tools.samtools),
            freebayes: parse_command(&self.tools.freebayes),
        }
    }

    pub fn alignment_settings(&self) -> AlignmentSettings {
        AlignmentSettings {
            gate_threshold: self.alignment.gate_threshold,
            threads: self.alignment.threads,
            stage_timeout: match self.alignment.stage_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}

fn parse_command(line: &str) -> ToolCommand {
    let mut parts = line.split_whitespace();
    let program = parts.next().unwrap_or_default();
    ToolCommand::new(program).args(parts)
}
