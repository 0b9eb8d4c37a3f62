// Mon Oct 19 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// How secondary vtables that share a class name are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InterfacePolicyKind {
    #[default]
    SameNameMultipleInheritance,
    NeverMerge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_virtual_functions: usize,
    pub max_name_length: usize,
    pub worker_threads: usize,
    pub interface_policy: InterfacePolicyKind,
    pub printable_names_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_virtual_functions: 16384,
            max_name_length: 0x1000,
            worker_threads: num_cpus::get(),
            interface_policy: InterfacePolicyKind::default(),
            printable_names_only: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_virtual_functions(mut self, max: usize) -> Self {
        self.max_virtual_functions = max;
        self
    }

    pub fn with_max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    pub fn with_interface_policy(mut self, policy: InterfacePolicyKind) -> Self {
        self.interface_policy = policy;
        self
    }

    pub fn with_printable_names_only(mut self, enabled: bool) -> Self {
        self.printable_names_only = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_virtual_functions == 0 {
            return Err(ConfigError::Validation("max_virtual_functions must be > 0".to_string()));
        }
        if self.max_name_length == 0 {
            return Err(ConfigError::Validation("max_name_length must be > 0".to_string()));
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::Validation("worker_threads must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}
