// Configuration module
//
// YAML file with ${ENV_VAR} substitution, or environment variables only
// when no file is present. Loaded once at startup and shared read-only.

use regex::Regex;
use serde::Deserialize;
use std::path::Path;

use crate::constants::{
    DEFAULT_ADDRESS, DEFAULT_MAX_DIMENSION, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE,
    DEFAULT_PARTITION_KEY, DEFAULT_PORT, DEFAULT_THREADS, ENV_ADDRESS, ENV_IMAGES_BUCKET,
    ENV_MISSION_TABLE, ENV_PORT, ENV_REGION, MAX_PAGE_SIZE_LIMIT,
};
use crate::gateway::KeyLayout;
use crate::transform::{DimensionLimits, OutputPolicy, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_SOURCE_PIXELS};

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_threads() -> usize {
    DEFAULT_THREADS
}

fn default_partition_key() -> String {
    DEFAULT_PARTITION_KEY.to_string()
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_max_source_pixels() -> u64 {
    DEFAULT_MAX_SOURCE_PIXELS
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u32 {
    DEFAULT_MAX_PAGE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Worker threads for the HTTP service
    #[serde(default = "default_threads")]
    pub threads: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            threads: default_threads(),
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Missions table name
    pub table: String,
    /// Images bucket name
    pub bucket: String,
    /// AWS region; the SDK's default chain is used when absent
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override (LocalStack, MinIO, DynamoDB Local)
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_partition_key")]
    pub partition_key: String,
    #[serde(default)]
    pub image_key_layout: KeyLayout,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    #[serde(default)]
    pub output: OutputPolicy,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default = "default_max_dimension")]
    pub max_width: u32,
    #[serde(default = "default_max_dimension")]
    pub max_height: u32,
    /// Stored images with more pixels are refused before decoding
    #[serde(default = "default_max_source_pixels")]
    pub max_source_pixels: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            output: OutputPolicy::default(),
            jpeg_quality: default_jpeg_quality(),
            max_width: default_max_dimension(),
            max_height: default_max_dimension(),
            max_source_pixels: default_max_source_pixels(),
        }
    }
}

impl ImagesConfig {
    pub fn limits(&self) -> DimensionLimits {
        DimensionLimits {
            max_width: self.max_width,
            max_height: self.max_height,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_count: u32,
    #[serde(default = "default_max_page_size")]
    pub max_count: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_count: default_page_size(),
            max_count: default_max_page_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        let mut missing = Vec::new();
        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| {
                missing.push(caps[1].to_string());
                String::new()
            })
        });
        if let Some(var_name) = missing.first() {
            return Err(format!(
                "Environment variable '{}' is referenced but not set",
                var_name
            ));
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Build configuration from the process environment
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| format!("Environment variable '{}' is not set", name))
        };

        let mut server = ServerConfig::default();
        if let Some(address) = lookup(ENV_ADDRESS).filter(|v| !v.is_empty()) {
            server.address = address;
        }
        if let Some(port) = lookup(ENV_PORT).filter(|v| !v.is_empty()) {
            server.port = port
                .parse()
                .map_err(|_| format!("{} must be a port number, got '{}'", ENV_PORT, port))?;
        }

        Ok(Config {
            server,
            store: StoreConfig {
                table: required(ENV_MISSION_TABLE)?,
                bucket: required(ENV_IMAGES_BUCKET)?,
                region: lookup(ENV_REGION).filter(|v| !v.is_empty()),
                endpoint: None,
                partition_key: default_partition_key(),
                image_key_layout: KeyLayout::default(),
            },
            images: ImagesConfig::default(),
            pagination: PaginationConfig::default(),
            logging: LoggingConfig::default(),
        })
    }

    /// Load `path` if it exists, else fall back to the environment
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Self::from_env()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.store.table.trim().is_empty() {
            return Err("store.table cannot be empty".to_string());
        }
        if self.store.bucket.trim().is_empty() {
            return Err("store.bucket cannot be empty".to_string());
        }
        if self.store.partition_key.trim().is_empty() {
            return Err("store.partition_key cannot be empty".to_string());
        }
        if self.server.port == 0 {
            return Err("server.port must be greater than 0".to_string());
        }
        if self.server.threads == 0 {
            return Err("server.threads must be greater than 0".to_string());
        }
        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(format!(
                "images.jpeg_quality must be within 1..=100, got {}",
                self.images.jpeg_quality
            ));
        }
        if self.images.max_width == 0 || self.images.max_height == 0 {
            return Err("images.max_width and images.max_height must be greater than 0".to_string());
        }
        if self.images.max_source_pixels == 0 {
            return Err("images.max_source_pixels must be greater than 0".to_string());
        }
        if !(1..=MAX_PAGE_SIZE_LIMIT).contains(&self.pagination.max_count) {
            return Err(format!(
                "pagination.max_count must be within 1..={}, got {}",
                MAX_PAGE_SIZE_LIMIT, self.pagination.max_count
            ));
        }
        if !(1..=self.pagination.max_count).contains(&self.pagination.default_count) {
            return Err(format!(
                "pagination.default_count must be within 1..={}, got {}",
                self.pagination.max_count, self.pagination.default_count
            ));
        }
        Ok(())
    }
}
