//! Server configuration

use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use voxscreen_core::{Error, Result};

use crate::cli::Cli;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Classifier artifact loaded at start-up
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Where uploaded recordings are stored
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,

    /// Base URL of the links returned by `/recordings`
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// ffmpeg binary for formats the built-in decoders cannot read;
    /// `None` disables the fallback
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: Option<PathBuf>,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Cross-origin settings
    #[serde(default)]
    pub cors: CorsConfig,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        if let Some(model) = &cli.model {
            config.model_path = model.clone();
        }
        if let Some(uploads) = &cli.uploads {
            config.uploads_dir = uploads.clone();
        }
        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }
        if let Some(port) = cli.port {
            config.port = port;
        }
        if let Some(ffmpeg) = &cli.ffmpeg {
            config.ffmpeg_path = Some(ffmpeg.clone());
        }
        if let Some(url) = &cli.public_url {
            config.public_base_url = url.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.max_body_bytes == 0 {
            return Err(Error::config("max_body_bytes must be positive"));
        }
        if !(self.public_base_url.starts_with("http://")
            || self.public_base_url.starts_with("https://"))
        {
            return Err(Error::config(format!(
                "public_base_url must be an http(s) URL, got '{}'",
                self.public_base_url
            )));
        }
        if let Some(origin) = self
            .cors
            .allowed_origins
            .iter()
            .find(|origin| HeaderValue::from_str(origin).is_err())
        {
            return Err(Error::config(format!("invalid CORS origin '{origin}'")));
        }
        Ok(())
    }

    /// `listen:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            model_path: default_model_path(),
            uploads_dir: default_uploads_dir(),
            public_base_url: default_public_base_url(),
            ffmpeg_path: default_ffmpeg(),
            max_body_bytes: default_max_body_bytes(),
            cors: CorsConfig::default(),
        }
    }
}

/// Cross-origin configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; empty allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_listen() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_model_path() -> PathBuf {
    PathBuf::from("model.json")
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_ffmpeg() -> Option<PathBuf> {
    Some(PathBuf::from("ffmpeg"))
}

fn default_max_body_bytes() -> usize {
    25 * 1024 * 1024
}
