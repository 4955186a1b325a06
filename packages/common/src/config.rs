use std::time::Duration;

use serde::Deserialize;

use crate::paste::DEFAULT_PIN_LENGTH;

/// Room/PIN configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct RoomConfig {
    /// Digits in a PIN. Default: 4.
    #[serde(default = "default_pin_length")]
    pub pin_length: usize,
}

fn default_pin_length() -> usize {
    DEFAULT_PIN_LENGTH
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            pin_length: default_pin_length(),
        }
    }
}

/// Text paste limits.
#[derive(Debug, Deserialize, Clone)]
pub struct PasteConfig {
    /// Maximum characters in a text paste, counted after trimming. Default: 10000.
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

fn default_max_text_chars() -> usize {
    10_000
}

impl Default for PasteConfig {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
        }
    }
}

/// Image upload limits and public URL shape.
#[derive(Debug, Deserialize, Clone)]
pub struct ImageConfig {
    /// Largest accepted image in bytes. Default: 5 MiB.
    #[serde(default = "default_image_max_size")]
    pub max_size: u64,
    /// Origin that public image URLs are issued under. Default: "http://localhost:8000".
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Bucket name embedded in public URLs. Default: "images".
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

pub const DEFAULT_IMAGE_MAX_SIZE: u64 = 5 * 1024 * 1024;

fn default_image_max_size() -> u64 {
    DEFAULT_IMAGE_MAX_SIZE
}
fn default_public_base_url() -> String {
    "http://localhost:8000".into()
}
fn default_bucket() -> String {
    "images".into()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_size: default_image_max_size(),
            public_base_url: default_public_base_url(),
            bucket: default_bucket(),
        }
    }
}

/// Change-feed tuning.
#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// How often polling feeds re-read the store, in milliseconds. Default: 1000.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Buffered events per subscriber before it counts as lagging. Default: 64.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_channel_capacity() -> usize {
    64
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Room session behaviour.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Upper bound on any single store or bucket call, in milliseconds. Default: 15000.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

impl SessionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}
