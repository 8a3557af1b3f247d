//! Configuration types for locally owned frame regions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::region_layout::{RegionLayout, DEFAULT_HEIGHT, DEFAULT_WIDTH};

/// Types of backing memory for a region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackingType {
    /// Private anonymous mapping; only reachable through foreign memory access
    Anonymous,
    /// File-backed mapping
    FileBacked,
    /// Anonymous memory file descriptor (Linux-specific)
    #[cfg(target_os = "linux")]
    MemFd,
}

impl Default for BackingType {
    fn default() -> Self {
        Self::Anonymous
    }
}

impl BackingType {
    /// Check if this backing type is supported on the current platform
    pub fn is_supported(&self) -> bool {
        match self {
            BackingType::Anonymous | BackingType::FileBacked => true,
            #[cfg(target_os = "linux")]
            BackingType::MemFd => true,
        }
    }

    /// Get a human-readable name for the backing type
    pub fn name(&self) -> &'static str {
        match self {
            BackingType::Anonymous => "anonymous",
            BackingType::FileBacked => "file-backed",
            #[cfg(target_os = "linux")]
            BackingType::MemFd => "memfd",
        }
    }

    /// Parse a backing type name as printed by [`BackingType::name`]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "anonymous" | "anon" => Some(BackingType::Anonymous),
            "file-backed" | "file" => Some(BackingType::FileBacked),
            #[cfg(target_os = "linux")]
            "memfd" => Some(BackingType::MemFd),
            _ => None,
        }
    }
}

/// Configuration for creating a frame region in our own address space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Name of the region (memfd name or default file name)
    pub name: String,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Backing type for the mapping
    pub backing_type: BackingType,
    /// Optional file path for file-backed regions
    pub file_path: Option<PathBuf>,
    /// Permissions for file-backed regions (Unix permissions)
    pub permissions: u32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            name: "memframe".to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            backing_type: BackingType::default(),
            file_path: None,
            permissions: 0o600,
        }
    }
}

impl RegionConfig {
    /// Create a new region configuration
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            ..Default::default()
        }
    }

    /// Set the backing type
    pub fn with_backing_type(mut self, backing_type: BackingType) -> Self {
        self.backing_type = backing_type;
        self
    }

    /// Set the file path for file-backed regions
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set the permissions for file-backed regions
    pub fn with_permissions(mut self, permissions: u32) -> Self {
        self.permissions = permissions;
        self
    }

    /// Layout implied by the configured frame size
    pub fn layout(&self) -> crate::Result<RegionLayout> {
        RegionLayout::new(self.width, self.height)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        use crate::error::MemFrameError;

        if self.name.is_empty() {
            return Err(MemFrameError::invalid_parameter(
                "name",
                "Region name cannot be empty",
            ));
        }

        self.layout()?;

        if !self.backing_type.is_supported() {
            return Err(MemFrameError::invalid_parameter(
                "backing_type",
                format!(
                    "Backing type {} is not supported on this platform",
                    self.backing_type.name()
                ),
            ));
        }

        Ok(())
    }

    /// Get the file path used for file-backed regions
    pub fn default_file_path(&self) -> PathBuf {
        self.file_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(format!("memframe_{}", self.name)))
    }
}
