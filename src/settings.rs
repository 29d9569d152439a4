/*! Configurable knobs and their related errors
*/
use std::path::PathBuf;

use crate::{
    image::{Encryption, FileSystem, ImageType},
    runner::DEFAULT_SHELL,
    size,
    validate::ValidationError,
    NotFoundError,
};

/// Default [`size`](CreateDefaults::size) of a new image (100 MB)
pub const DEFAULT_SIZE: u64 = 100_000_000;
/// Default [`volume_name`](CreateDefaults::volume_name) of a new image
pub const DEFAULT_VOLUME_NAME: &str = "Volume";

/** Values used for anything a [`DiskImageSpec`](crate::DiskImageSpec) does not set

The record is immutable once built; each `with_*` method returns a new record.
*/
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CreateDefaults {
    size: u64,
    volume_name: String,
    file_system: FileSystem,
    image_type: ImageType,
    encryption: Encryption,
}

impl Default for CreateDefaults {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            volume_name: DEFAULT_VOLUME_NAME.to_string(),
            file_system: FileSystem::Hfs,
            image_type: ImageType::Udif,
            encryption: Encryption::None,
        }
    }
}

impl CreateDefaults {
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn volume_name(&self) -> &str {
        &self.volume_name
    }

    pub fn file_system(&self) -> FileSystem {
        self.file_system
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    pub fn encryption(&self) -> Encryption {
        self.encryption
    }

    pub fn with_size(self, size: u64) -> Result<Self, ValidationError> {
        if size == 0 {
            return Err(ValidationError::ZeroSize);
        }
        Ok(Self { size, ..self })
    }

    pub fn with_volume_name(self, volume_name: impl Into<String>) -> Self {
        Self {
            volume_name: volume_name.into(),
            ..self
        }
    }

    pub fn with_file_system(self, file_system: FileSystem) -> Self {
        Self {
            file_system,
            ..self
        }
    }

    pub fn with_image_type(self, image_type: ImageType) -> Self {
        Self { image_type, ..self }
    }

    pub fn with_encryption(self, encryption: Encryption) -> Self {
        Self { encryption, ..self }
    }

    /// A listing of the defaults, suitable for display
    pub fn settings(&self) -> Vec<(&'static str, String)> {
        let Self {
            size,
            volume_name,
            file_system,
            image_type,
            encryption,
        } = self;

        vec![
            ("size", size::to_human_readable(*size)),
            ("volname", volume_name.clone()),
            ("fs", file_system.to_string()),
            ("type", image_type.to_string()),
            ("encryption", encryption.to_string()),
        ]
    }
}

/// Where to find the tools disk image operations shell out to
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct ToolSettings {
    /// The `hdiutil` executable
    #[cfg_attr(
        feature = "cli",
        clap(long, default_value = "hdiutil", env = "HDIKIT_HDIUTIL", global = true)
    )]
    pub hdiutil: String,

    /// The `diskutil` executable
    #[cfg_attr(
        feature = "cli",
        clap(long, default_value = "diskutil", env = "HDIKIT_DISKUTIL", global = true)
    )]
    pub diskutil: String,

    /// The shell command lines are run through
    #[cfg_attr(
        feature = "cli",
        clap(long, default_value = DEFAULT_SHELL, env = "HDIKIT_SHELL", global = true)
    )]
    pub shell: PathBuf,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            hdiutil: String::from("hdiutil"),
            diskutil: String::from("diskutil"),
            shell: PathBuf::from(DEFAULT_SHELL),
        }
    }
}

impl ToolSettings {
    /// Resolve each tool through `PATH`, failing if any cannot be found
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn resolve(&self) -> Result<Self, NotFoundError> {
        let locate = |tool: &str| {
            which::which(tool)
                .map(|found| found.display().to_string())
                .map_err(|_| NotFoundError::Tool(tool.to_string()))
        };

        let resolved = Self {
            hdiutil: locate(&self.hdiutil)?,
            diskutil: locate(&self.diskutil)?,
            shell: self.shell.clone(),
        };
        tracing::debug!(hdiutil = %resolved.hdiutil, diskutil = %resolved.diskutil, "Resolved tools");
        Ok(resolved)
    }

    // Builder Pattern

    /// The `hdiutil` executable
    pub fn hdiutil(&mut self, hdiutil: impl Into<String>) -> &mut Self {
        self.hdiutil = hdiutil.into();
        self
    }

    /// The `diskutil` executable
    pub fn diskutil(&mut self, diskutil: impl Into<String>) -> &mut Self {
        self.diskutil = diskutil.into();
        self
    }

    /// The shell command lines are run through
    pub fn shell(&mut self, shell: impl Into<PathBuf>) -> &mut Self {
        self.shell = shell.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let defaults = CreateDefaults::default();
        assert_eq!(
            defaults.settings(),
            vec![
                ("size", "100.0m".to_string()),
                ("volname", "Volume".to_string()),
                ("fs", "HFS+".to_string()),
                ("type", "UDIF".to_string()),
                ("encryption", "none".to_string()),
            ]
        );
    }

    #[test]
    fn with_returns_a_new_record() {
        let defaults = CreateDefaults::default();
        let sparse = defaults.clone().with_image_type(ImageType::Sparse);

        assert_eq!(defaults.image_type(), ImageType::Udif);
        assert_eq!(sparse.image_type(), ImageType::Sparse);
        assert_eq!(
            CreateDefaults::default().with_size(0).unwrap_err(),
            ValidationError::ZeroSize
        );
    }

    #[test]
    fn missing_tool_is_not_found() {
        let mut tools = ToolSettings::default();
        tools.hdiutil("hdikit-definitely-not-installed");

        let err = tools.resolve().unwrap_err();
        assert!(
            matches!(err, NotFoundError::Tool(ref tool) if tool == "hdikit-definitely-not-installed")
        );
    }

    #[test]
    fn present_tools_resolve_to_paths() {
        let mut tools = ToolSettings::default();
        tools.hdiutil("sh").diskutil("sh");

        let resolved = tools.resolve().unwrap();
        assert!(resolved.hdiutil.ends_with("/sh"));
    }
}
