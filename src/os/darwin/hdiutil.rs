use std::path::{Path, PathBuf};

/// `hdiutil info -plist`
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, Default)]
#[serde(rename_all = "kebab-case")]
pub struct HdiUtilInfoOutput {
    #[serde(default)]
    pub images: Vec<HdiUtilImage>,
}

/// One attached image in [`HdiUtilInfoOutput`]
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct HdiUtilImage {
    pub image_path: PathBuf,
    #[serde(default)]
    pub image_encrypted: bool,
    pub image_type: Option<String>,
    #[serde(default)]
    pub system_entities: Vec<SystemEntity>,
}

#[derive(serde::Deserialize, serde::Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct SystemEntity {
    pub dev_entry: String,
    pub content_hint: Option<String>,
    pub mount_point: Option<PathBuf>,
    pub volume_kind: Option<String>,
}

impl HdiUtilImage {
    /// If this entry describes the image at `path`, which must be absolute and free of symlinks
    ///
    /// `hdiutil` reports the path an image was attached through, so a reported path is also
    /// resolved before comparing.
    pub fn matches(&self, path: &Path) -> bool {
        self.image_path == path
            || self
                .image_path
                .canonicalize()
                .is_ok_and(|resolved| resolved == path)
    }

    /// The whole-disk device, the one `hdiutil detach` takes
    pub fn device(&self) -> Option<&str> {
        self.system_entities
            .first()
            .map(|entity| entity.dev_entry.as_str())
    }

    pub fn mount_point(&self) -> Option<&Path> {
        self.system_entities
            .iter()
            .filter_map(|entity| entity.mount_point.as_deref())
            .find(|mount_point| !mount_point.as_os_str().is_empty())
    }
}
