/*! Typed disk image configuration

[`DiskImageSpec`] is everything `hdiutil create` needs, validated when it is built. The types here
know which arguments they contribute to the `create` command line through [`CreateArgs`].
*/
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use strum::VariantNames;

use crate::{
    command::CommandLine, settings::CreateDefaults, size, validate, validate::ValidationError,
    HdiKitError,
};

/// Default sparse bundle band size, in 512-byte sectors
pub const DEFAULT_BAND_SIZE: u64 = 1024 * 8;
/// Smallest band size `hdiutil` accepts (1 MB)
pub const MIN_BAND_SIZE: u64 = 2048;
/// Largest band size `hdiutil` accepts (8 GB)
pub const MAX_BAND_SIZE: u64 = 16_777_216;

/// Contributes arguments to an `hdiutil create` command line
pub trait CreateArgs {
    fn create_args(&self, command: &mut CommandLine);
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
pub enum FileSystem {
    #[strum(to_string = "HFS+")]
    #[serde(rename = "HFS+")]
    Hfs,
    #[strum(to_string = "HFS+J")]
    #[serde(rename = "HFS+J")]
    HfsJournaled,
    #[strum(to_string = "JHFS+")]
    #[serde(rename = "JHFS+")]
    JournaledHfs,
    #[strum(to_string = "HFSX")]
    #[serde(rename = "HFSX")]
    Hfsx,
    #[strum(to_string = "JHFS+X")]
    #[serde(rename = "JHFS+X")]
    JournaledHfsx,
    #[strum(to_string = "MS-DOS")]
    #[serde(rename = "MS-DOS")]
    MsDos,
    #[strum(to_string = "UDF")]
    #[serde(rename = "UDF")]
    Udf,
}

impl FileSystem {
    /// Map `diskutil`'s `File System Personality` back to the name `hdiutil create -fs` takes
    pub fn from_personality(personality: &str) -> Option<Self> {
        let personality = personality.trim();
        let file_system = match personality {
            "HFS+" | "Mac OS Extended" => Self::Hfs,
            "Journaled HFS+" | "Mac OS Extended (Journaled)" => Self::JournaledHfs,
            "Case-sensitive HFS+" | "Mac OS Extended (Case-sensitive)" => Self::Hfsx,
            "Case-sensitive Journaled HFS+" | "Mac OS Extended (Case-sensitive, Journaled)" => {
                Self::JournaledHfsx
            },
            "UDF" => Self::Udf,
            other if other.starts_with("MS-DOS") => Self::MsDos,
            other => return other.parse().ok(),
        };
        Some(file_system)
    }
}

impl CreateArgs for FileSystem {
    fn create_args(&self, command: &mut CommandLine) {
        command.option("fs", self.to_string());
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
pub enum Encryption {
    #[default]
    #[strum(to_string = "none")]
    #[serde(rename = "none")]
    None,
    #[strum(to_string = "AES-128")]
    #[serde(rename = "AES-128")]
    Aes128,
    #[strum(to_string = "AES-256")]
    #[serde(rename = "AES-256")]
    Aes256,
}

impl Encryption {
    pub fn is_encrypted(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl CreateArgs for Encryption {
    fn create_args(&self, command: &mut CommandLine) {
        if self.is_encrypted() {
            command
                .option("encryption", self.to_string())
                .flag("stdinpass");
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum ImageType {
    #[serde(rename = "UDIF")]
    Udif,
    #[serde(rename = "SPARSE")]
    Sparse,
    #[serde(rename = "SPARSEBUNDLE")]
    SparseBundle { band_size: u64 },
}

impl ImageType {
    /// Names accepted by `hdiutil create -type`
    pub const NAMES: &'static [&'static str] = &["UDIF", "SPARSE", "SPARSEBUNDLE"];
    pub const EXTENSIONS: &'static [&'static str] = &["dmg", "sparseimage", "sparsebundle"];

    pub fn sparse_bundle(band_size: u64) -> Result<Self, ValidationError> {
        if !(MIN_BAND_SIZE..=MAX_BAND_SIZE).contains(&band_size) {
            return Err(ValidationError::BandSize(band_size));
        }
        Ok(Self::SparseBundle { band_size })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Udif => "UDIF",
            Self::Sparse => "SPARSE",
            Self::SparseBundle { .. } => "SPARSEBUNDLE",
        }
    }

    /// The `hdiutil` format code, as reported under `Format` by `hdiutil imageinfo`
    pub fn format_code(&self) -> &'static str {
        match self {
            Self::Udif => "UDRW",
            Self::Sparse => "UDSP",
            Self::SparseBundle { .. } => "UDSB",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Udif => "dmg",
            Self::Sparse => "sparseimage",
            Self::SparseBundle { .. } => "sparsebundle",
        }
    }

    pub fn from_format_code(code: &str) -> Option<Self> {
        match code {
            "UDRW" => Some(Self::Udif),
            "UDSP" => Some(Self::Sparse),
            "UDSB" => Some(Self::SparseBundle {
                band_size: DEFAULT_BAND_SIZE,
            }),
            _ => None,
        }
    }

    /// Infer the type of an existing image from its extension
    pub fn from_path(path: &Path) -> Result<Self, ValidationError> {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("dmg") => Ok(Self::Udif),
            Some("sparseimage") => Ok(Self::Sparse),
            Some("sparsebundle") => Ok(Self::SparseBundle {
                band_size: DEFAULT_BAND_SIZE,
            }),
            _ => Err(ValidationError::UnknownExtension {
                path: path.to_path_buf(),
                allowed: Self::EXTENSIONS.iter().map(ToString::to_string).collect(),
            }),
        }
    }
}

impl std::fmt::Display for ImageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ImageType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate::validate("create", "type", s)?;
        match s {
            "SPARSE" => Ok(Self::Sparse),
            "SPARSEBUNDLE" => Ok(Self::SparseBundle {
                band_size: DEFAULT_BAND_SIZE,
            }),
            _ => Ok(Self::Udif),
        }
    }
}

impl CreateArgs for ImageType {
    fn create_args(&self, command: &mut CommandLine) {
        command.option("type", self.name());
        if let Self::SparseBundle { band_size } = self {
            command.option("imagekey", format!("sparse-band-size={band_size}"));
        }
    }
}

/// Raw, user-supplied `create` options, typically from the command line or a config file
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::Args))]
pub struct CreateOptions {
    /// Size of the image, like `100m` or `1 GB`
    #[cfg_attr(feature = "cli", clap(long))]
    pub size: Option<String>,
    /// Name of the volume as it appears when attached
    #[cfg_attr(feature = "cli", clap(long))]
    pub volname: Option<String>,
    /// File system of the volume
    #[cfg_attr(feature = "cli", clap(long))]
    pub fs: Option<String>,
    /// One of `UDIF`, `SPARSE` or `SPARSEBUNDLE`
    #[cfg_attr(feature = "cli", clap(long = "type"))]
    #[serde(rename = "type")]
    pub image_type: Option<String>,
    /// One of `none`, `AES-128` or `AES-256`
    #[cfg_attr(feature = "cli", clap(long))]
    pub encryption: Option<String>,
    /// Band size of a `SPARSEBUNDLE`, in 512-byte sectors
    #[cfg_attr(feature = "cli", clap(long))]
    pub band_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DiskImageSpec {
    path: PathBuf,
    size: u64,
    volume_name: String,
    file_system: FileSystem,
    image_type: ImageType,
    encryption: Encryption,
}

impl DiskImageSpec {
    /// A spec for `path` carrying every value from `defaults`
    pub fn new(path: impl AsRef<Path>, defaults: &CreateDefaults) -> Self {
        Self {
            path: expand_home(path.as_ref()),
            size: defaults.size(),
            volume_name: defaults.volume_name().to_string(),
            file_system: defaults.file_system(),
            image_type: defaults.image_type(),
            encryption: defaults.encryption(),
        }
    }

    /// Validate `options` eagerly, falling back to `defaults` for anything unset
    pub fn from_options(
        path: impl AsRef<Path>,
        options: &CreateOptions,
        defaults: &CreateDefaults,
    ) -> Result<Self, HdiKitError> {
        let CreateOptions {
            size,
            volname,
            fs,
            image_type,
            encryption,
            band_size,
        } = options;
        let mut spec = Self::new(path, defaults);

        if let Some(size) = size {
            validate::validate("create", "size", size)?;
            spec = spec.with_size(size::to_bytes(size)?)?;
        }
        if let Some(volname) = volname {
            validate::validate("create", "volname", volname)?;
            spec = spec.with_volume_name(volname);
        }
        if let Some(fs) = fs {
            spec = spec.with_file_system(parse_option("fs", fs)?);
        }
        if let Some(image_type) = image_type {
            spec = spec.with_image_type(image_type.parse()?);
        }
        if let Some(encryption) = encryption {
            spec = spec.with_encryption(parse_option("encryption", encryption)?);
        }
        match (band_size, spec.image_type) {
            (Some(band_size), ImageType::SparseBundle { .. }) => {
                spec = spec.with_image_type(ImageType::sparse_bundle(*band_size)?);
            },
            (Some(band_size), image_type) => {
                tracing::warn!(%band_size, %image_type, "Ignoring band size, only sparse bundles have bands");
            },
            (None, _) => (),
        }

        Ok(spec)
    }

    pub fn with_size(mut self, size: u64) -> Result<Self, ValidationError> {
        if size == 0 {
            return Err(ValidationError::ZeroSize);
        }
        self.size = size;
        Ok(self)
    }

    pub fn with_volume_name(mut self, volume_name: impl Into<String>) -> Self {
        self.volume_name = volume_name.into();
        self
    }

    pub fn with_file_system(mut self, file_system: FileSystem) -> Self {
        self.file_system = file_system;
        self
    }

    pub fn with_image_type(mut self, image_type: ImageType) -> Self {
        self.image_type = image_type;
        self
    }

    pub fn with_encryption(mut self, encryption: Encryption) -> Self {
        self.encryption = encryption;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

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
}

impl CreateArgs for DiskImageSpec {
    fn create_args(&self, command: &mut CommandLine) {
        command
            .arg(self.path.display().to_string())
            .option("sectors", size::to_sectors(self.size).to_string())
            .option("volname", &self.volume_name);
        self.file_system.create_args(command);
        self.image_type.create_args(command);
        self.encryption.create_args(command);
    }
}

fn parse_option<T: FromStr + VariantNames>(option: &str, value: &str) -> Result<T, ValidationError> {
    validate::validate("create", option, value)?;
    value
        .parse()
        .map_err(|_| ValidationError::invalid_value("create", option, value, T::VARIANTS))
}

/// Replace a leading `~` component with the home directory
pub(crate) fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_line(spec: &DiskImageSpec) -> String {
        let mut command = CommandLine::new("hdiutil", "create");
        spec.create_args(&mut command);
        command.to_string()
    }

    #[test]
    fn defaults_produce_a_udif_image() {
        let spec = DiskImageSpec::new("/tmp/scratch.dmg", &CreateDefaults::default());

        assert_eq!(
            create_line(&spec),
            "hdiutil create /tmp/scratch.dmg -sectors 195313 -volname Volume -fs HFS+ -type UDIF"
        );
    }

    #[test]
    fn sparse_bundle_carries_band_size() {
        let options = CreateOptions {
            size: Some("1 GB".into()),
            volname: Some("Bands".into()),
            fs: Some("JHFS+".into()),
            image_type: Some("SPARSEBUNDLE".into()),
            band_size: Some(4096),
            ..Default::default()
        };
        let spec =
            DiskImageSpec::from_options("/tmp/b.sparsebundle", &options, &CreateDefaults::default())
                .unwrap();

        assert_eq!(
            spec.image_type(),
            ImageType::SparseBundle { band_size: 4096 }
        );
        assert_eq!(
            create_line(&spec),
            "hdiutil create /tmp/b.sparsebundle -sectors 1953125 -volname Bands -fs JHFS+ -type SPARSEBUNDLE -imagekey sparse-band-size=4096"
        );
    }

    #[test]
    fn encryption_reads_password_from_stdin() {
        let spec = DiskImageSpec::new("/tmp/secret.dmg", &CreateDefaults::default())
            .with_encryption(Encryption::Aes256);

        assert!(create_line(&spec).ends_with("-type UDIF -encryption AES-256 -stdinpass"));
    }

    #[test]
    fn invalid_options_are_rejected_eagerly() {
        let defaults = CreateDefaults::default();

        let options = CreateOptions {
            fs: Some("NTFS".into()),
            ..Default::default()
        };
        let err = DiskImageSpec::from_options("/tmp/a.dmg", &options, &defaults).unwrap_err();
        assert!(matches!(
            err,
            HdiKitError::Validation(ValidationError::InvalidValue { ref option, .. }) if option == "fs"
        ));

        let options = CreateOptions {
            encryption: Some("ROT13".into()),
            ..Default::default()
        };
        let err = DiskImageSpec::from_options("/tmp/a.dmg", &options, &defaults).unwrap_err();
        assert!(err.to_string().contains("none, AES-128, AES-256"));

        let options = CreateOptions {
            size: Some("lots".into()),
            ..Default::default()
        };
        let err = DiskImageSpec::from_options("/tmp/a.dmg", &options, &defaults).unwrap_err();
        assert!(matches!(err, HdiKitError::Format(_)));

        let options = CreateOptions {
            image_type: Some("SPARSEBUNDLE".into()),
            band_size: Some(16),
            ..Default::default()
        };
        let err = DiskImageSpec::from_options("/tmp/a.dmg", &options, &defaults).unwrap_err();
        assert!(matches!(
            err,
            HdiKitError::Validation(ValidationError::BandSize(16))
        ));
    }

    #[test]
    fn zero_size_is_rejected() {
        let spec = DiskImageSpec::new("/tmp/a.dmg", &CreateDefaults::default());
        assert_eq!(spec.with_size(0).unwrap_err(), ValidationError::ZeroSize);
    }

    #[test]
    fn image_type_from_path() {
        assert_eq!(
            ImageType::from_path(Path::new("/tmp/a.dmg")).unwrap(),
            ImageType::Udif
        );
        assert_eq!(
            ImageType::from_path(Path::new("a.sparseimage")).unwrap(),
            ImageType::Sparse
        );
        assert_eq!(
            ImageType::from_path(Path::new("a.sparsebundle"))
                .unwrap()
                .format_code(),
            "UDSB"
        );
        let err = ImageType::from_path(Path::new("a.iso")).unwrap_err();
        assert_eq!(
            err.allowed().unwrap(),
            ["dmg", "sparseimage", "sparsebundle"]
        );
    }

    #[test]
    fn format_codes_round_trip() {
        for image_type in [
            ImageType::Udif,
            ImageType::Sparse,
            ImageType::SparseBundle {
                band_size: DEFAULT_BAND_SIZE,
            },
        ] {
            assert_eq!(
                ImageType::from_format_code(image_type.format_code()),
                Some(image_type)
            );
        }
    }

    #[test]
    fn personalities() {
        assert_eq!(
            FileSystem::from_personality("Journaled HFS+"),
            Some(FileSystem::JournaledHfs)
        );
        assert_eq!(
            FileSystem::from_personality("MS-DOS FAT32"),
            Some(FileSystem::MsDos)
        );
        assert_eq!(FileSystem::from_personality("HFSX"), Some(FileSystem::Hfsx));
        assert_eq!(FileSystem::from_personality("APFS"), None);
    }

    #[test]
    fn home_is_expanded() {
        let expanded = expand_home(Path::new("~/scratch.dmg"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("scratch.dmg"));
        }
        assert_eq!(
            expand_home(Path::new("/tmp/~/a.dmg")),
            PathBuf::from("/tmp/~/a.dmg")
        );
    }
}
