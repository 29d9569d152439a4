/*! A single disk image and the operations on it

A [`DiskImage`] moves between unattached and attached as [`attach`](DiskImage::attach) and
[`detach`](DiskImage::detach) are called; whether it is attached is always read back from
`hdiutil info` rather than remembered. [`is_created`](DiskImage::is_created) tells apart images
made through [`HdiUtil::create`] from ones opened at an existing path.

Commands that `hdiutil` refuses with `Resource temporarily unavailable` are retried once after
flipping the attachment: detaching an attached image, attaching a detached one.
*/
use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use nix::sys::statvfs::statvfs;

use crate::{
    command::CommandLine,
    hdiutil::HdiUtil,
    image::{CreateArgs, DiskImageSpec, Encryption, FileSystem, ImageType},
    interaction::stdin_passwords,
    os::darwin::HdiUtilImage,
    parse::{self, FormatError, ParsedInfo},
    runner::CommandResult,
    size,
    validate::ValidationError,
    HdiKitError, NotFoundError,
};

#[derive(Debug)]
pub struct DiskImage {
    hdiutil: HdiUtil,
    path: PathBuf,
    size: Option<u64>,
    volume_name: Option<String>,
    file_system: Option<FileSystem>,
    image_type: ImageType,
    encryption: Option<Encryption>,
    created: bool,
}

impl DiskImage {
    pub(crate) fn existing(hdiutil: HdiUtil, path: PathBuf, image_type: ImageType) -> Self {
        Self {
            hdiutil,
            path,
            size: None,
            volume_name: None,
            file_system: None,
            image_type,
            encryption: None,
            created: false,
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(path = %spec.path().display()))]
    pub(crate) async fn create(hdiutil: HdiUtil, spec: DiskImageSpec) -> Result<Self, HdiKitError> {
        let directory = parent_directory(spec.path())?;
        if spec.image_type() == ImageType::Udif {
            ensure_space(&directory, spec.size())?;
        }

        let stdin = if spec.encryption().is_encrypted() {
            let password = hdiutil.prompt().new_password()?;
            Some(stdin_passwords([password.as_str()]))
        } else {
            None
        };

        let path = resolved_image_path(
            &directory,
            &with_image_extension(spec.path(), spec.image_type()),
        )?;

        let mut command = hdiutil.hdiutil("create");
        spec.create_args(&mut command);
        hdiutil.run(&command, stdin.as_deref()).await?;
        tracing::debug!(path = %path.display(), "Created disk image");

        let mut image = Self {
            hdiutil,
            path,
            size: Some(spec.size()),
            volume_name: Some(spec.volume_name().to_string()),
            file_system: Some(spec.file_system()),
            image_type: spec.image_type(),
            encryption: None,
            created: true,
        };
        image.set_encryption(spec.encryption())?;
        Ok(image)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes, excluding overhead
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn volume_name(&self) -> Option<&str> {
        self.volume_name.as_deref()
    }

    pub fn file_system(&self) -> Option<FileSystem> {
        self.file_system
    }

    pub fn image_type(&self) -> ImageType {
        self.image_type
    }

    pub fn encryption(&self) -> Option<Encryption> {
        self.encryption
    }

    /// If this image was made by [`HdiUtil::create`] rather than opened
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Record the encryption of this image; it can only be set once
    pub fn set_encryption(&mut self, encryption: Encryption) -> Result<(), ValidationError> {
        match self.encryption {
            Some(current) => Err(ValidationError::EncryptionAlreadySet {
                current,
                requested: encryption,
            }),
            None => {
                self.encryption = Some(encryption);
                Ok(())
            },
        }
    }

    /// Change the size of the image
    ///
    /// The first size given to an image with no recorded size is only recorded. Later sizes run
    /// `hdiutil resize`.
    #[tracing::instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub async fn resize(&mut self, new_size: u64) -> Result<(), HdiKitError> {
        if new_size == 0 {
            return Err(ValidationError::ZeroSize.into());
        }

        match self.size {
            Some(current) => {
                if self.image_type == ImageType::Udif && new_size > current {
                    ensure_space(&parent_directory(&self.path)?, new_size - current)?;
                }
                let mut command = self.hdiutil.hdiutil("resize");
                command
                    .arg(self.path_arg())
                    .option("sectors", size::to_sectors(new_size).to_string());
                self.run_with_retry(&command, None).await?;
            },
            None => tracing::debug!("No size recorded yet, recording without resizing"),
        }

        self.size = Some(new_size);
        Ok(())
    }

    /// The entry `hdiutil info` has for this image, `None` when it is not attached
    ///
    /// An entry reporting exactly this image's path wins over one reached through a symlink.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn info(&self) -> Result<Option<HdiUtilImage>, HdiKitError> {
        let mut images = self.hdiutil.info().await?.images;
        let index = images
            .iter()
            .position(|image| image.image_path == self.path)
            .or_else(|| images.iter().position(|image| image.matches(&self.path)));
        Ok(index.map(|index| images.swap_remove(index)))
    }

    pub async fn is_mounted(&self) -> Result<bool, HdiKitError> {
        Ok(self.info().await?.is_some())
    }

    /// Where the volume is mounted, if attached
    pub async fn mount_point(&self) -> Result<Option<PathBuf>, HdiKitError> {
        Ok(self
            .info()
            .await?
            .and_then(|image| image.mount_point().map(Path::to_path_buf)))
    }

    /// The whole-disk device entry, like `/dev/disk4`, if attached
    pub async fn device(&self) -> Result<Option<String>, HdiKitError> {
        Ok(self
            .info()
            .await?
            .and_then(|image| image.device().map(String::from)))
    }

    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn is_encrypted(&self) -> Result<bool, HdiKitError> {
        let attached = self.info().await?;
        self.is_encrypted_given(attached.as_ref()).await
    }

    async fn is_encrypted_given(&self, attached: Option<&HdiUtilImage>) -> Result<bool, HdiKitError> {
        if let Some(image) = attached {
            return Ok(image.image_encrypted);
        }

        let mut command = self.hdiutil.hdiutil("isencrypted");
        command.arg(self.path_arg());
        let output = self.hdiutil.run(&command, None).await?;
        let info = parse::colon_text(&output.stdout_lossy());

        match parse::required(&info, &command, "encrypted")? {
            "YES" => Ok(true),
            "NO" => Ok(false),
            other => Err(FormatError::Value {
                command: command.to_string(),
                key: "encrypted".into(),
                value: other.into(),
            }
            .into()),
        }
    }

    /// Attach the image, asking for its password first if it is encrypted
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn attach(&self) -> Result<(), HdiKitError> {
        let attached = self.info().await?;
        let (command, stdin) = self.attach_command(attached.as_ref()).await?;
        self.run_with_retry(&command, stdin.as_deref()).await?;
        Ok(())
    }

    async fn attach_command(
        &self,
        attached: Option<&HdiUtilImage>,
    ) -> Result<(CommandLine, Option<Vec<u8>>), HdiKitError> {
        let mut command = self.hdiutil.hdiutil("attach");
        command.arg(self.path_arg());

        if !self.is_encrypted_given(attached).await? {
            return Ok((command, None));
        }

        let password = self
            .hdiutil
            .prompt()
            .read_password(&format!("Enter the password for `{}`:", self.path.display()))?;
        command.flag("stdinpass");
        Ok((command, Some(stdin_passwords([password.as_str()]))))
    }

    /// Detach the image from its device
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn detach(&self) -> Result<(), HdiKitError> {
        let attached = self
            .info()
            .await?
            .ok_or_else(|| NotFoundError::NotAttached(self.path.clone()))?;
        let command = self.detach_command(&attached)?;
        self.run_with_retry(&command, None).await?;
        Ok(())
    }

    fn detach_command(&self, attached: &HdiUtilImage) -> Result<CommandLine, FormatError> {
        let device = attached.device().ok_or_else(|| FormatError::MissingKey {
            command: self.hdiutil.hdiutil("info").to_string(),
            key: "dev-entry".into(),
        })?;

        let mut command = self.hdiutil.hdiutil("detach");
        command.arg(device);
        Ok(command)
    }

    /// `hdiutil imageinfo`
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn image_info(&self) -> Result<plist::Dictionary, HdiKitError> {
        let mut command = self.hdiutil.hdiutil("imageinfo");
        command.arg(self.path_arg()).flag("plist");
        let output = self.run_with_retry(&command, None).await?;
        Ok(parse::plist(&command, &output.stdout)?)
    }

    /// `diskutil info` for the image's volume, attaching the image if needed
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn diskutil_info(&self) -> Result<ParsedInfo, HdiKitError> {
        let attached = match self.info().await? {
            Some(attached) => attached,
            None => {
                self.attach().await?;
                self.info()
                    .await?
                    .ok_or_else(|| NotFoundError::NotAttached(self.path.clone()))?
            },
        };

        let target = attached
            .mount_point()
            .map(|mount_point| mount_point.display().to_string())
            .or_else(|| {
                attached
                    .system_entities
                    .last()
                    .map(|entity| entity.dev_entry.clone())
            })
            .ok_or_else(|| NotFoundError::NotAttached(self.path.clone()))?;

        let mut command = self.hdiutil.diskutil("info");
        command.arg(target);
        let output = self.hdiutil.run(&command, None).await?;
        Ok(parse::colon_text(&output.stdout_lossy()))
    }

    /// Refresh the volume name, file system and size from `diskutil info`
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn update(&mut self) -> Result<(), HdiKitError> {
        let info = self.diskutil_info().await?;
        let command = self.hdiutil.diskutil("info");

        let volume_name = parse::required(&info, &command, "Volume Name")?;
        let personality = parse::required(&info, &command, "File System Personality")?;
        let total_size = parse::required(&info, &command, "Total Size")?;

        let file_system =
            FileSystem::from_personality(personality).ok_or_else(|| FormatError::Value {
                command: command.to_string(),
                key: "File System Personality".into(),
                value: personality.into(),
            })?;

        self.volume_name = Some(volume_name.to_string());
        self.file_system = Some(file_system);
        self.size = Some(size::from_total_size(total_size)?);
        Ok(())
    }

    /// Rename the volume, through its mount point when attached
    #[tracing::instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub async fn change_volume_name(&mut self, new_name: &str) -> Result<(), HdiKitError> {
        let attached = self.info().await?;
        let target = match (
            attached.as_ref().and_then(HdiUtilImage::mount_point),
            &self.volume_name,
        ) {
            (Some(mount_point), _) => mount_point.display().to_string(),
            (None, Some(volume_name)) => volume_name.clone(),
            (None, None) => return Err(NotFoundError::NotAttached(self.path.clone()).into()),
        };

        self.hdiutil.rename_volume(&target, new_name).await?;
        self.volume_name = Some(new_name.to_string());
        Ok(())
    }

    /// `hdiutil chpass`, asking for the current and the new password
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    pub async fn change_password(&self) -> Result<(), HdiKitError> {
        let prompt = self.hdiutil.prompt();
        let old = prompt.read_password("Enter the current password:")?;
        let new = prompt.new_password()?;

        let mut command = self.hdiutil.hdiutil("chpass");
        command
            .arg(self.path_arg())
            .flag("oldstdinpass")
            .flag("newstdinpass");
        let stdin = stdin_passwords([old.as_str(), new.as_str()]);
        self.run_with_retry(&command, Some(&stdin)).await?;
        Ok(())
    }

    /// Run `command`, flipping the attachment and retrying exactly once if the image was busy
    async fn run_with_retry(
        &self,
        command: &CommandLine,
        stdin: Option<&[u8]>,
    ) -> Result<CommandResult, HdiKitError> {
        let err = match self.hdiutil.run(command, stdin).await {
            Ok(output) => return Ok(output),
            Err(err) if err.is_resource_unavailable() => err,
            Err(err) => return Err(err.into()),
        };

        match self.info().await? {
            Some(attached) => {
                tracing::debug!(error = %err, "Image busy while attached, detaching before retrying");
                let detach = self.detach_command(&attached)?;
                self.hdiutil.run(&detach, None).await?;
            },
            None => {
                tracing::debug!(error = %err, "Image unavailable while detached, attaching before retrying");
                let (attach, attach_stdin) = self.attach_command(None).await?;
                self.hdiutil.run(&attach, attach_stdin.as_deref()).await?;
            },
        }

        Ok(self.hdiutil.run(command, stdin).await?)
    }

    fn path_arg(&self) -> String {
        self.path.display().to_string()
    }
}

impl Display for DiskImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unknown = || String::from("-");
        let rows = [
            ("path", self.path.display().to_string()),
            (
                "size",
                self.size.map(size::to_human_readable).unwrap_or_else(unknown),
            ),
            (
                "volname",
                self.volume_name.clone().unwrap_or_else(unknown),
            ),
            (
                "fs",
                self.file_system
                    .map(|fs| fs.to_string())
                    .unwrap_or_else(unknown),
            ),
            ("type", self.image_type.to_string()),
            (
                "encryption",
                self.encryption
                    .map(|encryption| encryption.to_string())
                    .unwrap_or_else(unknown),
            ),
            ("created", self.created.to_string()),
        ];

        for (key, value) in rows {
            writeln!(f, "{key:20}{value}")?;
        }
        Ok(())
    }
}

/// `hdiutil create` appends the type's extension unless the path already ends in it
fn with_image_extension(path: &Path, image_type: ImageType) -> PathBuf {
    if path.extension().and_then(|extension| extension.to_str()) == Some(image_type.extension()) {
        return path.to_path_buf();
    }
    let mut with_extension = path.as_os_str().to_owned();
    with_extension.push(".");
    with_extension.push(image_type.extension());
    PathBuf::from(with_extension)
}

/// Absolute location of a new image with symlinks in its directory resolved
fn resolved_image_path(directory: &Path, path: &Path) -> Result<PathBuf, NotFoundError> {
    let directory = directory
        .canonicalize()
        .map_err(|_| NotFoundError::Directory(directory.to_path_buf()))?;
    Ok(match path.file_name() {
        Some(file_name) => directory.join(file_name),
        None => path.to_path_buf(),
    })
}

fn parent_directory(path: &Path) -> Result<PathBuf, NotFoundError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.is_dir() {
        return Err(NotFoundError::Directory(parent));
    }
    Ok(parent)
}

fn ensure_space(directory: &Path, requested: u64) -> Result<(), HdiKitError> {
    let stat = statvfs(directory)
        .map_err(|errno| HdiKitError::FreeSpace(directory.to_path_buf(), errno))?;
    let available =
        u64::from(stat.blocks_available()).saturating_mul(u64::from(stat.fragment_size()));

    if requested >= available {
        return Err(ValidationError::InsufficientSpace {
            path: directory.to_path_buf(),
            requested,
            available,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        image::CreateOptions, interaction::scripted::ScriptedPrompt,
        runner::scripted::ScriptedRunner, settings::CreateDefaults,
    };

    const BUSY: &str = "hdiutil: resize: failed. Resource temporarily unavailable (35)";
    const DISKUTIL_INFO: &str = include_str!("./os/darwin/diskutil-info.sample.txt");

    fn info_plist(attached: &[(&str, bool)]) -> String {
        let images: String = attached
            .iter()
            .enumerate()
            .map(|(index, (path, encrypted))| {
                let disk = 9 + index;
                format!(
                    "<dict>\
                        <key>image-encrypted</key><{encrypted}/>\
                        <key>image-path</key><string>{path}</string>\
                        <key>system-entities</key><array>\
                            <dict><key>dev-entry</key><string>/dev/disk{disk}</string></dict>\
                            <dict><key>dev-entry</key><string>/dev/disk{disk}s1</string>\
                            <key>mount-point</key><string>/Volumes/Scratch</string></dict>\
                        </array>\
                    </dict>"
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><plist version="1.0"><dict><key>images</key><array>{images}</array></dict></plist>"#
        )
    }

    fn hdiutil(runner: &Arc<ScriptedRunner>, answers: &[&str]) -> HdiUtil {
        HdiUtil::default()
            .with_runner(runner.clone())
            .with_prompt(Arc::new(ScriptedPrompt::new(answers.iter().copied())))
    }

    fn scratch_image(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("scratch.dmg");
        std::fs::write(&path, b"").unwrap();
        path.canonicalize().unwrap()
    }

    #[tokio::test]
    async fn create_runs_hdiutil_create() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().ok("created: scratch.dmg\n"));
        let hdiutil = hdiutil(&runner, &[]);
        let options = CreateOptions {
            size: Some("10m".into()),
            volname: Some("Scratch".into()),
            ..Default::default()
        };

        let spec = hdiutil
            .spec(dir.path().join("scratch"), &options)
            .unwrap();
        let image = hdiutil.create(spec).await.unwrap();

        assert_eq!(
            runner.calls(),
            [format!(
                "hdiutil create {}/scratch -sectors 19532 -volname Scratch -fs HFS+ -type UDIF",
                dir.path().display()
            )]
        );
        assert_eq!(runner.stdin_of(0), None);
        assert!(image.is_created());
        assert_eq!(
            image.path(),
            dir.path().canonicalize().unwrap().join("scratch.dmg")
        );
        assert_eq!(image.size(), Some(10_000_000));
        assert_eq!(image.volume_name(), Some("Scratch"));
        assert_eq!(image.encryption(), Some(Encryption::None));
    }

    #[tokio::test]
    async fn create_encrypted_reads_password_once_confirmed() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().ok(""));
        let hdiutil = hdiutil(&runner, &["hunter2", "hunter2"]);
        let spec = DiskImageSpec::new(dir.path().join("secret.dmg"), &CreateDefaults::default())
            .with_size(1_000_000)
            .unwrap()
            .with_encryption(Encryption::Aes256);

        let image = hdiutil.create(spec).await.unwrap();

        assert!(runner.calls()[0].ends_with("-encryption AES-256 -stdinpass"));
        assert_eq!(runner.stdin_of(0), Some(b"hunter2\0".to_vec()));
        assert_eq!(image.encryption(), Some(Encryption::Aes256));
    }

    #[tokio::test]
    async fn create_rejects_missing_directory_and_oversized_images() {
        let runner = Arc::new(ScriptedRunner::new());
        let hdiutil = hdiutil(&runner, &[]);

        let spec = DiskImageSpec::new("/nonexistent/hdikit/a.dmg", &CreateDefaults::default());
        let err = hdiutil.create(spec).await.unwrap_err();
        assert!(matches!(
            err,
            HdiKitError::NotFound(NotFoundError::Directory(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let spec = DiskImageSpec::new(dir.path().join("huge.dmg"), &CreateDefaults::default())
            .with_size(u64::MAX / 2)
            .unwrap();
        let err = hdiutil.create(spec).await.unwrap_err();
        assert!(matches!(
            err,
            HdiKitError::Validation(ValidationError::InsufficientSpace { .. })
        ));

        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn encryption_cannot_be_reassigned() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().ok(""));
        let hdiutil = hdiutil(&runner, &[]);
        let spec = DiskImageSpec::new(dir.path().join("a.dmg"), &CreateDefaults::default())
            .with_size(1_000_000)
            .unwrap();

        let mut image = hdiutil.create(spec).await.unwrap();

        for requested in [Encryption::None, Encryption::Aes128, Encryption::Aes256] {
            assert_eq!(
                image.set_encryption(requested).unwrap_err(),
                ValidationError::EncryptionAlreadySet {
                    current: Encryption::None,
                    requested,
                }
            );
        }
        assert_eq!(image.encryption(), Some(Encryption::None));
    }

    #[tokio::test]
    async fn encryption_of_an_opened_image_can_be_set_once() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let mut image = hdiutil(&runner, &[])
            .open(scratch_image(&dir))
            .unwrap();

        assert_eq!(image.encryption(), None);
        image.set_encryption(Encryption::Aes128).unwrap();
        assert!(image.set_encryption(Encryption::Aes128).is_err());
    }

    #[tokio::test]
    async fn first_resize_only_records_the_size() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().ok(""));
        let mut image = hdiutil(&runner, &[])
            .open(scratch_image(&dir))
            .unwrap();

        image.resize(5_000_000).await.unwrap();
        assert!(runner.calls().is_empty());
        assert_eq!(image.size(), Some(5_000_000));

        image.resize(20_000_000).await.unwrap();
        assert_eq!(
            runner.calls(),
            [format!(
                "hdiutil resize {} -sectors 39063",
                image.path().display()
            )]
        );
        assert_eq!(image.size(), Some(20_000_000));

        assert!(matches!(
            image.resize(0).await,
            Err(HdiKitError::Validation(ValidationError::ZeroSize))
        ));
    }

    #[tokio::test]
    async fn busy_attached_image_is_detached_then_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_image(&dir);
        let runner = Arc::new(
            ScriptedRunner::new()
                .fail(BUSY)
                .ok(info_plist(&[(path.to_str().unwrap(), false)]))
                .ok("\"disk9\" ejected.\n")
                .ok(""),
        );
        let mut image = hdiutil(&runner, &[]).open(&path).unwrap();
        image.size = Some(5_000_000);

        image.resize(10_000_000).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 4);
        assert!(calls[0].starts_with("hdiutil resize"));
        assert_eq!(calls[1], "hdiutil info -plist");
        assert_eq!(calls[2], "hdiutil detach /dev/disk9");
        assert_eq!(calls[3], calls[0]);
    }

    #[tokio::test]
    async fn busy_detached_image_is_attached_and_retried_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            ScriptedRunner::new()
                .fail(BUSY)
                .ok(info_plist(&[]))
                .ok("encrypted: NO\n")
                .ok("/dev/disk9\tGUID_partition_scheme\n")
                .fail(BUSY),
        );
        let mut image = hdiutil(&runner, &[])
            .open(scratch_image(&dir))
            .unwrap();
        image.size = Some(5_000_000);

        let err = image.resize(10_000_000).await.unwrap_err();

        assert!(err.is_resource_unavailable());
        let calls = runner.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(
            calls
                .iter()
                .filter(|call| call.starts_with("hdiutil resize"))
                .count(),
            2
        );
        assert_eq!(
            calls
                .iter()
                .filter(|call| call.starts_with("hdiutil attach"))
                .count(),
            1
        );
        assert_eq!(calls[2], format!("hdiutil isencrypted {}", image.path().display()));
        assert_eq!(runner.remaining(), 0);
        assert_eq!(image.size(), Some(5_000_000));
    }

    #[tokio::test]
    async fn other_failures_are_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().fail("hdiutil: resize: failed. Invalid argument (22)"));
        let mut image = hdiutil(&runner, &[])
            .open(scratch_image(&dir))
            .unwrap();
        image.size = Some(5_000_000);

        let err = image.resize(1_000_000).await.unwrap_err();

        assert!(matches!(err, HdiKitError::Command(_)));
        assert!(err.to_string().contains("Invalid argument"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn info_finds_this_image_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_image(&dir);
        let plist = info_plist(&[("/elsewhere/other.dmg", true), (path.to_str().unwrap(), false)]);
        let runner = Arc::new(ScriptedRunner::new().ok(plist.clone()).ok(info_plist(&[])));
        let image = hdiutil(&runner, &[]).open(&path).unwrap();

        let found = image.info().await.unwrap().unwrap();
        assert_eq!(found.image_path, path);
        assert!(!found.image_encrypted);

        assert_eq!(image.info().await.unwrap(), None);
    }

    #[tokio::test]
    async fn attach_prompts_for_encrypted_images() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok(info_plist(&[]))
                .ok("encrypted: YES\nblocksize: 512\n")
                .ok(""),
        );
        let image = hdiutil(&runner, &["hunter2"])
            .open(scratch_image(&dir))
            .unwrap();

        image.attach().await.unwrap();

        let calls = runner.calls();
        assert_eq!(
            calls[2],
            format!("hdiutil attach {} -stdinpass", image.path().display())
        );
        assert_eq!(runner.stdin_of(2), Some(b"hunter2\0".to_vec()));
    }

    #[tokio::test]
    async fn unrecognized_isencrypted_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().ok(info_plist(&[])).ok("encrypted: MAYBE\n"));
        let image = hdiutil(&runner, &[])
            .open(scratch_image(&dir))
            .unwrap();

        let err = image.is_encrypted().await.unwrap_err();
        assert!(matches!(err, HdiKitError::Format(FormatError::Value { .. })));
    }

    #[tokio::test]
    async fn same_named_image_elsewhere_is_not_this_image() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok(info_plist(&[("/Volumes/Backup/scratch.dmg", false)]))
                .ok(info_plist(&[("/Volumes/Backup/scratch.dmg", false)])),
        );
        let image = hdiutil(&runner, &[])
            .open(scratch_image(&dir))
            .unwrap();

        assert!(!image.is_mounted().await.unwrap());
        let err = image.detach().await.unwrap_err();
        assert!(matches!(
            err,
            HdiKitError::NotFound(NotFoundError::NotAttached(_))
        ));
        assert_eq!(runner.calls(), ["hdiutil info -plist", "hdiutil info -plist"]);
    }

    #[tokio::test]
    async fn exact_path_wins_over_earlier_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_image(&dir);
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok(info_plist(&[
                    ("/Volumes/Backup/scratch.dmg", false),
                    (path.to_str().unwrap(), false),
                ]))
                .ok(""),
        );
        let image = hdiutil(&runner, &[]).open(&path).unwrap();

        image.detach().await.unwrap();

        assert_eq!(runner.calls()[1], "hdiutil detach /dev/disk10");
    }

    #[tokio::test]
    async fn symlinked_paths_resolve_to_the_same_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_image(&dir);
        let link = dir.path().join("link.dmg");
        std::os::unix::fs::symlink(&path, &link).unwrap();
        let runner = Arc::new(
            ScriptedRunner::new().ok(info_plist(&[(link.to_str().unwrap(), false)])),
        );

        let image = hdiutil(&runner, &[]).open(&link).unwrap();

        assert_eq!(image.path(), path);
        assert_eq!(image.device().await.unwrap().as_deref(), Some("/dev/disk9"));
    }

    #[tokio::test]
    async fn detach_requires_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().ok(info_plist(&[])));
        let image = hdiutil(&runner, &[])
            .open(scratch_image(&dir))
            .unwrap();

        let err = image.detach().await.unwrap_err();
        assert!(matches!(
            err,
            HdiKitError::NotFound(NotFoundError::NotAttached(_))
        ));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn load_reads_diskutil_info() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_image(&dir);
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok(info_plist(&[]))
                .ok(info_plist(&[]))
                .ok("encrypted: NO\n")
                .ok("/dev/disk9\tGUID_partition_scheme\n")
                .ok(info_plist(&[(path.to_str().unwrap(), false)]))
                .ok(DISKUTIL_INFO),
        );

        let image = hdiutil(&runner, &[]).load(&path).await.unwrap();

        assert_eq!(runner.calls()[5], "diskutil info /Volumes/Scratch");
        assert!(!image.is_created());
        assert_eq!(image.volume_name(), Some("Scratch"));
        assert_eq!(image.file_system(), Some(FileSystem::JournaledHfs));
        assert_eq!(image.size(), Some(104_857_600));
        assert_eq!(image.image_type(), ImageType::Udif);
        assert_eq!(image.encryption(), None);
    }

    #[tokio::test]
    async fn rename_goes_through_the_mount_point() {
        let dir = tempfile::tempdir().unwrap();
        let path = scratch_image(&dir);
        let runner = Arc::new(
            ScriptedRunner::new()
                .ok(info_plist(&[(path.to_str().unwrap(), false)]))
                .ok(""),
        );
        let mut image = hdiutil(&runner, &[]).open(&path).unwrap();

        image.change_volume_name("Renamed").await.unwrap();

        assert_eq!(runner.calls()[1], "diskutil rename /Volumes/Scratch Renamed");
        assert_eq!(image.volume_name(), Some("Renamed"));
    }

    #[tokio::test]
    async fn change_password_sends_both_passwords() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().ok(""));
        let image = hdiutil(&runner, &["old", "new", "new"])
            .open(scratch_image(&dir))
            .unwrap();

        image.change_password().await.unwrap();

        assert_eq!(
            runner.calls(),
            [format!(
                "hdiutil chpass {} -oldstdinpass -newstdinpass",
                image.path().display()
            )]
        );
        assert_eq!(runner.stdin_of(0), Some(b"old\0new\0".to_vec()));
    }

    #[tokio::test]
    async fn image_info_is_a_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().ok(
            r#"<?xml version="1.0" encoding="UTF-8"?><plist version="1.0"><dict><key>Format</key><string>UDRW</string><key>Format Description</key><string>raw read/write</string></dict></plist>"#,
        ));
        let image = hdiutil(&runner, &[])
            .open(scratch_image(&dir))
            .unwrap();

        let info = image.image_info().await.unwrap();
        let format = info
            .get("Format")
            .and_then(plist::Value::as_string)
            .unwrap();
        assert_eq!(ImageType::from_format_code(format), Some(ImageType::Udif));
    }

    #[test]
    fn image_extensions() {
        assert_eq!(
            with_image_extension(Path::new("/tmp/a"), ImageType::Sparse),
            PathBuf::from("/tmp/a.sparseimage")
        );
        assert_eq!(
            with_image_extension(Path::new("/tmp/a.dmg"), ImageType::Udif),
            PathBuf::from("/tmp/a.dmg")
        );
        assert_eq!(
            with_image_extension(Path::new("/tmp/a.v2"), ImageType::Udif),
            PathBuf::from("/tmp/a.v2.dmg")
        );
    }

    #[tokio::test]
    async fn display_lists_known_fields() {
        let dir = tempfile::tempdir().unwrap();
        let image = HdiUtil::default().open(scratch_image(&dir)).unwrap();

        let rendered = image.to_string();
        assert!(rendered.contains("type                UDIF"));
        assert!(rendered.contains("size                -"));
        assert!(rendered.contains("created             false"));
    }
}
