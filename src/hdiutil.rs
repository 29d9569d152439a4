use std::{path::Path, sync::Arc};

use crate::{
    command::CommandLine,
    disk_image::DiskImage,
    image::{expand_home, CreateOptions, DiskImageSpec, ImageType},
    interaction::{PasswordPrompt, TerminalPrompt},
    os::darwin::HdiUtilInfoOutput,
    parse,
    runner::{CommandError, CommandResult, CommandRunner, ShellRunner},
    settings::{CreateDefaults, ToolSettings},
    HdiKitError, NotFoundError,
};

/** Entry point for disk image operations

Holds the [`CommandRunner`] every command goes through, the [`PasswordPrompt`] used for encrypted
images, the tool locations and the [`CreateDefaults`] applied to new images. Cloning is cheap; each
[`DiskImage`] carries its own clone.
*/
#[derive(Debug, Clone)]
pub struct HdiUtil {
    runner: Arc<dyn CommandRunner>,
    prompt: Arc<dyn PasswordPrompt>,
    tools: ToolSettings,
    defaults: CreateDefaults,
}

impl Default for HdiUtil {
    fn default() -> Self {
        Self::new(ToolSettings::default())
    }
}

impl HdiUtil {
    pub fn new(tools: ToolSettings) -> Self {
        Self {
            runner: Arc::new(ShellRunner::new(tools.shell.clone())),
            prompt: Arc::new(TerminalPrompt),
            tools,
            defaults: CreateDefaults::default(),
        }
    }

    pub fn with_runner(self, runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner, ..self }
    }

    pub fn with_prompt(self, prompt: Arc<dyn PasswordPrompt>) -> Self {
        Self { prompt, ..self }
    }

    pub fn with_defaults(self, defaults: CreateDefaults) -> Self {
        Self { defaults, ..self }
    }

    pub fn defaults(&self) -> &CreateDefaults {
        &self.defaults
    }

    pub fn tools(&self) -> &ToolSettings {
        &self.tools
    }

    pub(crate) fn prompt(&self) -> &dyn PasswordPrompt {
        self.prompt.as_ref()
    }

    pub(crate) fn hdiutil(&self, verb: &str) -> CommandLine {
        CommandLine::new(&self.tools.hdiutil, verb)
    }

    pub(crate) fn diskutil(&self, verb: &str) -> CommandLine {
        CommandLine::new(&self.tools.diskutil, verb)
    }

    pub(crate) async fn run(
        &self,
        command: &CommandLine,
        stdin: Option<&[u8]>,
    ) -> Result<CommandResult, CommandError> {
        self.runner.run(command, stdin).await
    }

    /// Validate `options` against the schema of `hdiutil create`, filling gaps from the defaults
    pub fn spec(
        &self,
        path: impl AsRef<Path>,
        options: &CreateOptions,
    ) -> Result<DiskImageSpec, HdiKitError> {
        DiskImageSpec::from_options(path, options, &self.defaults)
    }

    /// Create a new disk image
    pub async fn create(&self, spec: DiskImageSpec) -> Result<DiskImage, HdiKitError> {
        DiskImage::create(self.clone(), spec).await
    }

    /// Refer to an existing disk image without running any command
    ///
    /// The path is made absolute with symlinks resolved, the form `hdiutil info` is matched in.
    ///
    /// Only the path and the image type (from the extension) are known until
    /// [`DiskImage::update`] is called.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<DiskImage, HdiKitError> {
        let path = expand_home(path.as_ref());
        let path = path
            .canonicalize()
            .map_err(|_| NotFoundError::Image(path.clone()))?;
        let image_type = ImageType::from_path(&path)?;
        Ok(DiskImage::existing(self.clone(), path, image_type))
    }

    /// Build a [`DiskImage`] from an existing disk image, attaching it to read its properties
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<DiskImage, HdiKitError> {
        let mut image = self.open(path)?;
        image.update().await?;
        Ok(image)
    }

    /// Every image `hdiutil` currently has attached
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn info(&self) -> Result<HdiUtilInfoOutput, HdiKitError> {
        let mut command = self.hdiutil("info");
        command.flag("plist");
        let output = self.run(&command, None).await?;
        Ok(parse::plist(&command, &output.stdout)?)
    }

    /// Rename the volume at `target` (a mount point, device or volume name)
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn rename_volume(&self, target: &str, new_name: &str) -> Result<(), HdiKitError> {
        let mut command = self.diskutil("rename");
        command.arg(target).arg(new_name);
        self.run(&command, None).await?;
        Ok(())
    }
}
