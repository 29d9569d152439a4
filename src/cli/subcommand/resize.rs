use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use eyre::WrapErr;

use crate::{cli::CommandExecute, size, HdiUtil};

/// Change the size of a disk image, leaving it attached
///
/// The image is attached to read its current size and is not detached afterwards.
#[derive(Debug, Parser)]
pub struct Resize {
    pub path: PathBuf,
    /// New size, like `200m` or `2 GB`
    pub size: String,
}

#[async_trait::async_trait]
impl CommandExecute for Resize {
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display(), size = %self.size))]
    async fn execute(self, hdiutil: HdiUtil) -> eyre::Result<ExitCode> {
        let Self {
            path,
            size: new_size,
        } = self;
        let bytes = size::to_bytes(&new_size)?;

        let mut image = hdiutil
            .load(&path)
            .await
            .wrap_err_with(|| format!("Reading the current size of `{}`", path.display()))?;
        image.resize(bytes).await?;

        tracing::info!(size = %size::to_human_readable(bytes), "Resized");
        Ok(ExitCode::SUCCESS)
    }
}
