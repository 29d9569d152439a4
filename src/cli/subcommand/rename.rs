use std::{path::PathBuf, process::ExitCode};

use clap::Parser;

use crate::{cli::CommandExecute, HdiUtil};

/// Rename the volume of a disk image, leaving it attached
///
/// An image that is not mounted yet is attached first and stays attached afterwards.
#[derive(Debug, Parser)]
pub struct Rename {
    pub path: PathBuf,
    /// The new volume name
    pub name: String,
}

#[async_trait::async_trait]
impl CommandExecute for Rename {
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display(), name = %self.name))]
    async fn execute(self, hdiutil: HdiUtil) -> eyre::Result<ExitCode> {
        let Self { path, name } = self;

        let mut image = hdiutil.load(&path).await?;
        let previous = image.volume_name().unwrap_or_default().to_string();
        image.change_volume_name(&name).await?;

        tracing::info!(%previous, "Renamed volume to `{name}`");
        Ok(ExitCode::SUCCESS)
    }
}
