use std::{path::PathBuf, process::ExitCode};

use clap::Parser;

use crate::{cli::CommandExecute, HdiUtil};

/// Attach a disk image, printing where it was mounted
#[derive(Debug, Parser)]
pub struct Attach {
    pub path: PathBuf,
}

#[async_trait::async_trait]
impl CommandExecute for Attach {
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn execute(self, hdiutil: HdiUtil) -> eyre::Result<ExitCode> {
        let image = hdiutil.open(&self.path)?;
        image.attach().await?;

        if let Some(mount_point) = image.mount_point().await? {
            println!("{}", mount_point.display());
        }
        Ok(ExitCode::SUCCESS)
    }
}
