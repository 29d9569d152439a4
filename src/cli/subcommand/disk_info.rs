use std::{path::PathBuf, process::ExitCode};

use clap::Parser;

use crate::{cli::CommandExecute, HdiUtil};

use super::print_json;

/// Print `diskutil info` for the volume of an image as JSON, leaving it attached
#[derive(Debug, Parser)]
pub struct DiskInfo {
    pub path: PathBuf,
}

#[async_trait::async_trait]
impl CommandExecute for DiskInfo {
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn execute(self, hdiutil: HdiUtil) -> eyre::Result<ExitCode> {
        let disk_info = hdiutil.open(&self.path)?.diskutil_info().await?;
        print_json(&disk_info)?;
        Ok(ExitCode::SUCCESS)
    }
}
