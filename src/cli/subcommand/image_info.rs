use std::{path::PathBuf, process::ExitCode};

use clap::Parser;

use crate::{cli::CommandExecute, HdiUtil};

use super::print_json;

/// Print `hdiutil imageinfo` as JSON
#[derive(Debug, Parser)]
pub struct ImageInfo {
    pub path: PathBuf,
}

#[async_trait::async_trait]
impl CommandExecute for ImageInfo {
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn execute(self, hdiutil: HdiUtil) -> eyre::Result<ExitCode> {
        let image_info = hdiutil.open(&self.path)?.image_info().await?;
        print_json(&image_info)?;
        Ok(ExitCode::SUCCESS)
    }
}
