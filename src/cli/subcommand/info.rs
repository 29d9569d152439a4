use std::{path::PathBuf, process::ExitCode};

use clap::Parser;

use crate::{cli::CommandExecute, HdiUtil};

use super::print_json;

/// Print the `hdiutil info` entry of an image as JSON, `null` when it is not attached
#[derive(Debug, Parser)]
pub struct Info {
    pub path: PathBuf,
}

#[async_trait::async_trait]
impl CommandExecute for Info {
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn execute(self, hdiutil: HdiUtil) -> eyre::Result<ExitCode> {
        let info = hdiutil.open(&self.path)?.info().await?;
        print_json(&info)?;
        Ok(ExitCode::SUCCESS)
    }
}
