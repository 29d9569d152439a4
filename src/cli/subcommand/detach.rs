use std::{path::PathBuf, process::ExitCode};

use clap::Parser;

use crate::{cli::CommandExecute, HdiUtil};

/// Detach an attached disk image
#[derive(Debug, Parser)]
pub struct Detach {
    pub path: PathBuf,
}

#[async_trait::async_trait]
impl CommandExecute for Detach {
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn execute(self, hdiutil: HdiUtil) -> eyre::Result<ExitCode> {
        hdiutil.open(&self.path)?.detach().await?;
        Ok(ExitCode::SUCCESS)
    }
}
