use std::{path::PathBuf, process::ExitCode};

use clap::Parser;

use crate::{cli::CommandExecute, HdiUtil};

/// Print `true` if the image is encrypted, `false` otherwise
#[derive(Debug, Parser)]
pub struct IsEncrypted {
    pub path: PathBuf,
}

#[async_trait::async_trait]
impl CommandExecute for IsEncrypted {
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn execute(self, hdiutil: HdiUtil) -> eyre::Result<ExitCode> {
        let encrypted = hdiutil.open(&self.path)?.is_encrypted().await?;
        println!("{encrypted}");
        Ok(ExitCode::SUCCESS)
    }
}
