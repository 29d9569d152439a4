use std::{path::PathBuf, process::ExitCode};

use clap::Parser;

use crate::{cli::CommandExecute, HdiUtil};

/// Change the password of an encrypted disk image
#[derive(Debug, Parser)]
pub struct ChangePassword {
    pub path: PathBuf,
}

#[async_trait::async_trait]
impl CommandExecute for ChangePassword {
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn execute(self, hdiutil: HdiUtil) -> eyre::Result<ExitCode> {
        let image = hdiutil.open(&self.path)?;
        if !image.is_encrypted().await? {
            eyre::bail!("`{}` is not encrypted", image.path().display());
        }

        image.change_password().await?;
        tracing::info!("Changed password");
        Ok(ExitCode::SUCCESS)
    }
}
