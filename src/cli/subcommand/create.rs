use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use owo_colors::OwoColorize;

use crate::{cli::CommandExecute, image::CreateOptions, HdiUtil};

/// Create a new disk image
#[derive(Debug, Parser)]
pub struct Create {
    /// Where to create the image, the extension is added when missing
    pub path: PathBuf,
    #[clap(flatten)]
    pub options: CreateOptions,
}

#[async_trait::async_trait]
impl CommandExecute for Create {
    #[tracing::instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn execute(self, hdiutil: HdiUtil) -> eyre::Result<ExitCode> {
        let Self { path, options } = self;

        let spec = hdiutil.spec(&path, &options)?;
        let image = hdiutil.create(spec).await?;

        tracing::info!("Created {}", image.path().display().bold());
        print!("{image}");
        Ok(ExitCode::SUCCESS)
    }
}
