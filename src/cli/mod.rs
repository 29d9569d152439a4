/*! The `hdikit` command line

Each subcommand maps onto one [`DiskImage`](crate::DiskImage) operation. Machine-readable output
(`info`, `image-info`, `disk-info`) is JSON on stdout; logs and prompts go to stderr.
*/
pub mod arg;
pub mod subcommand;

use std::process::ExitCode;

use clap::Parser;
use eyre::WrapErr;

use crate::{settings::ToolSettings, HdiUtil};

#[async_trait::async_trait]
pub trait CommandExecute {
    async fn execute(self, hdiutil: HdiUtil) -> eyre::Result<ExitCode>;
}

/// Create, attach and inspect macOS disk images
#[derive(Debug, Parser)]
#[clap(version)]
pub struct HdiKitCli {
    #[clap(flatten)]
    pub instrumentation: arg::Instrumentation,

    #[clap(flatten)]
    pub tools: ToolSettings,

    #[clap(subcommand)]
    pub subcommand: subcommand::HdiKitSubcommand,
}

impl HdiKitCli {
    #[tracing::instrument(level = "debug", skip_all, fields(
        hdiutil = %self.tools.hdiutil,
        diskutil = %self.tools.diskutil,
        shell = %self.tools.shell.display(),
    ))]
    pub async fn execute(self) -> eyre::Result<ExitCode> {
        let Self {
            instrumentation: _,
            tools,
            subcommand,
        } = self;

        let tools = tools.resolve().wrap_err("Locating disk image tools")?;
        let hdiutil = HdiUtil::new(tools);

        subcommand.execute(hdiutil).await
    }
}
