use std::{io::IsTerminal, process::ExitCode};

use clap::Parser;

#[tokio::main]
async fn main() -> eyre::Result<ExitCode> {
    color_eyre::config::HookBuilder::default()
        .theme(if !std::io::stderr().is_terminal() {
            color_eyre::config::Theme::new()
        } else {
            color_eyre::config::Theme::dark()
        })
        .install()?;

    let cli = hdikit::cli::HdiKitCli::parse();

    cli.instrumentation.setup()?;

    tracing::debug!("hdikit v{}", env!("CARGO_PKG_VERSION"));

    cli.execute().await
}
