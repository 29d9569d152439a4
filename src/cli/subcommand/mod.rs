mod attach;
use attach::Attach;
mod chpass;
use chpass::ChangePassword;
mod create;
use create::Create;
mod detach;
use detach::Detach;
mod disk_info;
use disk_info::DiskInfo;
mod image_info;
use image_info::ImageInfo;
mod info;
use info::Info;
mod is_encrypted;
use is_encrypted::IsEncrypted;
mod rename;
use rename::Rename;
mod resize;
use resize::Resize;

use std::process::ExitCode;

use crate::{cli::CommandExecute, HdiUtil};

#[derive(Debug, clap::Subcommand)]
pub enum HdiKitSubcommand {
    Create(Create),
    Attach(Attach),
    Detach(Detach),
    Resize(Resize),
    Info(Info),
    ImageInfo(ImageInfo),
    IsEncrypted(IsEncrypted),
    Rename(Rename),
    Chpass(ChangePassword),
    DiskInfo(DiskInfo),
}

#[async_trait::async_trait]
impl CommandExecute for HdiKitSubcommand {
    async fn execute(self, hdiutil: HdiUtil) -> eyre::Result<ExitCode> {
        match self {
            Self::Create(create) => create.execute(hdiutil).await,
            Self::Attach(attach) => attach.execute(hdiutil).await,
            Self::Detach(detach) => detach.execute(hdiutil).await,
            Self::Resize(resize) => resize.execute(hdiutil).await,
            Self::Info(info) => info.execute(hdiutil).await,
            Self::ImageInfo(image_info) => image_info.execute(hdiutil).await,
            Self::IsEncrypted(is_encrypted) => is_encrypted.execute(hdiutil).await,
            Self::Rename(rename) => rename.execute(hdiutil).await,
            Self::Chpass(chpass) => chpass.execute(hdiutil).await,
            Self::DiskInfo(disk_info) => disk_info.execute(hdiutil).await,
        }
    }
}

/// Pretty JSON on stdout
fn print_json(value: &impl serde::Serialize) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
