/*! Typed disk image operations over macOS `hdiutil` and `diskutil`

[`HdiUtil`] creates and loads [`DiskImage`]s; every operation on an image turns into one or more
`hdiutil`/`diskutil` invocations run through a [`CommandRunner`](runner::CommandRunner).

```rust,no_run
use hdikit::{CreateOptions, HdiUtil};

# async fn run() -> Result<(), hdikit::HdiKitError> {
let hdiutil = HdiUtil::default();
let options = CreateOptions {
    size: Some("100m".into()),
    volname: Some("Scratch".into()),
    ..Default::default()
};
let image = hdiutil.create(hdiutil.spec("~/scratch.dmg", &options)?).await?;

image.attach().await?;
println!("Mounted at {:?}", image.mount_point().await?);
image.detach().await?;
# Ok(())
# }
```

Operations are `async` but strictly sequential: each awaits its subprocess before returning.
Command lines are passed to a shell unquoted, so paths and names containing shell metacharacters
must not come from untrusted input.
*/

#[cfg(feature = "cli")]
pub mod cli;
pub mod command;
mod disk_image;
mod error;
mod hdiutil;
pub mod image;
pub mod interaction;
pub mod os;
pub mod parse;
pub mod runner;
pub mod settings;
pub mod size;
pub mod validate;

pub use disk_image::DiskImage;
pub use error::{HdiKitError, NotFoundError};
pub use hdiutil::HdiUtil;
pub use image::{CreateOptions, DiskImageSpec, Encryption, FileSystem, ImageType};
pub use settings::{CreateDefaults, ToolSettings};
