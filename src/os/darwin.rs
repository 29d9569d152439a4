mod hdiutil;

pub use hdiutil::{HdiUtilImage, HdiUtilInfoOutput, SystemEntity};
