mod instrumentation;
pub use instrumentation::{Instrumentation, Logger};
