//! Collaborator abstractions consumed by the command core.
//!
//! The core never renders, enumerates installed software, or runs
//! processes itself. It talks to these traits; the desktop implementations
//! here back the `hitch` binary.

mod buffered;
mod desktop;
mod services;

pub use buffered::BufferedOutput;
pub use desktop::{ConfiguredApps, SystemShell};
pub use services::{
    AppGroup, AppInfo, AppService, InputSink, OutputCategory, OutputSink,
    SessionEvents, ShellCallback, ShellChannel, ShellResult, now_millis, unspaced_lowercase,
};
