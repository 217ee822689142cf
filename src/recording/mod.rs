pub mod artifact;
pub mod capture;
pub mod watchdog;

pub use artifact::{AudioEncoding, RecordingArtifact};
pub use capture::CaptureSession;
pub use watchdog::{SilenceWatchdog, WatchdogConfig, WatchdogVerdict};
