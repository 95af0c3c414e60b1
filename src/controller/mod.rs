pub mod builder;
pub mod clock;
pub mod handler;
pub mod monitor;
pub mod notification;
pub mod replace;
pub mod reporter;
pub mod watch;
pub mod writer;

#[cfg(test)]
pub mod fixtures;

pub use handler::{CsvLister, EventHandler, WatchEvent};
pub use monitor::{new_monitor, Monitor, MonitorError, MonitorState, RunHandle};
pub use notification::{NotificationContext, NotificationSender, Sender};
pub use reporter::Reporter;
pub use watch::{cache_sync_channel, CsvWatch};
pub use writer::{ClusterOperatorClient, KubeClusterOperatorClient, StatusWriter, WriterError};
