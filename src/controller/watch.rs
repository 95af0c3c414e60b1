//! CSV watch feeding the event handler
//!
//! Wraps `kube::runtime::watcher` in a reflector so the handler can list the
//! labelled CSVs of a namespace when resolving replacement chains. Events
//! seen while the initial list is still streaming in are not forwarded; once
//! the list completes (`InitDone`) the cache is marked synced and every
//! cached CSV is delivered as an update. The same full re-delivery runs every
//! resync period so that notifications dropped on a full channel are
//! eventually replaced by the current state.

use crate::controller::handler::{EventHandler, WatchEvent};
use crate::crd::csv::{Csv, OPERATOR_NAME_LABEL};
use crate::server::ShutdownSignal;
use futures::StreamExt;
use kube::runtime::reflector::{self, store::Writer, Store};
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::Api;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Period of the full re-delivery of cached CSVs
pub const DEFAULT_RESYNC_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Shortest resync period `CsvWatch` will run with
pub const MIN_RESYNC_PERIOD: Duration = Duration::from_secs(1);

/// Create the cache-synced signal pair
pub fn cache_sync_channel() -> (CacheSyncNotifier, CacheSync) {
    let (tx, rx) = watch::channel(false);
    (CacheSyncNotifier { tx }, CacheSync { rx })
}

/// Set by the watch once the initial CSV list has been cached
pub struct CacheSyncNotifier {
    tx: watch::Sender<bool>,
}

impl CacheSyncNotifier {
    pub fn synced(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_synced(&self) -> bool {
        *self.tx.borrow()
    }
}

#[derive(Clone)]
pub struct CacheSync {
    rx: watch::Receiver<bool>,
}

impl CacheSync {
    /// Wait for the cache to sync; `false` if the watch went away first
    pub async fn wait(&mut self) -> bool {
        self.rx.wait_for(|synced| *synced).await.is_ok()
    }

    pub fn is_synced(&self) -> bool {
        *self.rx.borrow()
    }
}

pub struct CsvWatch {
    api: Api<Csv>,
    writer: Writer<Csv>,
    handler: Arc<EventHandler>,
    resync_period: Duration,
}

impl CsvWatch {
    /// `writer` must belong to the store the handler lists from
    pub fn new(
        api: Api<Csv>,
        writer: Writer<Csv>,
        handler: Arc<EventHandler>,
        resync_period: Duration,
    ) -> Self {
        CsvWatch {
            api,
            writer,
            handler,
            resync_period,
        }
    }

    pub async fn run(self, notifier: CacheSyncNotifier, mut shutdown: ShutdownSignal) {
        let CsvWatch {
            api,
            writer,
            handler,
            resync_period,
        } = self;

        let reader = writer.as_reader();
        let config = watcher::Config::default().labels(OPERATOR_NAME_LABEL);
        let mut events = pin!(reflector::reflector(
            writer,
            watcher::watcher(api, config).default_backoff()
        ));

        // interval_at panics on a zero period
        let resync_period = resync_period.max(MIN_RESYNC_PERIOD);
        let mut resync = tokio::time::interval_at(
            tokio::time::Instant::now() + resync_period,
            resync_period,
        );
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(selector = OPERATOR_NAME_LABEL, "starting CSV watch");
        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    info!("stopping CSV watch");
                    break;
                }
                _ = resync.tick() => {
                    if notifier.is_synced() {
                        debug!("resyncing cached CSVs");
                        redeliver(&reader, &handler);
                    }
                }
                next = events.next() => match next {
                    Some(Ok(event)) => dispatch(event, &reader, &handler, &notifier),
                    Some(Err(e)) => warn!(error = %e, "CSV watch error, retrying"),
                    None => {
                        warn!("CSV watch stream ended");
                        break;
                    }
                },
            }
        }
    }
}

/// Route one watcher event to the handler
pub(crate) fn dispatch(
    event: Event<Csv>,
    reader: &Store<Csv>,
    handler: &EventHandler,
    notifier: &CacheSyncNotifier,
) {
    match event {
        Event::Apply(csv) => handler.handle(WatchEvent::Applied(Arc::new(csv))),
        Event::Delete(csv) => handler.handle(WatchEvent::Deleted(Arc::new(csv))),
        Event::Init => debug!("listing CSVs"),
        Event::InitApply(_) => {}
        Event::InitDone => {
            if !notifier.is_synced() {
                info!("CSV cache synced");
                notifier.synced();
            }
            redeliver(reader, handler);
        }
    }
}

/// Deliver every cached CSV to the handler as an update
pub(crate) fn redeliver(reader: &Store<Csv>, handler: &EventHandler) {
    for csv in reader.state() {
        handler.handle(WatchEvent::Applied(csv));
    }
}

#[cfg(test)]
#[path = "watch_test.rs"]
mod tests;
