//! The poll cycle and the thread that drives it.

use chrono::Utc;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use responder_module::Responder;

use crate::adapters::notion::{AdapterError, Comment, DocumentClient};
use crate::comment_aggregator::{aggregate_comments, quote_map};
use crate::config::{ConfigError, PollerConfig};
use crate::dispatcher::{DispatchOutcome, ResponseDispatcher};
use crate::index_resolver::resolve_watch_list;
use crate::state_store::{ProcessedState, StateStore, StateStoreError};
use crate::thread_resolver::{resolve_threads, ThreadAction};

/// Delay before the first cycle after start.
pub const STARTUP_DELAY: Duration = Duration::from_secs(10);
const SLEEP_SLICE: Duration = Duration::from_millis(250);

#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("state store error: {0}")]
    State(#[from] StateStoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters for one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub pages_polled: usize,
    pub pages_failed: usize,
    pub replies_posted: usize,
    pub comments_skipped: usize,
    pub posts_failed: usize,
    pub deferred: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle was still running.
    Skipped,
}

/// Clears the running flag when the cycle ends, including by panic.
struct CycleGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> CycleGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

pub struct NotionPoller {
    config: PollerConfig,
    client: Arc<dyn DocumentClient>,
    responder: Arc<dyn Responder>,
    store: StateStore,
    bot_user_id: Option<String>,
    cycle_running: AtomicBool,
}

impl NotionPoller {
    /// Build a poller. When no integration user id is configured the
    /// document service is asked for it once.
    pub fn new(
        config: PollerConfig,
        client: Arc<dyn DocumentClient>,
        responder: Arc<dyn Responder>,
    ) -> Self {
        let bot_user_id = match &config.integration_user_id {
            Some(id) => Some(id.clone()),
            None => match client.current_user_id() {
                Ok(id) => {
                    info!("Resolved integration user id {}", id);
                    Some(id)
                }
                Err(e) => {
                    warn!(
                        "Could not resolve integration user id ({}); relying on recorded reply ids",
                        e
                    );
                    None
                }
            },
        };

        Self {
            store: StateStore::new(config.state_path.clone()),
            config,
            client,
            responder,
            bot_user_id,
            cycle_running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn bot_user_id(&self) -> Option<&str> {
        self.bot_user_id.as_deref()
    }

    /// Run one full cycle over every watched page and persist the result.
    pub fn poll_once(&self) -> Result<CycleOutcome, PollerError> {
        let Some(_guard) = CycleGuard::acquire(&self.cycle_running) else {
            warn!("Previous Notion poll cycle is still running; skipping this trigger");
            return Ok(CycleOutcome::Skipped);
        };

        let mut state = self.store.load();
        let pages = resolve_watch_list(
            self.client.as_ref(),
            self.config.index_page.as_deref(),
            &self.config.watched_pages,
        );
        if pages.is_empty() {
            info!("No Notion pages to watch this cycle");
        }

        let mut report = CycleReport::default();
        for page_id in &pages {
            match self.poll_page(page_id, &mut state, &mut report) {
                Ok(()) => report.pages_polled += 1,
                Err(e) => {
                    report.pages_failed += 1;
                    warn!("Skipping page {} this cycle: {}", page_id, e);
                }
            }
        }

        state.last_poll_at = Some(Utc::now());
        self.store.save(&state)?;

        info!(
            "Notion poll cycle done: {} page(s) polled, {} failed, {} repl(ies) posted, {} skipped, {} post failure(s), {} deferred",
            report.pages_polled,
            report.pages_failed,
            report.replies_posted,
            report.comments_skipped,
            report.posts_failed,
            report.deferred
        );
        Ok(CycleOutcome::Completed(report))
    }

    fn poll_page(
        &self,
        page_id: &str,
        state: &mut ProcessedState,
        report: &mut CycleReport,
    ) -> Result<(), AdapterError> {
        let aggregated = aggregate_comments(self.client.as_ref(), page_id)?;
        if aggregated.is_empty() {
            debug!("Page {} has no comments", page_id);
            return Ok(());
        }

        let quotes = quote_map(&aggregated);
        let comments: Vec<Comment> = aggregated.into_iter().map(|item| item.comment).collect();
        let processed = state.processed_ids(page_id);
        let actions = resolve_threads(
            &comments,
            &quotes,
            &processed,
            self.bot_user_id.as_deref(),
        );

        let dispatcher = ResponseDispatcher::new(
            self.client.as_ref(),
            self.responder.as_ref(),
            self.config.responder_failure_policy,
        );
        let mut page_title: Option<Option<String>> = None;

        for action in actions {
            match action {
                ThreadAction::Skip { comment_id, reason } => {
                    debug!(
                        "Marking comment {} on page {} processed without reply ({:?})",
                        comment_id, page_id, reason
                    );
                    state.mark_processed(page_id, &comment_id);
                    report.comments_skipped += 1;
                }
                ThreadAction::Answer {
                    thread,
                    latest,
                    text,
                    quote,
                } => {
                    let title = page_title.get_or_insert_with(|| self.page_title(page_id));
                    let outcome = dispatcher.answer(
                        title.as_deref(),
                        &thread.discussion_id,
                        &latest.id,
                        &text,
                        quote.as_ref().map(|q| q.text.as_str()),
                    );
                    match outcome {
                        DispatchOutcome::Replied { reply_id } => {
                            state.mark_processed(page_id, &latest.id);
                            state.mark_processed(page_id, &reply_id);
                            report.replies_posted += 1;
                        }
                        DispatchOutcome::PostFailed => {
                            warn!(
                                "Comment {} in discussion {} on page {} stays unprocessed; retrying next cycle",
                                latest.id, thread.discussion_id, page_id
                            );
                            report.posts_failed += 1;
                        }
                        DispatchOutcome::Deferred => report.deferred += 1,
                    }
                }
            }
        }

        Ok(())
    }

    fn page_title(&self, page_id: &str) -> Option<String> {
        match self.client.get_page(page_id) {
            Ok(page) => page.title.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!("Failed to fetch title of page {}: {}", page_id, e);
                None
            }
        }
    }
}

/// Handle to the running poller thread.
pub struct PollerControl {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PollerControl {
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn stop_and_join(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Notion comment poller thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PollerControl {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn the thread that runs a cycle after `startup_delay` and then every
/// `interval` until stopped.
pub fn start_poller_thread(
    poller: Arc<NotionPoller>,
    startup_delay: Duration,
    interval: Duration,
) -> Result<PollerControl, PollerError> {
    start_poller_thread_with(move || poller, startup_delay, interval)
}

/// Like `start_poller_thread`, but the poller is built on the spawned thread.
///
/// The HTTP clients block, so they must not be created or used on an async
/// runtime thread.
pub fn start_poller_thread_with<F>(
    build: F,
    startup_delay: Duration,
    interval: Duration,
) -> Result<PollerControl, PollerError>
where
    F: FnOnce() -> Arc<NotionPoller> + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let handle = {
        let stop = stop.clone();
        thread::Builder::new()
            .name("notion-comments-poller".to_string())
            .spawn(move || {
                let poller = build();
                run_loop(&poller, &stop, startup_delay, interval);
            })?
    };

    Ok(PollerControl {
        stop,
        handle: Some(handle),
    })
}

fn run_loop(poller: &NotionPoller, stop: &AtomicBool, startup_delay: Duration, interval: Duration) {
    info!(
        "Starting Notion comment poller: first cycle in {}s, then every {}s",
        startup_delay.as_secs(),
        interval.as_secs()
    );

    if sleep_unless_stopped(stop, startup_delay) {
        info!("Notion comment poller stopped");
        return;
    }

    while !stop.load(Ordering::Relaxed) {
        run_guarded_cycle(poller);
        if sleep_unless_stopped(stop, interval) {
            break;
        }
    }

    info!("Notion comment poller stopped");
}

fn run_guarded_cycle(poller: &NotionPoller) {
    match panic::catch_unwind(AssertUnwindSafe(|| poller.poll_once())) {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!("Notion poll cycle failed: {}", e),
        Err(_) => error!("Notion poll cycle panicked; continuing with the next cycle"),
    }
}

/// Sleep for `total` in short slices. Returns true when stopped early.
fn sleep_unless_stopped(stop: &AtomicBool, total: Duration) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if stop.load(Ordering::Relaxed) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}
