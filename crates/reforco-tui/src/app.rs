//! Application state management for the Reforço calendar.
//!
//! This module contains the core `App` struct that holds UI state, the
//! lessons of the month on screen and the coordination of background loads.
//! Each load goes through the read-through cache: a cached copy is painted
//! first, the backing store is queried in a spawned task and the result comes
//! back over a channel.

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use reforco_core::cache::format_age;
use reforco_core::models::Lesson;
use reforco_core::offline::{preview, read_through, LoadState, Loaded};
use reforco_core::{BackendClient, CacheManager, CalendarMonth, Config, FetchError};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background load channel.
/// Only the latest load matters, a few slots absorb quick month flipping.
const CHANNEL_BUFFER_SIZE: usize = 8;

/// Number of lessons to scroll on page up/down.
pub const PAGE_SCROLL_SIZE: usize = 10;

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    ConfirmingQuit,
    Quitting,
}

/// Where the lessons on screen came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataStatus {
    /// A load is in flight; `from_cache` tells whether a cached copy is shown meanwhile
    Loading { from_cache: bool },
    Fresh,
    /// Backing store unreachable, showing cached lessons
    Offline { error: String, cached_at: i64 },
    /// Backing store unreachable and nothing cached
    Error(String),
}

/// Result of a background month load.
struct LoadMessage {
    generation: u64,
    month: CalendarMonth,
    loaded: Loaded<Vec<Lesson>>,
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    pub cache: CacheManager,
    backend: Option<BackendClient>,

    pub state: AppState,
    pub month: CalendarMonth,
    pub lessons: Vec<Lesson>,
    pub selection: usize,
    pub status: DataStatus,
    pub status_message: Option<String>,

    /// Bumped on every load; results carrying an older number are dropped.
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    load_rx: mpsc::Receiver<LoadMessage>,
    load_tx: mpsc::Sender<LoadMessage>,
}

impl App {
    /// Create an app from its collaborators. A `None` backend means the
    /// backing store is not configured; the app then runs from cache only.
    pub fn new(
        config: Config,
        cache: CacheManager,
        backend: Option<BackendClient>,
        month: CalendarMonth,
    ) -> Self {
        let (load_tx, load_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        Self {
            config,
            cache,
            backend,
            state: AppState::Normal,
            month,
            lessons: Vec::new(),
            selection: 0,
            status: DataStatus::Loading { from_cache: false },
            status_message: None,
            generation: 0,
            in_flight: None,
            load_rx,
            load_tx,
        }
    }

    /// Build the app from configuration on disk and in the environment.
    pub fn from_config(config: Config, month: CalendarMonth) -> Result<Self> {
        let cache_dir = config.cache_dir()?;
        debug!(?cache_dir, "Cache directory configured");
        let cache = CacheManager::open(cache_dir);

        let backend = match config.backend_client() {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "Backing store not configured, running from cache");
                None
            }
        };

        Ok(Self::new(config, cache, backend, month))
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load the current month: paint the cached copy, then query the backing
    /// store in the background. Any load still running is aborted.
    pub fn load_month(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }

        let month = self.month;
        let key = month.cache_key();
        let max_age = self.config.cache_max_age_minutes;

        let cached: Option<Vec<Lesson>> = preview(&self.cache, &key, max_age);
        let from_cache = cached.is_some();
        self.lessons = cached.unwrap_or_default();
        self.clamp_selection();
        self.status = DataStatus::Loading { from_cache };
        self.status_message = None;

        let generation = self.generation;
        let cache = self.cache.clone();
        let backend = self.backend.clone();
        let tx = self.load_tx.clone();

        self.in_flight = Some(tokio::spawn(async move {
            let loaded = read_through(&cache, &key, max_age, || async move {
                match backend {
                    Some(client) => client.fetch_lessons_for_month(month).await,
                    None => Err(FetchError::config("backing store URL and key are not set")),
                }
            })
            .await;

            if tx.send(LoadMessage { generation, month, loaded }).await.is_err() {
                debug!("App gone before load finished");
            }
        }));
    }

    /// Re-run the whole read-through sequence for the month on screen.
    pub fn retry(&mut self) {
        info!(month = %self.month, "Manual retry");
        self.load_month();
    }

    pub fn next_month(&mut self) {
        self.show_month(self.month.next());
    }

    pub fn prev_month(&mut self) {
        self.show_month(self.month.prev());
    }

    pub fn this_month(&mut self) {
        self.show_month(CalendarMonth::current());
    }

    fn show_month(&mut self, month: CalendarMonth) {
        if month != self.month {
            self.month = month;
            self.selection = 0;
        }
        self.load_month();
    }

    /// Apply finished background loads.
    pub fn check_background_tasks(&mut self) {
        while let Ok(message) = self.load_rx.try_recv() {
            self.apply_load(message);
        }
    }

    fn apply_load(&mut self, message: LoadMessage) {
        if message.generation != self.generation {
            debug!(
                generation = message.generation,
                current = self.generation,
                month = %message.month,
                "Ignoring superseded load"
            );
            return;
        }
        self.in_flight = None;

        let LoadMessage { loaded, month, .. } = message;
        self.status = match &loaded.state {
            LoadState::Fresh => {
                self.status_message = Some(format!("{} updated", month));
                DataStatus::Fresh
            }
            LoadState::Stale { error, cached_at } => {
                self.status_message = None;
                DataStatus::Offline {
                    error: error.to_string(),
                    cached_at: *cached_at,
                }
            }
            LoadState::Failed { error } => {
                self.status_message = None;
                DataStatus::Error(error.to_string())
            }
        };
        self.lessons = loaded.into_data_or_default();
        self.clamp_selection();
    }

    /// Abort any load still running.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    fn clamp_selection(&mut self) {
        self.selection = self.selection.min(self.lessons.len().saturating_sub(1));
    }

    pub fn select_next(&mut self) {
        if self.selection + 1 < self.lessons.len() {
            self.selection += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selection = self.selection.saturating_sub(1);
    }

    pub fn page_down(&mut self) {
        self.selection = (self.selection + PAGE_SCROLL_SIZE).min(self.lessons.len().saturating_sub(1));
    }

    pub fn page_up(&mut self) {
        self.selection = self.selection.saturating_sub(PAGE_SCROLL_SIZE);
    }

    pub fn selected_lesson(&self) -> Option<&Lesson> {
        self.lessons.get(self.selection)
    }

    /// Day of month of the selected lesson, highlighted in the calendar grid.
    pub fn selected_day(&self) -> Option<u32> {
        self.selected_lesson().and_then(|l| l.day_of_month())
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, DataStatus::Loading { .. })
    }

    /// Banner text for degraded states, e.g. "OFFLINE - showing data cached 5m ago".
    pub fn offline_banner(&self) -> Option<String> {
        match &self.status {
            DataStatus::Offline { error, cached_at } => Some(format!(
                "OFFLINE - showing data cached {} ({})",
                format_age(self.cache.now_millis() - cached_at),
                error
            )),
            DataStatus::Error(error) => Some(format!("No data available: {}", error)),
            _ => None,
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================
