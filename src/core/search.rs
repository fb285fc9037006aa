use crate::domain::model::Product;
use crate::domain::ports::FoodLookup;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub loading: bool,
    /// `suggestions` 已對應目前的 `query`
    pub settled: bool,
    pub suggestions: Vec<Product>,
    pub error: Option<String>,
}

/// 輸入停頓後才查詢，後送出的查詢永遠覆蓋先前的
pub struct DebouncedSearch<L: FoodLookup + 'static> {
    lookup: Arc<L>,
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
    state: Arc<watch::Sender<SearchState>>,
}

impl<L: FoodLookup + 'static> DebouncedSearch<L> {
    pub fn new(lookup: Arc<L>, delay: Duration) -> Self {
        let (state, _) = watch::channel(SearchState {
            settled: true,
            ..SearchState::default()
        });
        Self {
            lookup,
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// 必須在 tokio runtime 內呼叫
    pub fn submit(&self, query: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel_pending();

        let query = query.trim().to_string();
        if query.is_empty() {
            self.state.send_replace(SearchState {
                settled: true,
                ..SearchState::default()
            });
            return;
        }

        self.state.send_modify(|s| {
            s.query = query.clone();
            s.settled = false;
            s.loading = false;
            s.error = None;
        });

        let lookup = Arc::clone(&self.lookup);
        let latest = Arc::clone(&self.generation);
        let state = Arc::clone(&self.state);
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !publish_if_current(&state, &latest, generation, |s| s.loading = true) {
                return;
            }

            tracing::debug!("Debounced lookup for '{}'", query);
            let result = lookup.search(&query).await;

            let (suggestions, error) = match result {
                Ok(products) => (products, None),
                Err(e) => {
                    tracing::warn!("⚠️ Lookup for '{}' failed: {}", query, e);
                    (Vec::new(), Some(e.user_friendly_message()))
                }
            };
            let published = publish_if_current(&state, &latest, generation, |s| {
                *s = SearchState {
                    query: query.clone(),
                    loading: false,
                    settled: true,
                    suggestions,
                    error,
                };
            });
            // 較新的查詢已送出，丟棄過期結果
            if !published {
                tracing::debug!("Discarding stale results for '{}'", query);
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(handle);
        }
    }

    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cancel_pending();
        self.state.send_modify(|s| {
            s.loading = false;
            s.settled = true;
        });
    }

    fn cancel_pending(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}

/// 檢查世代與寫入狀態在同一把 watch 鎖內完成。
/// `submit`/`cancel` 先遞增世代再寫狀態，所以通過檢查的寫入不會蓋掉較新的狀態。
fn publish_if_current(
    state: &watch::Sender<SearchState>,
    latest: &AtomicU64,
    generation: u64,
    update: impl FnOnce(&mut SearchState),
) -> bool {
    state.send_if_modified(|s| {
        if latest.load(Ordering::SeqCst) != generation {
            return false;
        }
        update(s);
        true
    })
}

impl<L: FoodLookup + 'static> Drop for DebouncedSearch<L> {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
