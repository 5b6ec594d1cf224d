//! Bounded pool of reusable browser tabs
//!
//! Tabs are opened lazily inside one isolated session. A released tab is
//! cleaned (blank page, cleared storage, no listeners, unbounded navigation
//! timeout) before it becomes idle, so a reused tab carries nothing over from
//! the collector that used it before.
//!
//! The pool tracks tab state in its own table keyed by [`TabId`]; callers only
//! hold cheap [`Tab`] handles.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::engine::{BrowsingSession, NavigateOptions, PageHandle, WaitCondition};
use crate::generation::{GenerateError, GenerateResult};
use crate::utils::constants::TAB_CLEANUP_TIMEOUT;

/// Clears web storage and drops every non-default module loader context
const CLEAR_PAGE_STATE_SCRIPT: &str = r"
(() => {
    try { window.localStorage && window.localStorage.clear(); } catch (e) {}
    try { window.sessionStorage && window.sessionStorage.clear(); } catch (e) {}
    try {
        if (window.require && window.require.s && window.require.s.contexts) {
            Object.keys(window.require.s.contexts).forEach((name) => {
                if (name !== '_') {
                    delete window.require.s.contexts[name];
                }
            });
        }
    } catch (e) {}
    return true;
})()
";

// =============================================================================
// Tab handles
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(u64);

impl TabId {
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to a pooled tab
///
/// Dereferences to the underlying [`PageHandle`].
#[derive(Clone)]
pub struct Tab {
    id: TabId,
    page: Arc<dyn PageHandle>,
}

impl Tab {
    #[must_use]
    pub fn id(&self) -> TabId {
        self.id
    }

    #[must_use]
    pub fn page(&self) -> &Arc<dyn PageHandle> {
        &self.page
    }
}

impl Deref for Tab {
    type Target = dyn PageHandle;

    fn deref(&self) -> &Self::Target {
        self.page.as_ref()
    }
}

impl fmt::Debug for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tab").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Where a tracked tab is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabState {
    /// Clean and waiting to be leased
    Idle,
    /// Handed out to a collector
    Leased,
    /// Released and currently being cleaned; neither leasable nor releasable
    Returning,
}

/// Point-in-time pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub idle: usize,
    pub leased: usize,
    pub returning: usize,
    pub capacity: usize,
}

// =============================================================================
// Pool
// =============================================================================

struct TabEntry {
    page: Arc<dyn PageHandle>,
    state: TabState,
}

#[derive(Default)]
struct PoolState {
    tabs: HashMap<TabId, TabEntry>,
    /// Most recently returned last
    idle: Vec<TabId>,
    /// Tabs being opened right now; they count against capacity
    opening: usize,
    next_id: u64,
}

impl PoolState {
    fn busy(&self) -> usize {
        self.tabs
            .values()
            .filter(|e| e.state != TabState::Idle)
            .count()
            + self.opening
    }
}

pub struct TabPool {
    session: Arc<dyn BrowsingSession>,
    max_tabs: usize,
    state: Mutex<PoolState>,
}

impl TabPool {
    pub fn new(session: Arc<dyn BrowsingSession>, max_tabs: usize) -> Self {
        info!("Initialized tab pool with {max_tabs} tabs maximum");
        Self {
            session,
            max_tabs,
            state: Mutex::new(PoolState::default()),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_tabs
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        let count = |wanted| state.tabs.values().filter(|e| e.state == wanted).count();
        PoolStats {
            idle: count(TabState::Idle),
            leased: count(TabState::Leased),
            returning: count(TabState::Returning),
            capacity: self.max_tabs,
        }
    }

    /// State of a tracked tab; `None` once disposed
    #[must_use]
    pub fn state_of(&self, id: TabId) -> Option<TabState> {
        self.state.lock().tabs.get(&id).map(|e| e.state)
    }

    /// Lease a clean tab, reusing an idle one when possible
    ///
    /// # Errors
    /// `PoolExhausted` when no tab is idle and `capacity` tabs are busy.
    pub async fn lease(&self) -> GenerateResult<Tab> {
        // Reuse idle tabs first; one that fails cleaning is discarded
        loop {
            let candidate = {
                let mut state = self.state.lock();
                state.idle.pop().and_then(|id| {
                    let entry = state.tabs.get_mut(&id)?;
                    entry.state = TabState::Leased;
                    Some(Tab {
                        id,
                        page: Arc::clone(&entry.page),
                    })
                })
            };
            let Some(tab) = candidate else { break };

            match clean_tab(tab.id, tab.page.as_ref()).await {
                Ok(()) => {
                    debug!("Reusing pooled tab {}", tab.id);
                    return Ok(tab);
                }
                Err(e) => {
                    warn!("Discarding idle tab {} that failed cleanup: {e:#}", tab.id);
                    self.dispose(&tab).await;
                }
            }
        }

        {
            let mut state = self.state.lock();
            if state.busy() >= self.max_tabs {
                return Err(GenerateError::PoolExhausted {
                    capacity: self.max_tabs,
                });
            }
            state.opening += 1;
        }

        let opened = self.session.new_tab().await;

        let mut state = self.state.lock();
        state.opening -= 1;
        let page = opened.map_err(GenerateError::Engine)?;
        state.next_id += 1;
        let id = TabId(state.next_id);
        state.tabs.insert(
            id,
            TabEntry {
                page: Arc::clone(&page),
                state: TabState::Leased,
            },
        );
        debug!("Opened new pooled tab {id}");
        Ok(Tab { id, page })
    }

    /// Return a leased tab to the pool
    ///
    /// Releasing a tab that is not leased is a logged no-op. Closed tabs are
    /// dropped instead of pooled; tabs that fail cleaning are disposed.
    pub async fn release(&self, tab: &Tab) {
        {
            let mut state = self.state.lock();
            match state.tabs.get_mut(&tab.id) {
                Some(entry) if entry.state == TabState::Leased => {
                    entry.state = TabState::Returning;
                }
                _ => {
                    warn!("Attempting to release tab {} that is not in use", tab.id);
                    return;
                }
            }
        }

        if tab.is_closed() {
            debug!("Tab {} was closed while leased, dropping it", tab.id);
            self.state.lock().tabs.remove(&tab.id);
            return;
        }

        match clean_tab(tab.id, tab.page.as_ref()).await {
            Ok(()) => {
                let mut state = self.state.lock();
                if let Some(entry) = state.tabs.get_mut(&tab.id) {
                    entry.state = TabState::Idle;
                    state.idle.push(tab.id);
                    debug!("Tab {} returned to pool", tab.id);
                }
            }
            Err(e) => {
                warn!("Error cleaning tab {}, disposing it: {e:#}", tab.id);
                self.dispose(tab).await;
            }
        }
    }

    /// Stop tracking a tab and close it; close errors are swallowed
    pub async fn dispose(&self, tab: &Tab) {
        {
            let mut state = self.state.lock();
            state.tabs.remove(&tab.id);
            state.idle.retain(|id| *id != tab.id);
        }
        close_quietly(tab.id, tab.page.as_ref()).await;
    }

    /// Release every tab still leased
    ///
    /// Used after a collector was cut off by its deadline and never got to
    /// release its own tab.
    pub async fn release_outstanding(&self) -> usize {
        let leased: Vec<Tab> = {
            let state = self.state.lock();
            state
                .tabs
                .iter()
                .filter(|(_, e)| e.state == TabState::Leased)
                .map(|(id, e)| Tab {
                    id: *id,
                    page: Arc::clone(&e.page),
                })
                .collect()
        };

        if !leased.is_empty() {
            warn!("Releasing {} tab(s) left leased", leased.len());
        }
        for tab in &leased {
            self.release(tab).await;
        }
        leased.len()
    }

    /// Close every tab, idle or leased, and forget them all
    pub async fn destroy_all(&self) -> usize {
        let drained: Vec<(TabId, Arc<dyn PageHandle>)> = {
            let mut state = self.state.lock();
            state.idle.clear();
            state.tabs.drain().map(|(id, e)| (id, e.page)).collect()
        };

        let count = drained.len();
        futures::future::join_all(
            drained
                .iter()
                .map(|(id, page)| close_quietly(*id, page.as_ref())),
        )
        .await;

        info!("Tab pool destroyed, closed {count} tabs");
        count
    }
}

async fn clean_tab(id: TabId, page: &dyn PageHandle) -> anyhow::Result<()> {
    if page.is_closed() {
        anyhow::bail!("tab {id} is closed");
    }

    page.set_default_navigation_timeout(None);
    page.navigate(
        "about:blank",
        NavigateOptions::new(WaitCondition::DomContentLoaded).with_timeout(TAB_CLEANUP_TIMEOUT),
    )
    .await?;
    page.evaluate(CLEAR_PAGE_STATE_SCRIPT).await?;
    page.detach_listeners().await?;
    Ok(())
}

async fn close_quietly(id: TabId, page: &dyn PageHandle) {
    if page.is_closed() {
        return;
    }
    if let Err(e) = page.close().await {
        let err = GenerateError::Cleanup(format!("Disposing tab {id} failed: {e:#}"));
        debug!("{err}");
    }
}
