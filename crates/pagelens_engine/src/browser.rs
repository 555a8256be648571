//! In-process browser host.
//!
//! Each tab owns the source of its current page. Injecting the extractor
//! spawns the page's listener task; from then on the only way to reach the
//! page is a JSON message over [`PageChannel`]. Navigating replaces the page,
//! which cancels the old listener and forgets the injection.
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use lens_logging::{lens_debug, lens_error, lens_info, lens_trace, lens_warn};
use pagelens_core::{PageRequest, PageResponse, TabId, UiNotification};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::channel::{ChannelError, InjectionError, PageChannel, ScriptInjector};
use crate::extract::{DomExtractor, Extractor};
use crate::page::PageContext;

const LISTENER_QUEUE: usize = 16;
const NOTIFICATION_QUEUE: usize = 32;
/// Requests a hung page holds on to; older ones are dropped past this.
const STALLED_LIMIT: usize = 16;

/// A page ready to be shown in a tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLoad {
    pub url: String,
    pub html: String,
    /// Restricted pages refuse script injection.
    pub restricted: bool,
}

impl PageLoad {
    /// Pages are restricted unless served over http(s) or from a file.
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        let url = url.into();
        let restricted = !matches!(
            Url::parse(&url).map(|u| u.scheme().to_string()).as_deref(),
            Ok("http") | Ok("https") | Ok("file")
        );
        Self {
            url,
            html: html.into(),
            restricted,
        }
    }
}

struct Envelope {
    request: String,
    reply: oneshot::Sender<String>,
}

/// Page-lifetime state. A navigation creates a new one.
struct PageWindow {
    /// Set exactly once, by the first injection into this page.
    initialized: AtomicBool,
    listener: Mutex<Option<mpsc::Sender<Envelope>>>,
    compose: Arc<Mutex<String>>,
    unresponsive: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl PageWindow {
    fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            listener: Mutex::new(None),
            compose: Arc::new(Mutex::new(String::new())),
            unresponsive: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        }
    }

    fn listener(&self) -> Option<mpsc::Sender<Envelope>> {
        self.listener.lock().ok().and_then(|guard| guard.clone())
    }
}

struct Tab {
    load: PageLoad,
    source: Arc<str>,
    window: Arc<PageWindow>,
}

impl Tab {
    fn new(load: PageLoad) -> Self {
        Self {
            source: Arc::from(load.html.as_str()),
            load,
            window: Arc::new(PageWindow::new()),
        }
    }
}

pub struct Browser {
    tabs: Mutex<HashMap<TabId, Tab>>,
    active: Mutex<Option<TabId>>,
    next_id: AtomicU32,
    extractor: Arc<dyn Extractor>,
    notifications: broadcast::Sender<UiNotification>,
}

impl Default for Browser {
    fn default() -> Self {
        Self::new(Arc::new(DomExtractor))
    }
}

impl Browser {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_QUEUE);
        Self {
            tabs: Mutex::new(HashMap::new()),
            active: Mutex::new(None),
            next_id: AtomicU32::new(1),
            extractor,
            notifications,
        }
    }

    /// Receives `tabChanged` notifications for the active tab.
    pub fn subscribe(&self) -> broadcast::Receiver<UiNotification> {
        self.notifications.subscribe()
    }

    /// Opens `load` in a new tab and makes it active.
    pub fn open_tab(&self, load: PageLoad) -> TabId {
        let tab_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lens_info!("open tab {} url={}", tab_id, load.url);
        if let Ok(mut tabs) = self.tabs.lock() {
            tabs.insert(tab_id, Tab::new(load));
        }
        self.activate(tab_id);
        tab_id
    }

    /// Replaces the page shown in `tab`. In-flight requests to the old page
    /// fail with [`ChannelError::Closed`].
    pub fn navigate(&self, tab: TabId, load: PageLoad) -> Result<(), ChannelError> {
        let url = load.url.clone();
        {
            let mut tabs = self.tabs.lock().map_err(|_| ChannelError::NoSuchTab(tab))?;
            let entry = tabs.get_mut(&tab).ok_or(ChannelError::NoSuchTab(tab))?;
            entry.window.cancel.cancel();
            *entry = Tab::new(load);
        }
        lens_info!("tab {} navigated to {}", tab, url);
        if self.active_tab() == Some(tab) {
            self.notify(UiNotification::TabChanged { url });
        }
        Ok(())
    }

    pub fn activate(&self, tab: TabId) {
        let Some(url) = self.tab_url(tab) else {
            return;
        };
        if let Ok(mut active) = self.active.lock() {
            *active = Some(tab);
        }
        self.notify(UiNotification::TabChanged { url });
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.active.lock().ok().and_then(|active| *active)
    }

    pub fn tab_url(&self, tab: TabId) -> Option<String> {
        self.with_tab(tab, |entry| entry.load.url.clone())
    }

    /// What has been pasted into the page's compose area so far.
    pub fn compose_text(&self, tab: TabId) -> Option<String> {
        self.with_tab(tab, |entry| entry.window.compose.clone())
            .and_then(|compose| compose.lock().ok().map(|text| text.clone()))
    }

    /// Makes the current page stop answering messages, as a hung page would.
    pub fn set_unresponsive(&self, tab: TabId, unresponsive: bool) {
        if let Some(flag) = self.with_tab(tab, |entry| entry.window.unresponsive.clone()) {
            flag.store(unresponsive, Ordering::SeqCst);
        }
    }

    fn with_tab<T>(&self, tab: TabId, f: impl FnOnce(&Tab) -> T) -> Option<T> {
        let tabs = self.tabs.lock().ok()?;
        tabs.get(&tab).map(f)
    }

    fn notify(&self, notification: UiNotification) {
        // Nobody listening is fine.
        let _ = self.notifications.send(notification);
    }
}

#[async_trait::async_trait]
impl ScriptInjector for Browser {
    async fn inject(&self, tab: TabId) -> Result<(), InjectionError> {
        let (load, source, window) = self
            .with_tab(tab, |entry| {
                (entry.load.clone(), entry.source.clone(), entry.window.clone())
            })
            .ok_or(InjectionError::NoSuchTab(tab))?;

        if load.restricted {
            lens_warn!("refusing injection into restricted page {}", load.url);
            return Err(InjectionError::Restricted { url: load.url });
        }

        if window.initialized.swap(true, Ordering::SeqCst) {
            lens_debug!("tab {} already initialized", tab);
            return Ok(());
        }

        let context = PageContext::new(Url::parse(&load.url).ok(), source, self.extractor.clone())
            .with_compose(window.compose.clone());
        let (tx, rx) = mpsc::channel(LISTENER_QUEUE);
        if let Ok(mut listener) = window.listener.lock() {
            *listener = Some(tx);
        }
        tokio::spawn(run_listener(
            Arc::new(context),
            rx,
            window.cancel.clone(),
            window.unresponsive.clone(),
        ));
        lens_info!("injected extractor into tab {}", tab);
        Ok(())
    }
}

async fn run_listener(
    context: Arc<PageContext>,
    mut rx: mpsc::Receiver<Envelope>,
    cancel: CancellationToken,
    unresponsive: Arc<AtomicBool>,
) {
    // Requests swallowed while hung wait here so their callers time out
    // instead of seeing a closed channel. They are answered once the page
    // responds again.
    let mut stalled = VecDeque::new();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                if unresponsive.load(Ordering::SeqCst) {
                    if stalled.len() == STALLED_LIMIT {
                        stalled.pop_front();
                    }
                    stalled.push_back(envelope);
                    continue;
                }
                while let Some(held) = stalled.pop_front() {
                    answer(&context, held).await;
                }
                answer(&context, envelope).await;
            }
        }
    }
    lens_debug!("page listener stopped ({} stalled requests dropped)", stalled.len());
}

/// Parsing and extraction are synchronous, so they run on the blocking pool.
async fn answer(context: &Arc<PageContext>, envelope: Envelope) {
    if envelope.reply.is_closed() {
        return;
    }
    let page = context.clone();
    let request = envelope.request;
    match tokio::task::spawn_blocking(move || page.dispatch(&request)).await {
        Ok(reply) => {
            let _ = envelope.reply.send(reply);
        }
        Err(err) => lens_error!("page handler did not finish: {}", err),
    }
}

#[async_trait::async_trait]
impl PageChannel for Browser {
    async fn send(
        &self,
        tab: TabId,
        request: PageRequest,
        timeout: Duration,
    ) -> Result<PageResponse, ChannelError> {
        let listener = self
            .with_tab(tab, |entry| entry.window.listener())
            .ok_or(ChannelError::NoSuchTab(tab))?
            .ok_or(ChannelError::NoListener)?;

        let wire = serde_json::to_string(&request).map_err(|err| ChannelError::Codec(err.to_string()))?;
        lens_trace!("tab {} <- {}", tab, wire);
        let (reply_tx, reply_rx) = oneshot::channel();
        let exchange = async {
            listener
                .send(Envelope {
                    request: wire,
                    reply: reply_tx,
                })
                .await
                .map_err(|_| ChannelError::Closed)?;
            reply_rx.await.map_err(|_| ChannelError::Closed)
        };

        let reply = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| ChannelError::Timeout(timeout))??;
        lens_trace!("tab {} -> {}", tab, reply);
        serde_json::from_str(&reply).map_err(|err| ChannelError::Codec(err.to_string()))
    }
}
