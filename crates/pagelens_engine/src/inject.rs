use std::sync::Arc;

use lens_logging::{lens_debug, lens_warn};
use pagelens_core::TabId;

use crate::channel::{InjectionError, ScriptInjector};

/// Makes sure a page can answer extraction requests.
///
/// Safe to call repeatedly: the page's own guard turns repeat injections
/// into no-ops.
#[derive(Clone)]
pub struct InjectionManager {
    injector: Arc<dyn ScriptInjector>,
}

impl InjectionManager {
    pub fn new(injector: Arc<dyn ScriptInjector>) -> Self {
        Self { injector }
    }

    pub async fn ensure_injected(&self, tab: TabId) -> Result<(), InjectionError> {
        lens_debug!("ensuring extractor in tab {}", tab);
        self.injector.inject(tab).await.inspect_err(|err| {
            lens_warn!("injection into tab {} failed: {}", tab, err);
        })
    }
}
