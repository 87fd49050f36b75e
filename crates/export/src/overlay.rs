//! Loading overlay shown while a save is in progress

use std::rc::Rc;

use crate::host::OverlayHost;

#[derive(Clone)]
pub struct LoadingOverlay {
    host: Rc<dyn OverlayHost>,
}

impl LoadingOverlay {
    pub fn new(host: Rc<dyn OverlayHost>) -> Self {
        Self { host }
    }

    /// Show `message` and wait until the overlay is visible
    pub async fn show(&self, message: &str) {
        self.host.set_text(message);
        self.host.set_shown(true);
        self.host.settled(true).await;
    }

    /// Hide the overlay and wait until it is gone
    pub async fn hide(&self) {
        self.host.set_shown(false);
        self.host.settled(false).await;
    }
}

/// Overlay text for a save in `extension` format
pub fn saving_message(extension: &str) -> String {
    format!("Saving {}", extension.to_uppercase())
}
