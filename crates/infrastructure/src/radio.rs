use domain::radio::{AdapterState, RadioAdapter};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use tracing::debug;

use crate::config::AdapterSettings;

/// Radio adapter whose answers are fed in by the host.
///
/// The host integration (or the CLI) seeds it from configuration and updates
/// it as the platform reports power and permission changes.
#[derive(Debug)]
pub struct HostRadioAdapter {
    available: AtomicBool,
    permitted: AtomicBool,
    state: AtomicI32,
}

impl HostRadioAdapter {
    pub fn new(available: bool, permitted: bool, state: AdapterState) -> Self {
        Self {
            available: AtomicBool::new(available),
            permitted: AtomicBool::new(permitted),
            state: AtomicI32::new(state.code()),
        }
    }

    pub fn from_settings(settings: &AdapterSettings) -> Self {
        let state = if settings.enabled {
            AdapterState::On
        } else {
            AdapterState::Off
        };
        Self::new(settings.available, settings.permitted, state)
    }

    pub fn set_state(&self, state: AdapterState) {
        debug!(code = state.code(), "Adapter state set");
        self.state.store(state.code(), Ordering::SeqCst);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_permitted(&self, permitted: bool) {
        self.permitted.store(permitted, Ordering::SeqCst);
    }
}

impl Default for HostRadioAdapter {
    fn default() -> Self {
        Self::from_settings(&AdapterSettings::default())
    }
}

impl RadioAdapter for HostRadioAdapter {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn has_permission(&self) -> bool {
        self.permitted.load(Ordering::SeqCst)
    }

    fn state(&self) -> AdapterState {
        AdapterState::from_code(self.state.load(Ordering::SeqCst)).unwrap_or(AdapterState::Off)
    }
}
