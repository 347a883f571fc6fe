//! Gate Controller.

use tg_api_types::GateView;

/// | enabled | connected | verified | render          |
/// |---------|-----------|----------|-----------------|
/// | false   | any       | any      | protected app   |
/// | true    | false     | any      | protected app   |
/// | true    | true      | false    | blocking screen |
/// | true    | true      | true     | protected app   |
pub fn decide(enabled: bool, connected: bool, verified: bool) -> GateView {
    if enabled && connected && !verified {
        GateView::BlockingScreen
    } else {
        GateView::ProtectedApp
    }
}

/// Tracks connection and verification for the shell and decides when the
/// verification widget should be on screen.
///
/// Closing the widget hides it without suspending gating: it comes back on
/// the next connection or when gating is switched on again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateController {
    connected: bool,
    verified: bool,
    widget_visible: bool,
}

impl GateController {
    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn verified(&self) -> bool {
        self.verified
    }

    pub fn widget_visible(&self) -> bool {
        self.widget_visible
    }

    pub fn view(&self, enabled: bool) -> GateView {
        decide(enabled, self.connected, self.verified)
    }

    pub fn needs_verification(&self, enabled: bool) -> bool {
        enabled && self.connected && !self.verified
    }

    pub fn on_connected(&mut self, enabled: bool) {
        self.connected = true;
        if self.needs_verification(enabled) {
            self.widget_visible = true;
        }
    }

    /// Re-arms the gate: a verification never outlives its connection.
    pub fn on_disconnected(&mut self) {
        self.connected = false;
        self.verified = false;
        self.widget_visible = false;
    }

    pub fn on_enabled_changed(&mut self, enabled: bool) {
        self.widget_visible = self.needs_verification(enabled);
    }

    pub fn on_verification_complete(&mut self) {
        self.verified = true;
        self.widget_visible = false;
    }

    pub fn on_widget_closed(&mut self) {
        self.widget_visible = false;
    }
}
