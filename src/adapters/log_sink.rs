//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events through the `log`
//! facade.  Thermal readings go out at debug level as one JSON line per
//! cycle; everything else at info.

use log::{debug, info};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::ThermalData(t) => {
                if log::log_enabled!(log::Level::Debug) {
                    match serde_json::to_string(t) {
                        Ok(json) => debug!("THERMAL | {}", json),
                        Err(e) => debug!("THERMAL | {} records (encode failed: {})", t.records.len(), e),
                    }
                }
            }
            AppEvent::EnabledIlc(e) => {
                info!("ILC | enabled={:?}", e.enabled.as_slice());
            }
            AppEvent::SummaryStateChanged { from, to } => {
                info!("STATE | {} -> {}", from, to);
            }
            AppEvent::LogLevel(level) => {
                info!("LOG | level={}", level);
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={}", state);
            }
            AppEvent::ExitRequested => {
                info!("EXIT | requested");
            }
        }
    }
}
