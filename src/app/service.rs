//! Node service: the command execution core.
//!
//! [`NodeService`] owns the FPGA port, the summary-state writer and the
//! telemetry records.  It runs on the controller thread only; every
//! hardware access and every state change happens inside
//! [`NodeService::execute`].
//!
//! ```text
//!                ┌──────────────────────────────┐ ──▶ EventSink
//!  queue ──────▶ │          NodeService          │
//!                │  SummaryState · ILC telemetry │ ──▶ FpgaPort
//!                └──────────────────────────────┘
//! ```

use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::config::{MAX_ILCS, NodeConfig};
use crate::error::{ExecutionError, HardwareError};
use crate::fsm::states::{self, descriptor};
use crate::fsm::{SummaryState, SummaryStateCell, SummaryStateReader};
use crate::ilc::{self, IlcMode, RESPONSE_WORDS, StatusResponse};
use crate::telemetry::{EnabledIlc, ThermalData};
use crate::threads::StopToken;

use super::commands::{AdmittedCommand, CommandKind, CommandName};
use super::events::AppEvent;
use super::ports::{EventSink, FpgaPort};

// ───────────────────────────────────────────────────────────────
// NodeService
// ───────────────────────────────────────────────────────────────

pub struct NodeService<F: FpgaPort, S: EventSink> {
    fpga: F,
    sink: S,
    state: SummaryStateCell,
    addresses: heapless::Vec<u8, MAX_ILCS>,
    bitfile_dir: String,
    fifo_timeout: Duration,
    response_timeout: Duration,
    enabled_ilc: EnabledIlc,
    thermal: ThermalData,
    /// Raised by `exitControl`.
    exit: StopToken,
    settings: Option<String>,
    last_update: Option<Instant>,
    update_count: u64,
    fpga_open: bool,
}

impl<F: FpgaPort, S: EventSink> NodeService<F, S> {
    /// Construct the service in Standby.  Does not touch the FPGA; call
    /// [`bring_up`](Self::bring_up) next.
    pub fn new(fpga: F, sink: S, config: &NodeConfig, exit: StopToken) -> Self {
        Self {
            fpga,
            sink,
            state: SummaryStateCell::new(SummaryState::Standby),
            addresses: config.ilc_addresses.clone(),
            bitfile_dir: config.bitfile_dir.clone(),
            fifo_timeout: config.fifo_timeout(),
            response_timeout: config.response_timeout(),
            enabled_ilc: EnabledIlc::new(),
            thermal: ThermalData::new(),
            exit,
            settings: None,
            last_update: None,
            update_count: 0,
            fpga_open: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Initialize and open the FPGA.  Failure here is fatal to the node.
    pub fn bring_up(&mut self) -> Result<(), HardwareError> {
        self.fpga.initialize()?;
        if let Err(e) = self.fpga.open(&self.bitfile_dir) {
            error!("NodeService: FPGA open failed: {}", e);
            if let Err(fe) = self.fpga.finalize() {
                warn!("NodeService: finalize after failed open: {}", fe);
            }
            return Err(e);
        }
        self.fpga_open = true;
        let state = self.state.get();
        self.sink.emit(&AppEvent::Started(state));
        info!("NodeService started in {}", state);
        Ok(())
    }

    /// Close and finalize the FPGA.  Errors are logged, not returned.
    pub fn tear_down(&mut self) {
        if !self.fpga_open {
            return;
        }
        self.fpga_open = false;
        if let Err(e) = self.fpga.close() {
            warn!("NodeService: FPGA close failed: {}", e);
        }
        if let Err(e) = self.fpga.finalize() {
            warn!("NodeService: FPGA finalize failed: {}", e);
        }
        info!("NodeService: FPGA closed");
    }

    // ── Execution ─────────────────────────────────────────────

    /// Execute one admitted command and send its terminal ack.
    pub fn execute(&mut self, cmd: AdmittedCommand) -> Result<(), ExecutionError> {
        let (kind, ack) = cmd.into_parts();
        match self.run(&kind) {
            Ok(()) => {
                ack.complete();
                Ok(())
            }
            Err(e) => {
                ack.fail_with(&e);
                Err(e)
            }
        }
    }

    fn run(&mut self, kind: &CommandKind) -> Result<(), ExecutionError> {
        match kind {
            CommandKind::Start { settings_to_apply } => self.start(settings_to_apply),
            CommandKind::Enable => self.transition(CommandName::Enable),
            CommandKind::Disable => self.transition(CommandName::Disable),
            CommandKind::Standby => self.standby(),
            CommandKind::ExitControl => self.exit_control(),
            CommandKind::Update => self.update(),
        }
    }

    fn check_allowed(&self, name: CommandName) -> Result<SummaryState, ExecutionError> {
        let current = self.state.get();
        if states::accepts(current, name) {
            Ok(current)
        } else {
            Err(ExecutionError::NotAllowed {
                command: name,
                state: current,
            })
        }
    }

    fn start(&mut self, settings: &str) -> Result<(), ExecutionError> {
        self.check_allowed(CommandName::Start)?;
        info!("NodeService: applying settings '{}'", settings);
        self.transition(CommandName::Start)?;
        self.settings = Some(settings.to_owned());
        Ok(())
    }

    /// Command the ILCs into the target state's mode, then switch state.
    fn transition(&mut self, name: CommandName) -> Result<(), ExecutionError> {
        self.check_allowed(name)?;
        let Some(next) = states::target(name) else {
            return Ok(());
        };
        self.set_ilc_mode(descriptor(next).ilc_mode)?;
        self.set_state(next);
        Ok(())
    }

    /// Standby always succeeds once allowed; ILC errors are logged.
    fn standby(&mut self) -> Result<(), ExecutionError> {
        self.check_allowed(CommandName::Standby)?;
        if let Err(e) = self.set_ilc_mode(IlcMode::Standby) {
            warn!("NodeService: ILC standby failed, continuing: {}", e);
        }
        self.settings = None;
        self.set_state(SummaryState::Standby);
        Ok(())
    }

    fn exit_control(&mut self) -> Result<(), ExecutionError> {
        self.check_allowed(CommandName::ExitControl)?;
        info!("NodeService: exit requested");
        self.exit.cancel();
        self.sink.emit(&AppEvent::ExitRequested);
        Ok(())
    }

    /// One outer-loop cycle.  No-op unless Enabled.
    fn update(&mut self) -> Result<(), ExecutionError> {
        if !self.state.get().is_active() {
            return Ok(());
        }

        let now = Instant::now();
        if let Some(prev) = self.last_update.replace(now) {
            debug!("Update: {:?} since previous cycle", now - prev);
        }
        self.update_count += 1;

        if let Err(e) = self.poll_thermal() {
            error!("Update: hardware error, entering Fault: {}", e);
            if let Err(de) = self.set_ilc_mode(IlcMode::Disabled) {
                warn!("Update: disabling ILCs after fault failed: {}", de);
            }
            self.set_state(SummaryState::Fault);
            return Err(e.into());
        }

        self.thermal.send(&mut self.sink);
        self.enabled_ilc.send(&mut self.sink);
        Ok(())
    }

    fn poll_thermal(&mut self) -> Result<(), HardwareError> {
        let request = ilc::status_request(&self.addresses)?;
        self.fpga.write_request_fifo(&request, self.fifo_timeout)?;

        let mut buf = [0u16; RESPONSE_WORDS * MAX_ILCS];
        let words = &mut buf[..RESPONSE_WORDS * self.addresses.len()];
        self.fpga
            .read_u16_response_fifo(words, self.response_timeout)?;

        for (chunk, &address) in words.chunks_exact(RESPONSE_WORDS).zip(&self.addresses) {
            let response = StatusResponse::parse(chunk)?;
            if response.address != address {
                return Err(HardwareError::BadResponse);
            }
            self.thermal.record(response);
        }
        Ok(())
    }

    fn set_ilc_mode(&mut self, mode: IlcMode) -> Result<(), HardwareError> {
        let frame = ilc::mode_frame(&self.addresses, mode)?;
        let result = self.fpga.write_command_fifo(&frame, self.fifo_timeout);
        // A failed write leaves the ILCs in an unknown mode; treat as not enabled.
        let enabled = result.is_ok() && mode == IlcMode::Enabled;
        self.enabled_ilc.set_all(&self.addresses, enabled);
        self.enabled_ilc.send(&mut self.sink);
        result
    }

    fn set_state(&mut self, next: SummaryState) {
        let prev = self.state.set(next);
        if prev != next {
            self.sink
                .emit(&AppEvent::SummaryStateChanged { from: prev, to: next });
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> SummaryState {
        self.state.get()
    }

    /// Read-only handle for producer threads.
    pub fn state_reader(&self) -> SummaryStateReader {
        self.state.reader()
    }

    /// Settings applied by the last `start`, cleared by `standby`.
    pub fn settings(&self) -> Option<&str> {
        self.settings.as_deref()
    }

    /// Update cycles that did work (ran while Enabled).
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn enabled_ilc(&self) -> &EnabledIlc {
        &self.enabled_ilc
    }

    pub fn thermal(&self) -> &ThermalData {
        &self.thermal
    }

    pub fn fpga(&self) -> &F {
        &self.fpga
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
