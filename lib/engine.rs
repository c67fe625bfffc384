//! Oscilloscope acquisition engine.
//!
//! The engine owns every piece of capture state. The foreground starts
//! captures and reads status, the interrupt tasks call [`on_conversion`] and
//! [`on_transfer_complete`]. Starting a capture only arms the hardware, the
//! host polls [`status`] until the capture is done.
//!
//! [`on_conversion`]: AcquisitionEngine::on_conversion
//! [`on_transfer_complete`]: AcquisitionEngine::on_transfer_complete
//! [`status`]: AcquisitionEngine::status

use crate::buffer::SampleBuffer;
use crate::config::{CapturePath, CaptureRequest, ChannelCount, MAX_CHANNELS};
use crate::error::{Error, Result};
use crate::hil::{SampleClock, ScopeAdc, ScopeDma};
use crate::status::{CaptureStatus, Session};
use crate::timing::{Pacer, TimeGap};
use crate::trigger::{TriggerConfig, TriggerController, TriggerState};

/// DMA count register value for `requested` samples. The register holds the
/// transfers remaining after the first one.
pub fn dma_transfer_count(requested: u16) -> u16 {
    requested.saturating_sub(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Capture {
    path: CapturePath,
    requested: u16,
    captured: u16,
}

pub struct AcquisitionEngine<A, D, C, const N: usize> {
    adc: A,
    dma: D,
    pacer: Pacer<C>,
    buffer: SampleBuffer<N>,
    trigger: TriggerController,
    session: Session,
    // Hardware still moving samples
    active: Option<Capture>,
    group: [u16; MAX_CHANNELS],
}

impl<A, D, C, const N: usize> AcquisitionEngine<A, D, C, N>
where
    A: ScopeAdc,
    D: ScopeDma,
    C: SampleClock,
{
    pub fn new(adc: A, dma: D, clock: C, storage: &'static mut [u16; N]) -> Self {
        AcquisitionEngine {
            adc,
            dma,
            pacer: Pacer::new(clock),
            buffer: SampleBuffer::new(storage),
            trigger: TriggerController::new(),
            session: Session::new(),
            active: None,
            group: [0; MAX_CHANNELS],
        }
    }

    /// Store the trigger used by the next triggered capture.
    pub fn configure_trigger(&mut self, config: TriggerConfig) -> Result<()> {
        self.ensure_idle()?;
        self.trigger.configure(config);
        debug!(
            "trigger channel {=usize} prescaler {=u8} level {=u16}",
            config.channel(),
            config.prescaler(),
            config.level()
        );
        Ok(())
    }

    pub fn start_capture(&mut self, request: CaptureRequest) -> Result<()> {
        match request.mode().path() {
            CapturePath::Interrupt => self.capture(request),
            CapturePath::Dma => self.capture_dma(request),
        }
    }

    fn capture(&mut self, request: CaptureRequest) -> Result<()> {
        self.ensure_idle()?;
        self.buffer
            .partition(request.channels(), request.samples())?;

        let mode = request.mode();
        self.adc.set_operation_mode(mode.mode, mode.inputs);
        self.adc.set_conversion_channels(mode.channels);
        self.trigger
            .arm_or_bypass(request.trigger(), request.delay());

        self.session.reset();
        self.active = Some(Capture {
            path: CapturePath::Interrupt,
            requested: request.samples(),
            captured: 0,
        });

        self.pacer.start(request.gap());
        self.adc.unpend();
        self.adc.listen();
        self.adc.start();

        info!(
            "capture {=usize} ch x {=u16} samples, trigger {=bool}",
            request.channels().get(),
            request.samples(),
            request.trigger()
        );
        Ok(())
    }

    fn capture_dma(&mut self, request: CaptureRequest) -> Result<()> {
        self.ensure_idle()?;
        self.buffer
            .partition(ChannelCount::One, request.samples())?;

        let mode = request.mode();
        self.adc.unlisten();
        self.adc.set_operation_mode(mode.mode, mode.inputs);
        self.adc.set_conversion_channels(ChannelCount::One);

        let source = self.adc.data_address();
        let destination = self.buffer.base_address();
        self.dma.configure(
            source,
            destination,
            dma_transfer_count(request.samples()),
        );
        self.dma.unpend();
        self.dma.listen();
        self.dma.enable();

        // The DMA drains the ADC on its own, the host waits before asking
        self.session.complete(request.samples());
        self.active = Some(Capture {
            path: CapturePath::Dma,
            requested: request.samples(),
            captured: request.samples(),
        });

        self.pacer.start(request.gap());
        self.adc.start();

        info!("dma capture {=u16} samples", request.samples());
        Ok(())
    }

    /// ADC end of conversion interrupt.
    pub fn on_conversion(&mut self) {
        if !self.adc.read_group(&mut self.group) {
            return;
        }
        let capture = match self.active.as_mut() {
            Some(capture) if capture.path == CapturePath::Interrupt => capture,
            _ => return,
        };

        let channels = self.buffer.segment_count();
        let group = &self.group[..channels];
        if !self.trigger.is_triggered() {
            // Discarded, the group only feeds the comparator
            self.trigger.observe(group);
            return;
        }
        if !self.buffer.write_group(group) {
            return;
        }

        capture.captured += 1;
        let captured = capture.captured;
        if captured < capture.requested {
            self.session.record(captured);
            return;
        }

        self.session.complete(captured);
        self.adc.unlisten();
        self.adc.stop();
        self.pacer.stop();
        self.active = None;
        debug!("capture complete");
    }

    /// DMA transfer complete interrupt.
    pub fn on_transfer_complete(&mut self) {
        self.dma.unpend();
        let capture = match self.active {
            Some(capture) if capture.path == CapturePath::Dma => capture,
            _ => return,
        };

        self.dma.unlisten();
        self.dma.disable();
        self.adc.stop();
        self.pacer.stop();
        self.buffer
            .mark_written(0, usize::from(capture.requested));
        self.session.complete(capture.requested);
        self.active = None;
        debug!("dma transfer complete");
    }

    /// Stop the capture in flight. The session reports done with the
    /// samples captured so far.
    pub fn abort(&mut self) {
        let capture = match self.active.take() {
            Some(capture) => capture,
            None => return,
        };

        let captured = match capture.path {
            CapturePath::Interrupt => {
                self.adc.unlisten();
                capture.captured
            }
            CapturePath::Dma => {
                self.dma.unlisten();
                self.dma.disable();
                // Counter freezes once the channel is off
                let remaining = self.dma.remaining();
                let captured = capture.requested.saturating_sub(remaining);
                self.buffer.mark_written(0, usize::from(captured));
                captured
            }
        };
        self.adc.stop();
        self.pacer.stop();
        self.session.complete(captured);
        warn!("capture aborted after {=u16} samples", captured);
    }

    pub fn status(&self) -> CaptureStatus {
        self.session.status()
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Samples captured into one channel segment, once the hardware let go
    /// of the buffer.
    pub fn channel(&self, channel: usize) -> Result<&[u16]> {
        self.ensure_idle()?;
        self.buffer.written(channel).ok_or(Error::InvalidChannel)
    }

    pub fn trigger_state(&self) -> TriggerState {
        self.trigger.state()
    }

    pub fn trigger_config(&self) -> TriggerConfig {
        self.trigger.config()
    }

    pub fn gap(&self) -> Option<TimeGap> {
        self.pacer.gap()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.is_busy() {
            warn!("capture in flight");
            return Err(Error::Busy);
        }
        Ok(())
    }
}
