//! Peripheral interfaces driven by the acquisition engine.
//!
//! The chip implementations live in `hw`, tests use the mocks.

use crate::config::{ChannelCount, Inputs, OperationMode, MAX_CHANNELS};
use crate::timing::Prescaler;

/// ADC converting one group of up to four channels per sample clock tick.
pub trait ScopeAdc {
    fn set_operation_mode(&mut self, mode: OperationMode, inputs: Inputs);

    fn set_conversion_channels(&mut self, channels: ChannelCount);

    /// Clear a pending conversion interrupt.
    fn unpend(&mut self);

    fn listen(&mut self);

    fn unlisten(&mut self);

    /// Arm conversions on the sample clock.
    fn start(&mut self);

    fn stop(&mut self);

    /// Collect the conversion that raised the interrupt and acknowledge it.
    ///
    /// Returns `true` once `group` holds a complete conversion group, one
    /// value per active channel starting at index 0.
    fn read_group(&mut self, group: &mut [u16; MAX_CHANNELS]) -> bool;

    /// Address of the conversion result register, used as DMA source.
    fn data_address(&self) -> u32;
}

/// DMA channel moving conversion results into memory.
pub trait ScopeDma {
    /// `count` is the number of transfers remaining after the first one.
    fn configure(&mut self, source: u32, destination: u32, count: u16);

    /// Clear a pending transfer complete interrupt.
    fn unpend(&mut self);

    fn listen(&mut self);

    fn unlisten(&mut self);

    fn enable(&mut self);

    fn disable(&mut self);

    /// Transfers still outstanding, zero once the transfer completed.
    fn remaining(&mut self) -> u16;
}

/// Free-running timer pacing the ADC.
pub trait SampleClock {
    fn set_period(&mut self, period: u16);

    fn set_prescaler(&mut self, prescaler: Prescaler);

    /// Clear a pending update interrupt.
    fn unpend(&mut self);

    fn unlisten(&mut self);

    fn start(&mut self);

    fn stop(&mut self);
}
