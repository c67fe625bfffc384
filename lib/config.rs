//! Translation of the host configuration byte into an ADC setup.
//!
//! Layout of the configuration byte:
//!
//! | bits | meaning                                                      |
//! |------|--------------------------------------------------------------|
//! | 0-3  | analog input sampled by the first channel                    |
//! | 4    | channels 1-3 use the shared sample-and-hold inputs           |
//! | 7    | trigger enable (interrupt path), 12-bit resolution (DMA path) |
//!
//! Every byte maps to a configuration; nothing here can fail except the
//! sample count and delay carried along with it.

use crate::error::{Error, Result};
use crate::timing::TimeGap;

pub const MAX_CHANNELS: usize = 4;

const CH0_SOURCE_MASK: u8 = 0x0F;
const SHARED_CH123_MASK: u8 = 0x10;
const HIGH_BIT_MASK: u8 = 0x80;
// 0xF terminates the conversion sequence, it can not name an input
const SEQUENCE_END: u8 = 0x0F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum ChannelCount {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl ChannelCount {
    pub fn get(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Resolution {
    Bits10,
    Bits12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum OperationMode {
    /// Up to four channels per conversion group, one interrupt per group
    Simultaneous10Bit,
    Dma10Bit,
    Dma12Bit,
}

impl OperationMode {
    pub fn resolution(self) -> Resolution {
        match self {
            OperationMode::Dma12Bit => Resolution::Bits12,
            _ => Resolution::Bits10,
        }
    }

    pub fn path(self) -> CapturePath {
        match self {
            OperationMode::Simultaneous10Bit => CapturePath::Interrupt,
            OperationMode::Dma10Bit | OperationMode::Dma12Bit => CapturePath::Dma,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum CapturePath {
    Interrupt,
    Dma,
}

/// Sample-and-hold sources of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct Inputs {
    pub ch0: u8,
    pub shared_ch123: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct CaptureMode {
    pub mode: OperationMode,
    pub inputs: Inputs,
    pub channels: ChannelCount,
    pub trigger: bool,
}

impl CaptureMode {
    pub fn simultaneous(config: u8, channels: ChannelCount) -> Self {
        CaptureMode {
            mode: OperationMode::Simultaneous10Bit,
            inputs: Inputs {
                ch0: ch0_source(config),
                shared_ch123: config & SHARED_CH123_MASK != 0,
            },
            channels,
            trigger: config & HIGH_BIT_MASK != 0,
        }
    }

    pub fn dma(config: u8) -> Self {
        let mode = if config & HIGH_BIT_MASK != 0 {
            OperationMode::Dma12Bit
        } else {
            OperationMode::Dma10Bit
        };
        CaptureMode {
            mode,
            inputs: Inputs {
                ch0: ch0_source(config),
                shared_ch123: false,
            },
            channels: ChannelCount::One,
            trigger: false,
        }
    }

    pub fn path(&self) -> CapturePath {
        self.mode.path()
    }
}

fn ch0_source(config: u8) -> u8 {
    match config & CH0_SOURCE_MASK {
        SEQUENCE_END => 0,
        input => input,
    }
}

/// A validated capture. Only the two path constructors exist, so a DMA
/// request is always single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct CaptureRequest {
    mode: CaptureMode,
    samples: u16,
    gap: TimeGap,
}

impl CaptureRequest {
    pub fn interrupt(channels: ChannelCount, config: u8, samples: u16, delay: u16) -> Result<Self> {
        Self::new(CaptureMode::simultaneous(config, channels), samples, delay)
    }

    pub fn dma(config: u8, samples: u16, delay: u16) -> Result<Self> {
        Self::new(CaptureMode::dma(config), samples, delay)
    }

    fn new(mode: CaptureMode, samples: u16, delay: u16) -> Result<Self> {
        if samples == 0 {
            return Err(Error::EmptyCapture);
        }
        let gap = TimeGap::from_delay(delay)?;
        Ok(CaptureRequest { mode, samples, gap })
    }

    pub fn mode(&self) -> &CaptureMode {
        &self.mode
    }

    pub fn channels(&self) -> ChannelCount {
        self.mode.channels
    }

    pub fn samples(&self) -> u16 {
        self.samples
    }

    pub fn gap(&self) -> TimeGap {
        self.gap
    }

    pub fn delay(&self) -> u16 {
        self.gap.delay()
    }

    pub fn trigger(&self) -> bool {
        self.mode.trigger
    }
}
