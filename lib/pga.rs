//! Programmable gain stage: a MAX5400 digital potentiometer per analog
//! channel, reached over SPI behind a 3-to-8 chip select decoder.

use core::convert::Infallible;
use embedded_hal::blocking::spi;
use embedded_hal::digital::v2::OutputPin;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Gain {
    X1,
    X2,
    X4,
    X5,
    X8,
    X10,
    X16,
    X32,
    /// Unknown selector, behaves as unity gain
    Default,
}

impl Gain {
    pub fn from_selector(selector: u8) -> Self {
        match selector {
            0 => Gain::X1,
            1 => Gain::X2,
            2 => Gain::X4,
            3 => Gain::X5,
            4 => Gain::X8,
            5 => Gain::X10,
            6 => Gain::X16,
            7 => Gain::X32,
            _ => Gain::Default,
        }
    }

    pub fn factor(self) -> u8 {
        match self {
            Gain::X1 | Gain::Default => 1,
            Gain::X2 => 2,
            Gain::X4 => 4,
            Gain::X5 => 5,
            Gain::X8 => 8,
            Gain::X10 => 10,
            Gain::X16 => 16,
            Gain::X32 => 32,
        }
    }

    /// Wiper position giving this gain, 255 / gain rounded.
    pub fn wiper(self) -> u8 {
        match self {
            Gain::X1 | Gain::Default => 255,
            Gain::X2 => 128,
            Gain::X4 => 64,
            Gain::X5 => 51,
            Gain::X8 => 32,
            Gain::X10 => 26,
            Gain::X16 => 16,
            Gain::X32 => 8,
        }
    }
}

/// Address driven onto the chip select decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct ChipSelect(u8);

impl ChipSelect {
    /// Decoder output with nothing connected.
    pub const IDLE: ChipSelect = ChipSelect(7);

    /// Channels 1 to 6 have a potentiometer, anything else deselects.
    pub fn for_channel(channel: u8) -> Self {
        match channel {
            1..=6 => ChipSelect(channel - 1),
            _ => Self::IDLE,
        }
    }

    pub fn address(self) -> u8 {
        self.0
    }

    pub fn lines(self) -> [bool; 3] {
        [self.0 & 1 != 0, self.0 & 2 != 0, self.0 & 4 != 0]
    }
}

pub trait GainStage {
    fn set_gain(&mut self, channel: u8, gain: Gain) -> Result<()>;
}

pub struct Pga<SPI, CS1, CS2, CS3> {
    spi: SPI,
    cs1: CS1,
    cs2: CS2,
    cs3: CS3,
}

impl<SPI, CS1, CS2, CS3> Pga<SPI, CS1, CS2, CS3>
where
    SPI: spi::Write<u8>,
    CS1: OutputPin<Error = Infallible>,
    CS2: OutputPin<Error = Infallible>,
    CS3: OutputPin<Error = Infallible>,
{
    pub fn new(spi: SPI, cs1: CS1, cs2: CS2, cs3: CS3) -> Self {
        let mut pga = Pga { spi, cs1, cs2, cs3 };
        pga.select(ChipSelect::IDLE);
        pga
    }

    fn select(&mut self, cs: ChipSelect) {
        let [cs1, cs2, cs3] = cs.lines();
        let _ = self.cs1.set_state(cs1.into());
        let _ = self.cs2.set_state(cs2.into());
        let _ = self.cs3.set_state(cs3.into());
    }
}

impl<SPI, CS1, CS2, CS3> GainStage for Pga<SPI, CS1, CS2, CS3>
where
    SPI: spi::Write<u8>,
    CS1: OutputPin<Error = Infallible>,
    CS2: OutputPin<Error = Infallible>,
    CS3: OutputPin<Error = Infallible>,
{
    fn set_gain(&mut self, channel: u8, gain: Gain) -> Result<()> {
        self.select(ChipSelect::for_channel(channel));
        let written = self.spi.write(&[gain.wiper()]);
        self.select(ChipSelect::IDLE);
        written.map_err(|_| Error::Bus)?;
        debug!("channel {=u8} gain {=u8}", channel, gain.factor());
        Ok(())
    }
}
