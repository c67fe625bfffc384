//! Oscilloscope commands received from the host.
//!
//! Every command is one opcode byte followed by its parameters. Integers are
//! 16-bit little endian. The device answers with the command's data, if any,
//! followed by a [`Response`] byte.
//!
//! The engine is shared with the capture interrupts. Requests hold its lock
//! only while touching it, never while the host link blocks.

use core::convert::TryFrom;
use embedded_hal::serial;
use rtic_core::Mutex;

use crate::config::{CaptureRequest, ChannelCount};
use crate::engine::AcquisitionEngine;
use crate::error::{Error, Result};
use crate::hil::{SampleClock, ScopeAdc, ScopeDma};
use crate::pga::{Gain, GainStage};
use crate::trigger::TriggerConfig;

/// Byte oriented host connection.
pub trait HostLink {
    fn read_byte(&mut self) -> Result<u8>;

    fn write_byte(&mut self, byte: u8) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    fn read_int(&mut self) -> Result<u16> {
        let low = self.read_byte()?;
        let high = self.read_byte()?;
        Ok(u16::from_le_bytes([low, high]))
    }

    fn write_int(&mut self, value: u16) -> Result<()> {
        for byte in value.to_le_bytes().iter() {
            self.write_byte(*byte)?;
        }
        Ok(())
    }
}

impl<S> HostLink for S
where
    S: serial::Read<u8> + serial::Write<u8>,
{
    fn read_byte(&mut self) -> Result<u8> {
        nb::block!(serial::Read::read(self)).map_err(|_| Error::Link)
    }

    fn write_byte(&mut self, byte: u8) -> Result<()> {
        nb::block!(serial::Write::write(self, byte)).map_err(|_| Error::Link)
    }

    fn flush(&mut self) -> Result<()> {
        nb::block!(serial::Write::flush(self)).map_err(|_| Error::Link)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
#[repr(u8)]
pub enum Response {
    DoNotBother = 0,
    Success = 1,
    ArgumentError = 2,
    Failed = 3,
}

impl From<Error> for Response {
    fn from(error: Error) -> Self {
        match error {
            Error::CapacityExceeded { .. }
            | Error::InvalidDelay
            | Error::EmptyCapture
            | Error::InvalidChannel => Response::ArgumentError,
            Error::Busy | Error::Link | Error::Bus => Response::Failed,
        }
    }
}

fn respond(result: Result<()>) -> Response {
    match result {
        Ok(()) => Response::Success,
        Err(error) => {
            warn!("command failed: {}", error);
            error.into()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    CaptureOne = 0x01,
    CaptureTwo = 0x02,
    CaptureDma = 0x03,
    CaptureFour = 0x04,
    ConfigureTrigger = 0x05,
    GetCaptureStatus = 0x06,
    GetCaptureChannel = 0x07,
    SetPgaGain = 0x08,
    CaptureThree = 0x09,
    AbortCapture = 0x0A,
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(opcode: u8) -> core::result::Result<Self, Self::Error> {
        Ok(match opcode {
            0x01 => Command::CaptureOne,
            0x02 => Command::CaptureTwo,
            0x03 => Command::CaptureDma,
            0x04 => Command::CaptureFour,
            0x05 => Command::ConfigureTrigger,
            0x06 => Command::GetCaptureStatus,
            0x07 => Command::GetCaptureChannel,
            0x08 => Command::SetPgaGain,
            0x09 => Command::CaptureThree,
            0x0A => Command::AbortCapture,
            _ => return Err(opcode),
        })
    }
}

/// A command together with its parameters, read off the link before the
/// engine is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Request {
    Capture {
        channels: ChannelCount,
        config: u8,
        samples: u16,
        delay: u16,
    },
    CaptureDma {
        config: u8,
        samples: u16,
        delay: u16,
    },
    ConfigureTrigger {
        config: u8,
        level: u16,
    },
    GetCaptureStatus,
    GetCaptureChannel {
        channel: u8,
        count: u16,
        offset: u16,
    },
    SetPgaGain {
        channel: u8,
        gain: u8,
    },
    AbortCapture,
    Unknown(u8),
}

impl Request {
    pub fn read<L: HostLink>(link: &mut L) -> Result<Self> {
        let opcode = link.read_byte()?;
        let command = match Command::try_from(opcode) {
            Ok(command) => command,
            Err(opcode) => return Ok(Request::Unknown(opcode)),
        };
        trace!("command {}", command);

        let capture = |link: &mut L, channels| -> Result<Request> {
            Ok(Request::Capture {
                channels,
                config: link.read_byte()?,
                samples: link.read_int()?,
                delay: link.read_int()?,
            })
        };

        Ok(match command {
            Command::CaptureOne => capture(link, ChannelCount::One)?,
            Command::CaptureTwo => capture(link, ChannelCount::Two)?,
            Command::CaptureThree => capture(link, ChannelCount::Three)?,
            Command::CaptureFour => capture(link, ChannelCount::Four)?,
            Command::CaptureDma => Request::CaptureDma {
                config: link.read_byte()?,
                samples: link.read_int()?,
                delay: link.read_int()?,
            },
            Command::ConfigureTrigger => Request::ConfigureTrigger {
                config: link.read_byte()?,
                level: link.read_int()?,
            },
            Command::GetCaptureStatus => Request::GetCaptureStatus,
            Command::GetCaptureChannel => Request::GetCaptureChannel {
                channel: link.read_byte()?,
                count: link.read_int()?,
                offset: link.read_int()?,
            },
            Command::SetPgaGain => Request::SetPgaGain {
                channel: link.read_byte()?,
                gain: link.read_byte()?,
            },
            Command::AbortCapture => Request::AbortCapture,
        })
    }

    /// Run the request and write the reply.
    pub fn execute<E, A, D, C, G, L, const N: usize>(
        self,
        engine: &mut E,
        gain_stage: &mut G,
        link: &mut L,
    ) -> Result<()>
    where
        E: Mutex<T = AcquisitionEngine<A, D, C, N>>,
        A: ScopeAdc,
        D: ScopeDma,
        C: SampleClock,
        G: GainStage,
        L: HostLink,
    {
        let response = match self {
            Request::Capture {
                channels,
                config,
                samples,
                delay,
            } => respond(
                CaptureRequest::interrupt(channels, config, samples, delay)
                    .and_then(|request| engine.lock(|engine| engine.start_capture(request))),
            ),
            Request::CaptureDma {
                config,
                samples,
                delay,
            } => respond(
                CaptureRequest::dma(config, samples, delay)
                    .and_then(|request| engine.lock(|engine| engine.start_capture(request))),
            ),
            Request::ConfigureTrigger { config, level } => {
                let config = TriggerConfig::from_command(config, level);
                respond(engine.lock(|engine| engine.configure_trigger(config)))
            }
            Request::GetCaptureStatus => {
                let status = engine.lock(|engine| engine.status());
                link.write_byte(status.done as u8)?;
                link.write_int(status.captured)?;
                Response::Success
            }
            Request::GetCaptureChannel {
                channel,
                count,
                offset,
            } => {
                let channel = usize::from(channel);
                let checked = engine.lock(|engine| {
                    engine
                        .channel(channel)
                        .and_then(|segment| window(segment, offset, count))
                        .map(|_| ())
                });
                match checked {
                    Ok(()) => {
                        send_window(engine, channel, offset, count, link)?;
                        Response::Success
                    }
                    Err(error) => respond(Err(error)),
                }
            }
            Request::SetPgaGain { channel, gain } => {
                respond(gain_stage.set_gain(channel, Gain::from_selector(gain)))
            }
            Request::AbortCapture => {
                engine.lock(|engine| engine.abort());
                Response::Success
            }
            Request::Unknown(opcode) => {
                warn!("unknown opcode {=u8}", opcode);
                Response::ArgumentError
            }
        };

        link.write_byte(response as u8)?;
        link.flush()
    }
}

/// Words copied out per engine lock during readback.
const READBACK_CHUNK: usize = 32;

fn window(segment: &[u16], offset: u16, count: u16) -> Result<&[u16]> {
    let start = usize::from(offset);
    let end = start + usize::from(count);
    segment.get(start..end).ok_or(Error::InvalidChannel)
}

/// Stream a checked window of a channel segment, one chunk per lock.
fn send_window<E, A, D, C, L, const N: usize>(
    engine: &mut E,
    channel: usize,
    offset: u16,
    count: u16,
    link: &mut L,
) -> Result<()>
where
    E: Mutex<T = AcquisitionEngine<A, D, C, N>>,
    A: ScopeAdc,
    D: ScopeDma,
    C: SampleClock,
    L: HostLink,
{
    let mut chunk = [0u16; READBACK_CHUNK];
    let mut start = usize::from(offset);
    let end = start + usize::from(count);
    while start < end {
        let len = (end - start).min(READBACK_CHUNK);
        engine.lock(|engine| -> Result<()> {
            let words = engine
                .channel(channel)?
                .get(start..start + len)
                .ok_or(Error::InvalidChannel)?;
            chunk[..len].copy_from_slice(words);
            Ok(())
        })?;
        for word in chunk[..len].iter() {
            link.write_int(*word)?;
        }
        start += len;
    }
    Ok(())
}
