#![cfg_attr(not(test), no_std)]

#[cfg(target_os = "none")]
use core::sync::atomic::{AtomicUsize, Ordering};

#[cfg(target_os = "none")]
use defmt_rtt as _; // global logger
#[cfg(target_os = "none")]
use panic_probe as _;

#[macro_use]
mod fmt;

pub mod buffer;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod hil;
#[cfg(target_os = "none")]
pub mod hw;
pub mod pga;
pub mod status;
pub mod timing;
pub mod trigger;

#[cfg(test)]
mod mock;

/// Number of sample words shared by all channel segments.
pub const BUFFER_SIZE: usize = 10_000;

pub type Buffer = [u16; BUFFER_SIZE];

#[cfg(target_os = "none")]
static COUNT: AtomicUsize = AtomicUsize::new(0);
#[cfg(target_os = "none")]
defmt::timestamp!("{=usize}", {
    let n = COUNT.load(Ordering::Relaxed);
    COUNT.store(n + 1, Ordering::Relaxed);
    n
});
