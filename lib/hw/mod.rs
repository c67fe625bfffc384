mod adc;
mod helper;
mod timers;

pub use adc::{Adc, Dma};
pub use helper::*;
pub use timers::SampleTimer;
