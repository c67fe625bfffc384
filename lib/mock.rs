//! Host side stand-ins for the peripherals.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::blocking::spi;
use embedded_hal::digital::v2::OutputPin;
use embedded_hal::serial;
use rtic_core::Mutex;

use crate::config::{ChannelCount, Inputs, OperationMode, MAX_CHANNELS};
use crate::hil::{SampleClock, ScopeAdc, ScopeDma};
use crate::timing::Prescaler;

pub const ADC_DATA_ADDRESS: u32 = 0x4001_2440;

#[derive(Debug, Default)]
pub struct AdcLog {
    pub mode: Option<(OperationMode, Inputs)>,
    pub channels: Option<ChannelCount>,
    pub listening: bool,
    pub running: bool,
    pub unpended: usize,
    pub groups: VecDeque<Vec<u16>>,
}

#[derive(Clone, Default)]
pub struct MockAdc(pub Rc<RefCell<AdcLog>>);

impl MockAdc {
    /// Queue one finished conversion group.
    pub fn convert(&self, group: &[u16]) {
        self.0.borrow_mut().groups.push_back(group.to_vec());
    }

    pub fn log(&self) -> std::cell::Ref<'_, AdcLog> {
        self.0.borrow()
    }
}

impl ScopeAdc for MockAdc {
    fn set_operation_mode(&mut self, mode: OperationMode, inputs: Inputs) {
        self.0.borrow_mut().mode = Some((mode, inputs));
    }

    fn set_conversion_channels(&mut self, channels: ChannelCount) {
        self.0.borrow_mut().channels = Some(channels);
    }

    fn unpend(&mut self) {
        self.0.borrow_mut().unpended += 1;
    }

    fn listen(&mut self) {
        self.0.borrow_mut().listening = true;
    }

    fn unlisten(&mut self) {
        self.0.borrow_mut().listening = false;
    }

    fn start(&mut self) {
        self.0.borrow_mut().running = true;
    }

    fn stop(&mut self) {
        self.0.borrow_mut().running = false;
    }

    fn read_group(&mut self, group: &mut [u16; MAX_CHANNELS]) -> bool {
        match self.0.borrow_mut().groups.pop_front() {
            Some(values) => {
                for (slot, value) in group.iter_mut().zip(values) {
                    *slot = value;
                }
                true
            }
            None => false,
        }
    }

    fn data_address(&self) -> u32 {
        ADC_DATA_ADDRESS
    }
}

#[derive(Debug, Default)]
pub struct DmaLog {
    pub transfer: Option<(u32, u32, u16)>,
    pub listening: bool,
    pub enabled: bool,
    pub unpended: usize,
    /// Transfers the mock reports as outstanding
    pub remaining: u16,
}

#[derive(Clone, Default)]
pub struct MockDma(pub Rc<RefCell<DmaLog>>);

impl MockDma {
    pub fn log(&self) -> std::cell::Ref<'_, DmaLog> {
        self.0.borrow()
    }

    pub fn set_remaining(&self, remaining: u16) {
        self.0.borrow_mut().remaining = remaining;
    }
}

impl ScopeDma for MockDma {
    fn configure(&mut self, source: u32, destination: u32, count: u16) {
        self.0.borrow_mut().transfer = Some((source, destination, count));
    }

    fn unpend(&mut self) {
        self.0.borrow_mut().unpended += 1;
    }

    fn listen(&mut self) {
        self.0.borrow_mut().listening = true;
    }

    fn unlisten(&mut self) {
        self.0.borrow_mut().listening = false;
    }

    fn enable(&mut self) {
        self.0.borrow_mut().enabled = true;
    }

    fn disable(&mut self) {
        self.0.borrow_mut().enabled = false;
    }

    fn remaining(&mut self) -> u16 {
        self.0.borrow().remaining
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOp {
    Period(u16),
    Prescaler(Prescaler),
    Unpend,
    Unlisten,
    Start,
    Stop,
}

#[derive(Debug, Default)]
pub struct MockClock {
    pub ops: Vec<ClockOp>,
    pub running: bool,
}

impl SampleClock for MockClock {
    fn set_period(&mut self, period: u16) {
        self.ops.push(ClockOp::Period(period));
    }

    fn set_prescaler(&mut self, prescaler: Prescaler) {
        self.ops.push(ClockOp::Prescaler(prescaler));
    }

    fn unpend(&mut self) {
        self.ops.push(ClockOp::Unpend);
    }

    fn unlisten(&mut self) {
        self.ops.push(ClockOp::Unlisten);
    }

    fn start(&mut self) {
        self.ops.push(ClockOp::Start);
        self.running = true;
    }

    fn stop(&mut self) {
        self.ops.push(ClockOp::Stop);
        self.running = false;
    }
}

#[derive(Debug, PartialEq)]
pub struct Disconnected;

/// Serial port fed from a byte script, replies collected in `tx`.
#[derive(Default)]
pub struct MockSerial {
    pub rx: VecDeque<u8>,
    pub tx: Vec<u8>,
}

impl MockSerial {
    pub fn new(rx: &[u8]) -> Self {
        MockSerial {
            rx: rx.iter().copied().collect(),
            tx: Vec::new(),
        }
    }
}

impl serial::Read<u8> for MockSerial {
    type Error = Disconnected;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.rx.pop_front().ok_or(nb::Error::Other(Disconnected))
    }
}

impl serial::Write<u8> for MockSerial {
    type Error = Disconnected;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        self.tx.push(word);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Pin(usize, bool),
    Spi(Vec<u8>),
}

pub type BusLog = Rc<RefCell<Vec<BusEvent>>>;

pub struct MockPin {
    pub index: usize,
    pub log: BusLog,
}

impl OutputPin for MockPin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(BusEvent::Pin(self.index, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.borrow_mut().push(BusEvent::Pin(self.index, true));
        Ok(())
    }
}

pub struct MockSpi {
    pub log: BusLog,
    pub fail: bool,
}

impl spi::Write<u8> for MockSpi {
    type Error = Disconnected;

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        if self.fail {
            return Err(Disconnected);
        }
        self.log.borrow_mut().push(BusEvent::Spi(words.to_vec()));
        Ok(())
    }
}

/// Exclusive access that remembers when it is held.
pub struct Locked<'a, V> {
    inner: &'a mut V,
    held: Rc<Cell<bool>>,
    locks: usize,
}

impl<'a, V> Locked<'a, V> {
    pub fn new(inner: &'a mut V) -> Self {
        Locked {
            inner,
            held: Rc::default(),
            locks: 0,
        }
    }

    /// Set while a lock closure runs.
    pub fn flag(&self) -> Rc<Cell<bool>> {
        self.held.clone()
    }

    pub fn locks(&self) -> usize {
        self.locks
    }
}

impl<V> Mutex for Locked<'_, V> {
    type T = V;

    fn lock<R>(&mut self, f: impl FnOnce(&mut V) -> R) -> R {
        self.held.set(true);
        self.locks += 1;
        let result = f(&mut *self.inner);
        self.held.set(false);
        result
    }
}
