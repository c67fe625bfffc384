use stm32g0xx_hal::rcc::Rcc;
use stm32g0xx_hal::stm32g0::stm32g070::{RCC, TIM3};

use crate::hil::SampleClock;
use crate::timing::Prescaler;

/// TIM3 update events drive the ADC external trigger through TRGO.
pub struct SampleTimer {
    timer: TIM3,
}

impl SampleTimer {
    pub fn new(pac_timer: TIM3, rcc: &mut Rcc) -> Self {
        SampleTimer::enable_clock_and_reset(rcc);
        let mut timer = SampleTimer { timer: pac_timer };
        timer.configure();
        timer
    }

    fn configure(&mut self) {
        // Up counting, stopped
        self.timer.cr1.write(|w| w.cen().clear_bit());
        // Update event as TRGO
        self.timer.cr2.write(|w| unsafe { w.mms().bits(0b010) });
        self.timer.dier.write(|w| w.uie().clear_bit());
    }

    fn enable_clock_and_reset(_: &mut Rcc) {
        let rcc = unsafe { &(*RCC::ptr()) };
        rcc.apbenr1.modify(|_, w| w.tim3en().set_bit());
        rcc.apbrstr1.modify(|_, w| w.tim3rst().set_bit());
        rcc.apbrstr1.modify(|_, w| w.tim3rst().clear_bit());
    }
}

impl SampleClock for SampleTimer {
    fn set_period(&mut self, period: u16) {
        self.timer.arr.write(|w| unsafe { w.arr_l().bits(period) });
    }

    fn set_prescaler(&mut self, prescaler: Prescaler) {
        self.timer
            .psc
            .write(|w| unsafe { w.psc().bits(prescaler.divisor() - 1) });

        // Trigger update event to load the registers
        self.timer.cr1.modify(|_, w| w.urs().set_bit());
        self.timer.egr.write(|w| w.ug().set_bit());
        self.timer.cr1.modify(|_, w| w.urs().clear_bit());
    }

    fn unpend(&mut self) {
        self.timer.sr.modify(|_, w| w.uif().clear_bit());
    }

    fn unlisten(&mut self) {
        self.timer.dier.modify(|_, w| w.uie().clear_bit());
    }

    fn start(&mut self) {
        self.timer.cnt.reset();
        self.timer.cr1.modify(|_, w| w.cen().set_bit());
    }

    fn stop(&mut self) {
        self.timer.cr1.modify(|_, w| w.cen().clear_bit());
    }
}
