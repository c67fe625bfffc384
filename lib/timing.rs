use crate::error::{Error, Result};
use crate::hil::SampleClock;

/// Smallest auto-reload value the timer still counts with.
const MIN_PERIOD: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Prescaler {
    Div1,
    Div8,
    Div64,
    Div256,
}

impl Prescaler {
    pub fn divisor(self) -> u16 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div8 => 8,
            Prescaler::Div64 => 64,
            Prescaler::Div256 => 256,
        }
    }
}

/// Inter-sample delay as programmed into the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct TimeGap {
    delay: u16,
    period: u16,
}

impl TimeGap {
    pub const PRESCALER: Prescaler = Prescaler::Div8;

    /// `delay` is in prescaled timer ticks. Zero is rejected, a delay of one
    /// tick is clamped to the shortest period the timer supports.
    pub fn from_delay(delay: u16) -> Result<Self> {
        if delay == 0 {
            return Err(Error::InvalidDelay);
        }
        Ok(TimeGap {
            delay,
            period: (delay - 1).max(MIN_PERIOD),
        })
    }

    pub fn delay(&self) -> u16 {
        self.delay
    }

    pub fn period(&self) -> u16 {
        self.period
    }

    pub fn prescaler(&self) -> Prescaler {
        Self::PRESCALER
    }
}

pub struct Pacer<C> {
    clock: C,
    gap: Option<TimeGap>,
}

impl<C> Pacer<C>
where
    C: SampleClock,
{
    pub fn new(clock: C) -> Self {
        Pacer { clock, gap: None }
    }

    /// Restart the sample clock with a new gap. The timer interrupt stays
    /// off, the ADC consumes the timer output directly.
    pub fn start(&mut self, gap: TimeGap) {
        self.clock.stop();
        self.clock.set_period(gap.period());
        self.clock.set_prescaler(gap.prescaler());
        self.clock.unpend();
        self.clock.unlisten();
        self.clock.start();
        self.gap = Some(gap);
        trace!("sample clock period {=u16}", gap.period());
    }

    pub fn stop(&mut self) {
        self.clock.stop();
        self.gap = None;
    }

    pub fn gap(&self) -> Option<TimeGap> {
        self.gap
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{ClockOp, MockClock};

    #[test]
    fn period_is_delay_minus_one() {
        let gap = TimeGap::from_delay(1000).unwrap();
        assert_eq!(gap.period(), 999);
        assert_eq!(gap.prescaler(), Prescaler::Div8);
        assert_eq!(gap.prescaler().divisor(), 8);
    }

    #[test]
    fn degenerate_delays() {
        assert_eq!(TimeGap::from_delay(0), Err(Error::InvalidDelay));
        assert_eq!(TimeGap::from_delay(1).unwrap().period(), 1);
        assert_eq!(TimeGap::from_delay(2).unwrap().period(), 1);
        assert_eq!(TimeGap::from_delay(u16::MAX).unwrap().period(), u16::MAX - 1);
    }

    #[test]
    fn start_programs_timer_in_order() {
        let mut pacer = Pacer::new(MockClock::default());
        pacer.start(TimeGap::from_delay(1000).unwrap());

        assert_eq!(
            pacer.clock().ops,
            vec![
                ClockOp::Stop,
                ClockOp::Period(999),
                ClockOp::Prescaler(Prescaler::Div8),
                ClockOp::Unpend,
                ClockOp::Unlisten,
                ClockOp::Start,
            ]
        );
        assert!(pacer.clock().running);
        assert_eq!(pacer.gap().map(|gap| gap.delay()), Some(1000));
    }

    #[test]
    fn stop_halts_clock() {
        let mut pacer = Pacer::new(MockClock::default());
        pacer.start(TimeGap::from_delay(10).unwrap());
        pacer.stop();
        assert!(!pacer.clock().running);
        assert_eq!(pacer.gap(), None);
    }
}
