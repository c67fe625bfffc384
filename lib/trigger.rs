//! Trigger gating for the interrupt driven capture path.
//!
//! The trigger fires on a rising edge of the selected channel: the signal has
//! to drop below `level - HYSTERESIS` first (Ready) and then reach `level`
//! (Triggered). Groups seen before the trigger fires are discarded by the
//! capture path. Every evaluation advances a waiting budget by
//! `delay >> prescaler` ticks, once it reaches `TRIGGER_TIMEOUT` the trigger
//! fires on its own.

use crate::config::MAX_CHANNELS;

/// Waiting budget in timer ticks before the trigger fires unconditionally.
pub const TRIGGER_TIMEOUT: u32 = 1_000_000;
/// Codes below the level the signal has to reach before a crossing counts.
pub const HYSTERESIS: u16 = 10;

const CHANNEL_MASK: u8 = 0x0F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum TriggerState {
    Disarmed,
    Waiting,
    Ready,
    Triggered,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct TriggerConfig {
    channel: usize,
    prescaler: u8,
    level: u16,
}

impl TriggerConfig {
    /// Channels past the last one fall back to channel 0.
    pub fn new(channel: usize, prescaler: u8, level: u16) -> Self {
        let channel = if channel < MAX_CHANNELS { channel } else { 0 };
        TriggerConfig {
            channel,
            prescaler,
            level,
        }
    }

    /// Decode the `ConfigureTrigger` byte: a one-hot channel mask in the low
    /// nibble (lowest set bit wins, none means channel 0) and the prescaler in
    /// the high nibble.
    pub fn from_command(config: u8, level: u16) -> Self {
        let mask = config & CHANNEL_MASK;
        let channel = if mask == 0 {
            0
        } else {
            mask.trailing_zeros() as usize
        };
        TriggerConfig::new(channel, config >> 4, level)
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn prescaler(&self) -> u8 {
        self.prescaler
    }

    pub fn level(&self) -> u16 {
        self.level
    }
}

pub struct TriggerController {
    config: TriggerConfig,
    state: TriggerState,
    waited: u32,
    step: u32,
}

impl Default for TriggerController {
    fn default() -> Self {
        TriggerController {
            config: TriggerConfig::default(),
            state: TriggerState::Disarmed,
            waited: 0,
            step: 0,
        }
    }
}

impl TriggerController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new configuration, the state is left alone.
    pub fn configure(&mut self, config: TriggerConfig) {
        self.config = config;
    }

    pub fn config(&self) -> TriggerConfig {
        self.config
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn is_triggered(&self) -> bool {
        self.state == TriggerState::Triggered
    }

    /// Wait for the trigger condition, or let every group through right away.
    pub fn arm_or_bypass(&mut self, trigger: bool, delay: u16) {
        self.waited = 0;
        if trigger {
            self.state = TriggerState::Waiting;
            self.step = u32::from(delay) >> u32::from(self.config.prescaler);
        } else {
            self.state = TriggerState::Triggered;
            self.step = 0;
        }
    }

    /// Evaluate one conversion group. A group shorter than the trigger
    /// channel is compared on its first value.
    pub fn observe(&mut self, group: &[u16]) -> TriggerState {
        let sample = match group.get(self.config.channel).or_else(|| group.first()) {
            Some(sample) => *sample,
            None => return self.state,
        };

        let level = self.config.level;
        match self.state {
            TriggerState::Waiting if sample < level.saturating_sub(HYSTERESIS) => {
                self.state = TriggerState::Ready;
            }
            TriggerState::Ready if sample >= level => {
                self.state = TriggerState::Triggered;
                debug!("triggered at {=u16}", sample);
                return self.state;
            }
            TriggerState::Disarmed | TriggerState::Triggered => return self.state,
            _ => {}
        }

        self.waited = self.waited.saturating_add(self.step);
        if self.waited >= TRIGGER_TIMEOUT {
            self.state = TriggerState::Triggered;
            debug!("trigger timed out");
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed(level: u16, prescaler: u8, delay: u16) -> TriggerController {
        let mut trigger = TriggerController::new();
        trigger.configure(TriggerConfig::new(0, prescaler, level));
        trigger.arm_or_bypass(true, delay);
        trigger
    }

    #[test]
    fn starts_disarmed() {
        let mut trigger = TriggerController::new();
        assert_eq!(trigger.state(), TriggerState::Disarmed);
        assert_eq!(trigger.observe(&[1000]), TriggerState::Disarmed);
    }

    #[test]
    fn bypass_is_triggered_immediately() {
        let mut trigger = TriggerController::new();
        trigger.arm_or_bypass(false, 100);
        assert!(trigger.is_triggered());
    }

    #[test]
    fn configure_keeps_state() {
        let mut trigger = armed(512, 0, 100);
        trigger.configure(TriggerConfig::new(1, 2, 300));
        assert_eq!(trigger.state(), TriggerState::Waiting);
        assert_eq!(trigger.config().level(), 300);
    }

    #[test]
    fn rising_crossing_fires() {
        let mut trigger = armed(512, 0, 1);
        // Already above the level, a crossing needs the signal low first
        assert_eq!(trigger.observe(&[600]), TriggerState::Waiting);
        // Inside the hysteresis band
        assert_eq!(trigger.observe(&[505]), TriggerState::Waiting);
        assert_eq!(trigger.observe(&[100]), TriggerState::Ready);
        assert_eq!(trigger.observe(&[511]), TriggerState::Ready);
        assert_eq!(trigger.observe(&[512]), TriggerState::Triggered);
        // Terminal
        assert_eq!(trigger.observe(&[0]), TriggerState::Triggered);
    }

    #[test]
    fn rearm_clears_stale_latch() {
        let mut trigger = armed(512, 0, 1);
        trigger.observe(&[0]);
        trigger.observe(&[1023]);
        assert!(trigger.is_triggered());

        trigger.arm_or_bypass(true, 1);
        assert_eq!(trigger.state(), TriggerState::Waiting);
    }

    #[test]
    fn compares_selected_channel() {
        let mut trigger = TriggerController::new();
        trigger.configure(TriggerConfig::new(1, 0, 512));
        trigger.arm_or_bypass(true, 1);

        assert_eq!(trigger.observe(&[1000, 0]), TriggerState::Ready);
        assert_eq!(trigger.observe(&[0, 1000]), TriggerState::Triggered);
    }

    #[test]
    fn channel_outside_group_uses_first() {
        let mut trigger = TriggerController::new();
        trigger.configure(TriggerConfig::new(3, 0, 512));
        trigger.arm_or_bypass(true, 1);

        assert_eq!(trigger.observe(&[0]), TriggerState::Ready);
        assert_eq!(trigger.observe(&[600]), TriggerState::Triggered);
    }

    #[test]
    fn times_out() {
        // 100_000 ticks per evaluation, ten evaluations to time out
        let mut trigger = armed(512, 0, 50_000);
        trigger.step = 100_000;
        for _ in 0..9 {
            assert_eq!(trigger.observe(&[1000]), TriggerState::Waiting);
        }
        assert_eq!(trigger.observe(&[1000]), TriggerState::Triggered);
    }

    #[test]
    fn prescaler_slows_timeout() {
        let trigger = armed(512, 3, 1000);
        assert_eq!(trigger.step, 125);

        let mut trigger = armed(512, 15, 1000);
        for _ in 0..10_000 {
            trigger.observe(&[1000]);
        }
        assert_eq!(trigger.state(), TriggerState::Waiting);
    }

    #[test]
    fn command_byte_decoding() {
        let config = TriggerConfig::from_command(0x32, 512);
        assert_eq!(config.channel(), 1);
        assert_eq!(config.prescaler(), 3);
        assert_eq!(config.level(), 512);

        assert_eq!(TriggerConfig::from_command(0x00, 0).channel(), 0);
        assert_eq!(TriggerConfig::from_command(0x08, 0).channel(), 3);
        // Several bits set, the lowest wins
        assert_eq!(TriggerConfig::from_command(0x0C, 0).channel(), 2);
        assert_eq!(TriggerConfig::new(7, 0, 0).channel(), 0);
    }
}
