use core::sync::atomic::{AtomicU32, Ordering};

const DONE: u32 = 1 << 31;
const CAPTURED: u32 = 0xFFFF;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct CaptureStatus {
    pub done: bool,
    pub captured: u16,
}

/// Progress of the capture in flight.
///
/// Both fields share one word: the capture path is the only writer and a
/// reader always sees the flag and the count of the same store.
pub struct Session {
    state: AtomicU32,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub const fn new() -> Self {
        Session {
            state: AtomicU32::new(0),
        }
    }

    pub fn reset(&self) {
        self.state.store(0, Ordering::Release);
    }

    pub fn record(&self, captured: u16) {
        self.state.store(u32::from(captured), Ordering::Release);
    }

    pub fn complete(&self, captured: u16) {
        self.state.store(DONE | u32::from(captured), Ordering::Release);
    }

    pub fn status(&self) -> CaptureStatus {
        let state = self.state.load(Ordering::Acquire);
        CaptureStatus {
            done: state & DONE != 0,
            captured: (state & CAPTURED) as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        assert_eq!(Session::new().status(), CaptureStatus::default());
    }

    #[test]
    fn progress_then_done() {
        let session = Session::new();
        session.record(3);
        assert_eq!(
            session.status(),
            CaptureStatus {
                done: false,
                captured: 3
            }
        );

        session.complete(u16::MAX);
        assert_eq!(
            session.status(),
            CaptureStatus {
                done: true,
                captured: u16::MAX
            }
        );

        session.reset();
        assert_eq!(session.status(), CaptureStatus::default());
    }
}
