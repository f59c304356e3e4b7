use std::time::Duration;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Schedule {
    /// Armed on the first `advance`.
    Idle,
    Armed { next_edge: Duration },
    Stopped,
}

/// A free-running square wave.
///
/// The clock owns no timer: the host delivers its notion of "now" through
/// [`Clock::advance`], and edges are scheduled at fixed multiples of the period
/// from the moment the clock was armed, so late deliveries do not accumulate drift.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clock {
    period: Duration,
    schedule: Schedule,
    output: bool,
}

impl Clock {
    pub fn new(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::InvalidClockPeriod);
        }
        Ok(Self {
            period,
            schedule: Schedule::Idle,
            output: false,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn output(&self) -> bool {
        self.output
    }

    pub fn is_running(&self) -> bool {
        self.schedule != Schedule::Stopped
    }

    /// Time of the next scheduled edge, if armed.
    pub fn next_edge(&self) -> Option<Duration> {
        match self.schedule {
            Schedule::Armed { next_edge } => Some(next_edge),
            Schedule::Idle | Schedule::Stopped => None,
        }
    }

    pub fn start(&mut self, now: Duration) {
        self.schedule = Schedule::Armed {
            next_edge: now + self.period,
        };
    }

    pub fn stop(&mut self) {
        self.schedule = Schedule::Stopped;
    }

    /// Changes the period and re-arms the schedule from `now`.
    pub fn set_period(&mut self, period: Duration, now: Duration) -> Result<()> {
        if period.is_zero() {
            return Err(Error::InvalidClockPeriod);
        }
        self.period = period;
        self.start(now);
        Ok(())
    }

    /// Applies every edge due at or before `now`. Returns true if the output flipped.
    pub fn advance(&mut self, now: Duration) -> bool {
        let next_edge = match self.schedule {
            Schedule::Idle => {
                self.start(now);
                return false;
            }
            Schedule::Stopped => return false,
            Schedule::Armed { next_edge } => next_edge,
        };
        if now < next_edge {
            return false;
        }
        let period = self.period.as_nanos();
        let edges = (now - next_edge).as_nanos() / period + 1;
        let flipped = edges % 2 == 1;
        self.output ^= flipped;
        let next_edge = next_edge.as_nanos() + edges * period;
        self.schedule = Schedule::Armed {
            next_edge: Duration::from_nanos(u64::try_from(next_edge).unwrap_or(u64::MAX)),
        };
        flipped
    }

    pub(crate) fn force(&mut self, output: bool) {
        self.output = output;
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::Clock;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn zero_period_is_rejected() {
        assert!(Clock::new(Duration::ZERO).is_err());
        let mut clock = Clock::new(ms(10)).unwrap();
        assert!(clock.set_period(Duration::ZERO, ms(0)).is_err());
        assert_eq!(clock.period(), ms(10));
    }

    #[test]
    fn toggles_once_per_period() {
        let mut clock = Clock::new(ms(100)).unwrap();
        assert!(!clock.advance(ms(0)));
        assert!(!clock.advance(ms(99)));
        assert!(!clock.output());
        assert!(clock.advance(ms(100)));
        assert!(clock.output());
        assert!(!clock.advance(ms(150)));
        assert!(clock.advance(ms(205)));
        assert!(!clock.output());
    }

    #[test]
    fn late_delivery_keeps_the_grid() {
        let mut clock = Clock::new(ms(100)).unwrap();
        clock.advance(ms(0));
        // Edges at 100 and 200 are both due: two flips cancel out.
        assert!(!clock.advance(ms(230)));
        assert!(!clock.output());
        assert_eq!(clock.next_edge(), Some(ms(300)));
        assert!(clock.advance(ms(300)));
    }

    #[test]
    fn stopped_clock_holds() {
        let mut clock = Clock::new(ms(10)).unwrap();
        clock.advance(ms(0));
        clock.advance(ms(10));
        assert!(clock.output());
        clock.stop();
        assert!(!clock.is_running());
        assert!(!clock.advance(ms(1000)));
        assert!(clock.output());
        clock.start(ms(1000));
        assert!(clock.advance(ms(1010)));
        assert!(!clock.output());
    }

    #[test]
    fn set_period_rearms_from_now() {
        let mut clock = Clock::new(ms(100)).unwrap();
        clock.advance(ms(0));
        clock.set_period(ms(40), ms(50)).unwrap();
        assert_eq!(clock.next_edge(), Some(ms(90)));
        assert!(!clock.advance(ms(89)));
        assert!(clock.advance(ms(90)));
    }
}
