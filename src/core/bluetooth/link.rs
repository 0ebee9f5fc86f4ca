//! Radio power state tracking.
//!
//! The link state machine only decides *what* to do with the scanner when
//! the radio changes state; the transport carries it out.

use log::{info, warn};

use crate::core::bluetooth::types::RadioState;

/// What the scanner should do after a radio transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanAction {
    Start,
    Stop,
    None,
}

pub struct LinkStateMachine {
    state: RadioState,
}

impl LinkStateMachine {
    pub fn new() -> Self {
        Self {
            state: RadioState::Unknown,
        }
    }

    pub fn state(&self) -> RadioState {
        self.state
    }

    pub fn is_scanning(&self) -> bool {
        self.state == RadioState::RadioOn
    }

    /// Applies a radio state report. Repeated reports of the current state
    /// are ignored, so "radio unavailable" is logged once per transition.
    pub fn transition(&mut self, next: RadioState) -> ScanAction {
        if next == self.state {
            return ScanAction::None;
        }
        let previous = std::mem::replace(&mut self.state, next);

        match next {
            RadioState::RadioOn => {
                info!("Bluetooth radio powered on ({:?} -> RadioOn), starting scan", previous);
                ScanAction::Start
            }
            RadioState::RadioOff => {
                warn!("Bluetooth is not available.");
                if previous == RadioState::RadioOn {
                    ScanAction::Stop
                } else {
                    ScanAction::None
                }
            }
            RadioState::Unknown => {
                warn!("Bluetooth radio state unknown.");
                if previous == RadioState::RadioOn {
                    ScanAction::Stop
                } else {
                    ScanAction::None
                }
            }
        }
    }
}

impl Default for LinkStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_starts_scanning_once() {
        let mut link = LinkStateMachine::new();
        assert_eq!(link.transition(RadioState::RadioOn), ScanAction::Start);
        assert_eq!(link.transition(RadioState::RadioOn), ScanAction::None);
        assert!(link.is_scanning());
    }

    #[test]
    fn power_off_stops_scanning_only_when_on() {
        let mut link = LinkStateMachine::new();
        assert_eq!(link.transition(RadioState::RadioOff), ScanAction::None);
        assert_eq!(link.transition(RadioState::RadioOn), ScanAction::Start);
        assert_eq!(link.transition(RadioState::RadioOff), ScanAction::Stop);
        assert_eq!(link.state(), RadioState::RadioOff);
        assert!(!link.is_scanning());
    }

    #[test]
    fn radio_off_to_on_restarts_scan() {
        let mut link = LinkStateMachine::new();
        link.transition(RadioState::RadioOff);
        assert_eq!(link.transition(RadioState::RadioOn), ScanAction::Start);
    }
}
