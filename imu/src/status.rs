use log::{error, info};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StatusState {
    Waiting,
    Recording,
    Error,
}

/// Write-only status sink, e.g. an LED.
pub trait StatusIndicator {
    fn set(&mut self, state: StatusState);
}

/// Reports status changes through the log. Repeated states are not logged
/// again.
#[derive(Debug, Default)]
pub struct LogIndicator {
    current: Option<StatusState>,
}

impl LogIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<StatusState> {
        self.current
    }
}

impl StatusIndicator for LogIndicator {
    fn set(&mut self, state: StatusState) {
        if self.current == Some(state) {
            return;
        }
        self.current = Some(state);
        match state {
            StatusState::Error => error!("Status: {}", state),
            _ => info!("Status: {}", state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_latest_state() {
        let mut indicator = LogIndicator::new();
        assert_eq!(indicator.current(), None);
        indicator.set(StatusState::Waiting);
        indicator.set(StatusState::Recording);
        indicator.set(StatusState::Recording);
        assert_eq!(indicator.current(), Some(StatusState::Recording));
        indicator.set(StatusState::Error);
        assert_eq!(indicator.current(), Some(StatusState::Error));
    }
}
