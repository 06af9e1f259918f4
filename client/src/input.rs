//! Scripted input with sequencing

use clap::ValueEnum;
use shared::{Buttons, ClientInput};
use std::time::{Duration, Instant};

/// How long the bot holds one direction before switching.
pub const BOT_SWITCH_PERIOD: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum InputMode {
    /// Alternate UP and DOWN every two seconds
    #[default]
    Bot,
    Up,
    Down,
    Idle,
}

/// Produces the buttons to send each input tick, numbered from 1.
pub struct InputSource {
    mode: InputMode,
    started: Instant,
    next_sequence: u32,
}

impl InputSource {
    pub fn new(mode: InputMode) -> Self {
        Self {
            mode,
            started: Instant::now(),
            next_sequence: 1,
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Buttons held `elapsed` after the source was created.
    pub fn buttons_at(&self, elapsed: Duration) -> Buttons {
        match self.mode {
            InputMode::Up => Buttons::UP,
            InputMode::Down => Buttons::DOWN,
            InputMode::Idle => Buttons::empty(),
            InputMode::Bot => {
                let phase = elapsed.as_millis() / BOT_SWITCH_PERIOD.as_millis();
                if phase % 2 == 0 {
                    Buttons::UP
                } else {
                    Buttons::DOWN
                }
            }
        }
    }

    /// Next message to send, stamped with a fresh sequence number.
    pub fn next_input(&mut self) -> ClientInput {
        let input = ClientInput::new(self.buttons_at(self.started.elapsed()), self.next_sequence);
        self.next_sequence = self.next_sequence.wrapping_add(1);
        input
    }
}

impl Default for InputSource {
    fn default() -> Self {
        Self::new(InputMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_source_creation() {
        let source = InputSource::default();
        assert_eq!(source.mode(), InputMode::Bot);
        assert_eq!(source.next_sequence, 1);
    }

    #[test]
    fn test_sequence_increments() {
        let mut source = InputSource::new(InputMode::Idle);
        let seqs: Vec<u32> = (0..3).map(|_| source.next_input().seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_fixed_modes() {
        let t = Duration::from_secs(5);
        assert_eq!(InputSource::new(InputMode::Up).buttons_at(t), Buttons::UP);
        assert_eq!(InputSource::new(InputMode::Down).buttons_at(t), Buttons::DOWN);
        assert_eq!(InputSource::new(InputMode::Idle).buttons_at(t), Buttons::empty());
    }

    #[test]
    fn test_bot_alternates_every_two_seconds() {
        let bot = InputSource::new(InputMode::Bot);
        assert_eq!(bot.buttons_at(Duration::ZERO), Buttons::UP);
        assert_eq!(bot.buttons_at(Duration::from_millis(1999)), Buttons::UP);
        assert_eq!(bot.buttons_at(Duration::from_millis(2000)), Buttons::DOWN);
        assert_eq!(bot.buttons_at(Duration::from_millis(3999)), Buttons::DOWN);
        assert_eq!(bot.buttons_at(Duration::from_millis(4000)), Buttons::UP);
    }

    #[test]
    fn test_input_carries_buttons() {
        let mut source = InputSource::new(InputMode::Down);
        assert_eq!(source.next_input().buttons(), Buttons::DOWN);
    }
}
