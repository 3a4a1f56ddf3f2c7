//! Board LEDs and buttons.
//!
//! The hardware drivers are external; this module defines the two traits the
//! application needs from them and the bitmask bookkeeping on top.

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Red LED index.
pub const LED_RED: u8 = 0;
/// Blue LED index.
pub const LED_BLUE: u8 = 1;
/// Green LED index.
pub const LED_GREEN: u8 = 2;

/// No LEDs.
pub const NO_LEDS_MSK: u32 = 0;
/// Red LED mask.
pub const LED_RED_MSK: u32 = 1 << LED_RED;
/// Blue LED mask.
pub const LED_BLUE_MSK: u32 = 1 << LED_BLUE;
/// Green LED mask.
pub const LED_GREEN_MSK: u32 = 1 << LED_GREEN;
/// Every LED on the board.
pub const ALL_LEDS_MSK: u32 = LED_RED_MSK | LED_GREEN_MSK | LED_BLUE_MSK;

/// Hall sensor input index.
pub const HALL_IN: u8 = 0;
/// Hall sensor input mask.
pub const HALL_IN_MSK: u32 = 1 << HALL_IN;
/// Every input on the board.
pub const ALL_BTNS_MSK: u32 = HALL_IN_MSK;

/// Button poll interval.
pub const BUTTON_SCAN_INTERVAL_MS: u32 = 10;

/// LED driver.
pub trait Leds {
    /// Drive the LEDs to exactly the given bitmask.
    fn set_leds(&mut self, leds: u32);

    /// Current LED bitmask.
    fn leds(&self) -> u32;

    /// Turn on `on_mask` and turn off `off_mask`.
    ///
    /// Where the masks overlap, `on_mask` wins.
    fn set_leds_state(&mut self, on_mask: u32, off_mask: u32) {
        let current = self.leds();
        let next = ((current & !off_mask) | on_mask) & ALL_LEDS_MSK;
        self.set_leds(next);
    }

    /// Set a single LED: non-zero `val` turns it on.
    fn set_led(&mut self, led: u8, val: u32) {
        let mask = 1u32 << led;
        if val != 0 {
            self.set_leds_state(mask, NO_LEDS_MSK);
        } else {
            self.set_leds_state(NO_LEDS_MSK, mask);
        }
    }

    fn set_led_on(&mut self, led: u8) {
        self.set_led(led, 1);
    }

    fn set_led_off(&mut self, led: u8) {
        self.set_led(led, 0);
    }
}

/// Raw digital input access.
pub trait Buttons {
    /// Bitmask of inputs currently active.
    fn read_raw(&mut self) -> u32;
}

/// Tracks input state between polls.
#[derive(Debug, Default)]
pub struct ButtonScanner {
    state: u32,
}

impl ButtonScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample the inputs.
    ///
    /// Returns `(state, has_changed)` when at least one input differs from
    /// the previous poll.
    pub fn poll<B: Buttons + ?Sized>(&mut self, buttons: &mut B) -> Option<(u32, u32)> {
        let state = buttons.read_raw() & ALL_BTNS_MSK;
        let has_changed = state ^ self.state;
        self.state = state;
        if has_changed != 0 {
            Some((state, has_changed))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Board {
        leds: u32,
        raw: u32,
    }

    impl Leds for Board {
        fn set_leds(&mut self, leds: u32) {
            self.leds = leds;
        }

        fn leds(&self) -> u32 {
            self.leds
        }
    }

    impl Buttons for Board {
        fn read_raw(&mut self) -> u32 {
            self.raw
        }
    }

    #[test]
    fn test_on_mask_wins_overlap() {
        let mut board = Board::default();
        board.set_leds_state(LED_RED_MSK | LED_BLUE_MSK, LED_BLUE_MSK | LED_GREEN_MSK);
        assert_eq!(board.leds, LED_RED_MSK | LED_BLUE_MSK);
    }

    #[test]
    fn test_single_led_helpers() {
        let mut board = Board::default();
        board.set_led_on(LED_GREEN);
        board.set_led(LED_BLUE, 1);
        board.set_led_off(LED_GREEN);
        assert_eq!(board.leds, LED_BLUE_MSK);
    }

    #[test]
    fn test_scanner_reports_edges_only() {
        let mut board = Board::default();
        let mut scanner = ButtonScanner::new();

        assert_eq!(scanner.poll(&mut board), None);
        board.raw = HALL_IN_MSK;
        assert_eq!(scanner.poll(&mut board), Some((HALL_IN_MSK, HALL_IN_MSK)));
        assert_eq!(scanner.poll(&mut board), None);
        board.raw = 0;
        assert_eq!(scanner.poll(&mut board), Some((0, HALL_IN_MSK)));
        assert_eq!(scanner.poll(&mut board), None);
    }
}
