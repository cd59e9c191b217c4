//! Display texts shown on the terminal LCD.
//!
//! The display has two lines of 16 characters; `\n` starts the second line.
//!
//! ```
//! use pinpad_keypad::messages::DisplayMessages;
//!
//! assert_eq!(DisplayMessages::greeting("alice"), "Hi alice!\nUnlocking...");
//! ```

use pinpad_core::DoorState;
use pinpad_core::constants::LCD_COLUMNS;

/// Columns of the greeting line taken by `"Hi "` and `"!"`.
const GREETING_FRAME: usize = 4;

/// Texts for every validation outcome.
pub struct DisplayMessages;

impl DisplayMessages {
    /// Shown with the first masked digit.
    pub const PIN_PROMPT: &'static str = "PIN: *";

    /// Emergency close accepted.
    pub const LOCKING: &'static str = "Locking door...";

    /// Any rejected PIN.
    pub const INVALID_PIN: &'static str = "Invalid PIN!";

    pub const DOOR_OPEN: &'static str = " \nOpen";

    pub const DOOR_CLOSED: &'static str = " \nClosed";

    /// Personalized greeting for an accepted PIN.
    ///
    /// Long handles are cut so the greeting stays on the first line.
    pub fn greeting(handle: &str) -> String {
        let end = handle
            .char_indices()
            .nth(LCD_COLUMNS - GREETING_FRAME)
            .map_or(handle.len(), |(i, _)| i);
        format!("Hi {}!\nUnlocking...", &handle[..end])
    }

    /// Idle screen for the given door state.
    pub fn door(state: DoorState) -> &'static str {
        match state {
            DoorState::Open => Self::DOOR_OPEN,
            DoorState::Closed => Self::DOOR_CLOSED,
        }
    }
}
