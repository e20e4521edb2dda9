//! The host callback surface: the only contact point between the VM and
//! rendering/audio/windowing, all of which live outside this crate.

use crate::runtime::selection::Selection;

pub trait HostCallbacks {
    /// Display up to 6 lines of pre-wrapped text, newline-separated.
    fn set_text(&mut self, text: &str);

    /// Display the named image (empty string hides).
    fn set_image(&mut self, name: &str);

    /// Switch music; empty name stops music.
    fn set_music(&mut self, name: &str, track: i32);

    /// Show selection UI; empty slice hides it.
    fn set_selections(&mut self, selections: &[Selection]);

    /// Terminate the program cleanly with the message.
    fn fatal_error(&mut self, message: &str);
}
