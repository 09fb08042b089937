//! Character set translation
//!
//! Tracks the G0-G3 designation slots and the GL/GR pointers, and maps
//! glyphs of DEC Special Graphics and the national replacement sets before
//! they reach the buffer. Input is already decoded text, so only GL is
//! applied; GR designations are recorded but have no effect.

use super::command::{Designation, Invoke};

/// US ASCII
pub const ASCII: char = 'B';
/// DEC Special Graphics (line drawing)
pub const DEC_SPECIAL_GRAPHICS: char = '0';
/// DEC Supplemental
pub const DEC_SUPPLEMENTAL: char = '<';
pub const UK: char = 'A';
pub const GERMAN: char = 'K';
pub const FRENCH: char = 'R';

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharsetState {
    pub slots: [char; 4],
    pub gl_slot: usize,
    pub gr_slot: usize,
    /// Slot used for the next character only
    pub single_shift: Option<usize>,
}

impl Default for CharsetState {
    fn default() -> Self {
        Self {
            slots: [ASCII, ASCII, DEC_SUPPLEMENTAL, DEC_SPECIAL_GRAPHICS],
            gl_slot: 0,
            gr_slot: 2,
            single_shift: None,
        }
    }
}

impl CharsetState {
    pub fn gl(&self) -> char {
        self.slots[self.gl_slot]
    }

    pub fn designate(&mut self, slot: usize, charset: char) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = charset;
        } else {
            tracing::debug!("Ignoring designation to slot {}", slot);
        }
    }

    pub fn invoke(&mut self, gl: Option<usize>, gr: Option<usize>, shift: Option<usize>) {
        let slot_count = self.slots.len();
        let valid = move |slot: usize| slot < slot_count;
        if let Some(slot) = shift.filter(|slot| valid(*slot)) {
            self.single_shift = Some(slot);
            return;
        }
        if let Some(slot) = gl.filter(|slot| valid(*slot)) {
            self.gl_slot = slot;
        }
        if let Some(slot) = gr.filter(|slot| valid(*slot)) {
            self.gr_slot = slot;
        }
    }

    pub fn update(&mut self, designation: Option<Designation>, invoke: Option<Invoke>) {
        if let Some(designation) = designation {
            self.designate(designation.slot, designation.charset);
        }
        if let Some(invoke) = invoke {
            self.invoke(invoke.gl, invoke.gr, invoke.shift);
        }
    }

    /// Map `text` through the active tables.
    ///
    /// A pending single shift applies to the first character only and is
    /// consumed; everything else goes through GL.
    pub fn translate(&mut self, text: &str) -> String {
        let mut chars = text.chars();
        let mut out = String::with_capacity(text.len());
        if let Some(slot) = self.single_shift {
            if let Some(first) = chars.next() {
                out.push(translate_char(self.slots[slot], first));
                self.single_shift = None;
            }
        }
        let gl = self.gl();
        out.extend(chars.map(|ch| translate_char(gl, ch)));
        out
    }
}

/// Translate one character through the table for `charset`.
pub fn translate_char(charset: char, ch: char) -> char {
    match charset {
        DEC_SPECIAL_GRAPHICS => dec_special_graphics(ch),
        UK => match ch {
            '#' => '£',
            other => other,
        },
        GERMAN => match ch {
            '@' => '§',
            '[' => 'Ä',
            '\\' => 'Ö',
            ']' => 'Ü',
            '{' => 'ä',
            '|' => 'ö',
            '}' => 'ü',
            '~' => 'ß',
            other => other,
        },
        FRENCH => match ch {
            '#' => '£',
            '@' => 'à',
            '[' => '°',
            '\\' => 'ç',
            ']' => '§',
            '{' => 'é',
            '|' => 'ù',
            '}' => 'è',
            '~' => '¨',
            other => other,
        },
        _ => ch,
    }
}

fn dec_special_graphics(ch: char) -> char {
    match ch {
        '_' => ' ',
        '`' => '◆',
        'a' => '▒',
        'b' => '␉',
        'c' => '␌',
        'd' => '␍',
        'e' => '␊',
        'f' => '°',
        'g' => '±',
        'h' => '␤',
        'i' => '␋',
        'j' => '┘',
        'k' => '┐',
        'l' => '┌',
        'm' => '└',
        'n' => '┼',
        'o' => '⎺',
        'p' => '⎻',
        'q' => '─',
        'r' => '⎼',
        's' => '⎽',
        't' => '├',
        'u' => '┤',
        'v' => '┴',
        'w' => '┬',
        'x' => '│',
        'y' => '≤',
        'z' => '≥',
        '{' => 'π',
        '|' => '≠',
        '}' => '£',
        '~' => '·',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        let mut state = CharsetState::default();
        assert_eq!(state.translate("lqqk"), "lqqk");
    }

    #[test]
    fn test_line_drawing_in_gl() {
        let mut state = CharsetState::default();
        state.designate(0, DEC_SPECIAL_GRAPHICS);
        assert_eq!(state.translate("lqqk"), "┌──┐");
        assert_eq!(state.translate("x x"), "│ │");
    }

    #[test]
    fn test_single_shift_applies_once() {
        let mut state = CharsetState::default();
        state.invoke(None, None, Some(3));
        assert_eq!(state.translate("qq"), "─q");
        assert_eq!(state.single_shift, None);
        assert_eq!(state.translate("q"), "q");
    }

    #[test]
    fn test_locking_shift_to_g1() {
        let mut state = CharsetState::default();
        state.designate(1, UK);
        state.invoke(Some(1), None, None);
        assert_eq!(state.translate("#1"), "£1");
        state.invoke(Some(0), None, None);
        assert_eq!(state.translate("#1"), "#1");
    }

    #[test]
    fn test_invalid_slot_ignored() {
        let mut state = CharsetState::default();
        state.designate(7, UK);
        state.invoke(Some(9), None, None);
        assert_eq!(state, CharsetState::default());
    }
}
