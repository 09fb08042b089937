//! Text styles
//!
//! Colors, attribute flags and the additive `Style` produced by SGR decoding.

use bitflags::bitflags;

/// Color definition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// The renderer's default foreground or background
    #[default]
    Default,
    /// Entry in the 256 color ANSI palette
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    /// Resolve to an RGB triple, or `None` for the default color.
    pub fn to_rgb(&self) -> Option<(u8, u8, u8)> {
        match self {
            Color::Default => None,
            Color::Indexed(n) => Some(ANSI_PALETTE[*n as usize]),
            Color::Rgb(r, g, b) => Some((*r, *g, *b)),
        }
    }

    /// Convert to crossterm color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        match self {
            Color::Default => crossterm::style::Color::Reset,
            Color::Indexed(n) => crossterm::style::Color::AnsiValue(*n),
            Color::Rgb(r, g, b) => crossterm::style::Color::Rgb {
                r: *r,
                g: *g,
                b: *b,
            },
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AttrFlags: u16 {
        const BOLD             = 0b0000_0000_0001;
        const DIM              = 0b0000_0000_0010;
        const ITALIC           = 0b0000_0000_0100;
        const UNDERLINE        = 0b0000_0000_1000;
        const BLINK            = 0b0000_0001_0000;
        const INVERSE          = 0b0000_0010_0000;
        const HIDDEN           = 0b0000_0100_0000;
        const STRIKETHROUGH    = 0b0000_1000_0000;
        const DOUBLE_UNDERLINE = 0b0001_0000_0000;
    }
}

/// A text style.
///
/// Styles are additive: `combine` layers one style over another, so an
/// SGR sequence that only sets a foreground keeps the existing attributes.
/// `cleared` records attributes that were explicitly switched off, which
/// lets an SGR like `22` remove bold from the style it is combined with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Style {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub attrs: AttrFlags,
    pub cleared: AttrFlags,
    /// Hyperlink target (OSC 8)
    pub link: Option<String>,
}

impl Style {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Layer `other` on top of this style.
    pub fn combine(&self, other: &Style) -> Style {
        Style {
            foreground: other.foreground.or(self.foreground),
            background: other.background.or(self.background),
            attrs: (self.attrs - other.cleared) | other.attrs,
            cleared: (self.cleared - other.attrs) | other.cleared,
            link: other.link.clone().or_else(|| self.link.clone()),
        }
    }

    pub fn set(&mut self, flags: AttrFlags) {
        self.attrs |= flags;
        self.cleared -= flags;
    }

    pub fn unset(&mut self, flags: AttrFlags) {
        self.attrs -= flags;
        self.cleared |= flags;
    }

    pub fn has(&self, flags: AttrFlags) -> bool {
        self.attrs.contains(flags)
    }

    /// Copy of this style with the hyperlink replaced.
    pub fn with_link(&self, link: Option<String>) -> Style {
        Style {
            link,
            ..self.clone()
        }
    }
}

/// The 256 color xterm palette: 16 system colors, a 6x6x6 cube and a
/// 24 step gray ramp.
pub static ANSI_PALETTE: [(u8, u8, u8); 256] = build_palette();

const SYSTEM_COLORS: [(u8, u8, u8); 16] = [
    (0, 0, 0),
    (128, 0, 0),
    (0, 128, 0),
    (128, 128, 0),
    (0, 0, 128),
    (128, 0, 128),
    (0, 128, 128),
    (192, 192, 192),
    (128, 128, 128),
    (255, 0, 0),
    (0, 255, 0),
    (255, 255, 0),
    (0, 0, 255),
    (255, 0, 255),
    (0, 255, 255),
    (255, 255, 255),
];

const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

const fn build_palette() -> [(u8, u8, u8); 256] {
    let mut palette = [(0u8, 0u8, 0u8); 256];
    let mut index = 0;
    while index < 16 {
        palette[index] = SYSTEM_COLORS[index];
        index += 1;
    }
    while index < 232 {
        let cube = index - 16;
        palette[index] = (
            CUBE_LEVELS[cube / 36],
            CUBE_LEVELS[(cube / 6) % 6],
            CUBE_LEVELS[cube % 6],
        );
        index += 1;
    }
    while index < 256 {
        let level = (8 + (index - 232) * 10) as u8;
        palette[index] = (level, level, level);
        index += 1;
    }
    palette
}
