use std::env;
use std::ffi::OsStr;
use std::fmt;
use std::str::FromStr;

/// Console attribute bit for a blue foreground.
pub const FOREGROUND_BLUE: u16 = 0x0001;
/// Console attribute bit for a green foreground.
pub const FOREGROUND_GREEN: u16 = 0x0002;
/// Console attribute bit for a red foreground.
pub const FOREGROUND_RED: u16 = 0x0004;
/// Console attribute bit for a bright foreground.
pub const FOREGROUND_INTENSITY: u16 = 0x0008;

/// ColorChoice represents the color preferences of an end user.
///
/// The `Default` implementation for this type will select `Auto`, which tries
/// to do the right thing based on the current environment.
///
/// The `FromStr` implementation for this type converts a lowercase string of
/// the variant name to the corresponding variant. Any other string results in
/// an error.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ColorChoice {
    /// Always change colors when a console can be bound.
    Always,
    /// Change colors unless the environment says otherwise, e.g., when
    /// `TERM=dumb` or `NO_COLOR` is defined.
    Auto,
    /// Never change colors. Every guard is a no-op.
    Never,
}

/// The default is `Auto`.
impl Default for ColorChoice {
    fn default() -> ColorChoice {
        ColorChoice::Auto
    }
}

impl FromStr for ColorChoice {
    type Err = ColorChoiceParseError;

    fn from_str(s: &str) -> Result<ColorChoice, ColorChoiceParseError> {
        match s.to_lowercase().as_str() {
            "always" => Ok(ColorChoice::Always),
            "auto" => Ok(ColorChoice::Auto),
            "never" => Ok(ColorChoice::Never),
            unknown => Err(ColorChoiceParseError {
                unknown_choice: unknown.to_string(),
            }),
        }
    }
}

impl ColorChoice {
    /// Returns true if we should attempt to change console colors.
    pub(crate) fn should_attempt_color(&self) -> bool {
        match *self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => self.env_allows_color(),
        }
    }

    fn env_allows_color(&self) -> bool {
        env_allows(
            env::var_os("TERM").as_deref(),
            env::var_os("NO_COLOR").is_some(),
            cfg!(windows),
        )
    }
}

/// Decides whether `Auto` permits colors given the value of `TERM`, whether
/// `NO_COLOR` is set, and whether we're on Windows.
fn env_allows(term: Option<&OsStr>, no_color: bool, windows: bool) -> bool {
    match term {
        // If TERM isn't set outside of Windows, then we are in a weird
        // environment that probably doesn't support colors. A Windows console
        // usually has no TERM at all.
        None => {
            if !windows {
                return false;
            }
        }
        Some(k) => {
            if k == OsStr::new("dumb") {
                return false;
            }
        }
    }
    !no_color
}

/// An error that occurs when parsing a `ColorChoice` fails.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error(
    "unrecognized color choice '{unknown_choice}': valid choices are: \
     always, auto, never"
)]
pub struct ColorChoiceParseError {
    unknown_choice: String,
}

impl ColorChoiceParseError {
    /// Return the string that couldn't be parsed as a valid color choice.
    pub fn invalid_choice(&self) -> &str {
        &self.unknown_choice
    }
}

/// The closed set of foreground colors a guard can apply.
///
/// Every color maps to a fixed console attribute pattern made of the three
/// primary foreground bits plus the intensity bit. `gray` and `dark_gray`
/// also go by their British spellings through [`Color::GREY`] and
/// [`Color::DARK_GREY`].
///
/// This type has a `FromStr` impl that matches color names case
/// insensitively, with either `_` or `-` as the word separator.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Color {
    Red,
    Yellow,
    Green,
    Cyan,
    Blue,
    Magenta,
    White,
    Gray,
    DarkGray,
}

impl Color {
    /// Synonym for [`Color::Gray`].
    pub const GREY: Color = Color::Gray;
    /// Synonym for [`Color::DarkGray`].
    pub const DARK_GREY: Color = Color::DarkGray;

    /// Every distinct color, in declaration order.
    pub const ALL: [Color; 9] = [
        Color::Red,
        Color::Yellow,
        Color::Green,
        Color::Cyan,
        Color::Blue,
        Color::Magenta,
        Color::White,
        Color::Gray,
        Color::DarkGray,
    ];

    /// Returns the foreground attribute bits for this color.
    ///
    /// The result never has any bit outside of
    /// [`Attributes::FOREGROUND_MASK`] set.
    pub const fn attributes(self) -> u16 {
        match self {
            Color::Red => FOREGROUND_RED | FOREGROUND_INTENSITY,
            Color::Yellow => {
                FOREGROUND_RED | FOREGROUND_GREEN | FOREGROUND_INTENSITY
            }
            Color::Green => FOREGROUND_GREEN | FOREGROUND_INTENSITY,
            Color::Cyan => {
                FOREGROUND_GREEN | FOREGROUND_BLUE | FOREGROUND_INTENSITY
            }
            Color::Blue => FOREGROUND_BLUE | FOREGROUND_INTENSITY,
            Color::Magenta => {
                FOREGROUND_BLUE | FOREGROUND_RED | FOREGROUND_INTENSITY
            }
            Color::White => {
                FOREGROUND_RED
                    | FOREGROUND_GREEN
                    | FOREGROUND_BLUE
                    | FOREGROUND_INTENSITY
            }
            Color::Gray => FOREGROUND_RED | FOREGROUND_GREEN | FOREGROUND_BLUE,
            Color::DarkGray => FOREGROUND_INTENSITY,
        }
    }

    /// Returns the canonical lowercase name of this color.
    pub const fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Cyan => "cyan",
            Color::Blue => "blue",
            Color::Magenta => "magenta",
            Color::White => "white",
            Color::Gray => "gray",
            Color::DarkGray => "dark_gray",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Color, ParseColorError> {
        match &*s.to_lowercase().replace('-', "_") {
            "red" => Ok(Color::Red),
            "yellow" => Ok(Color::Yellow),
            "green" => Ok(Color::Green),
            "cyan" => Ok(Color::Cyan),
            "blue" => Ok(Color::Blue),
            "magenta" => Ok(Color::Magenta),
            "white" => Ok(Color::White),
            "gray" | "grey" => Ok(Color::Gray),
            "dark_gray" | "dark_grey" | "darkgray" | "darkgrey" => {
                Ok(Color::DarkGray)
            }
            _ => Err(ParseColorError { given: s.to_string() }),
        }
    }
}

/// An error from parsing an unknown color name.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error(
    "unrecognized color name '{given}'. Choose from: \
     red, yellow, green, cyan, blue, magenta, white, gray, dark_gray"
)]
pub struct ParseColorError {
    given: String,
}

impl ParseColorError {
    /// Return the string that couldn't be parsed as a valid color.
    pub fn invalid(&self) -> &str {
        &self.given
    }
}

/// A console attribute word.
///
/// This is a snapshot of everything the console knows about how the next
/// character cell is drawn. The low nibble holds the foreground bits, the
/// next nibble the background bits. Saved words are never interpreted, only
/// replayed.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Attributes(u16);

impl Attributes {
    /// Bits controlling the text color and its intensity.
    pub const FOREGROUND_MASK: u16 = 0x000F;
    /// Bits controlling the color behind the text.
    pub const BACKGROUND_MASK: u16 = 0x00F0;

    /// Wrap a raw attribute word.
    pub const fn from_bits(bits: u16) -> Attributes {
        Attributes(bits)
    }

    /// Return the raw attribute word.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Return only the foreground bits of this word.
    pub const fn foreground(self) -> u16 {
        self.0 & Attributes::FOREGROUND_MASK
    }

    /// Return only the background bits of this word.
    pub const fn background(self) -> u16 {
        self.0 & Attributes::BACKGROUND_MASK
    }

    /// Replace the foreground of this word with `color`, keeping the
    /// background.
    ///
    /// Bits above the low byte are cleared, matching how the console
    /// composes a new text attribute.
    pub const fn with_foreground(self, color: Color) -> Attributes {
        Attributes(
            (color.attributes() & Attributes::FOREGROUND_MASK)
                | self.background(),
        )
    }
}

impl From<u16> for Attributes {
    fn from(bits: u16) -> Attributes {
        Attributes(bits)
    }
}

impl From<Attributes> for u16 {
    fn from(attrs: Attributes) -> u16 {
        attrs.0
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn synonyms_share_bits() {
        assert_eq!(Color::GREY.attributes(), Color::Gray.attributes());
        assert_eq!(
            Color::DARK_GREY.attributes(),
            Color::DarkGray.attributes()
        );
        assert_eq!("grey".parse::<Color>().unwrap(), Color::Gray);
        assert_eq!("dark_grey".parse::<Color>().unwrap(), Color::DarkGray);
        assert_eq!("Dark-Gray".parse::<Color>().unwrap(), Color::DarkGray);
    }

    #[test]
    fn registry_bits() {
        assert_eq!(Color::Red.attributes(), 0x0C);
        assert_eq!(Color::Yellow.attributes(), 0x0E);
        assert_eq!(Color::Green.attributes(), 0x0A);
        assert_eq!(Color::Cyan.attributes(), 0x0B);
        assert_eq!(Color::Blue.attributes(), 0x09);
        assert_eq!(Color::Magenta.attributes(), 0x0D);
        assert_eq!(Color::White.attributes(), 0x0F);
        assert_eq!(Color::Gray.attributes(), 0x07);
        assert_eq!(Color::DarkGray.attributes(), 0x08);
    }

    #[test]
    fn colors_never_touch_background() {
        for color in Color::ALL {
            assert_eq!(color.attributes() & !Attributes::FOREGROUND_MASK, 0);
        }
    }

    #[test]
    fn with_foreground_keeps_background() {
        for bg in 0..16u16 {
            let current = Attributes::from_bits((bg << 4) | 0x07);
            for color in Color::ALL {
                let next = current.with_foreground(color);
                assert_eq!(next.bits(), color.attributes() | (bg << 4));
                assert_eq!(next.background(), current.background());
            }
        }
    }

    #[test]
    fn with_foreground_drops_high_bits() {
        let current = Attributes::from_bits(0x8017);
        assert_eq!(current.with_foreground(Color::Red).bits(), 0x001C);
    }

    #[test]
    fn names_round_trip() {
        for color in Color::ALL {
            assert_eq!(color.to_string().parse::<Color>().unwrap(), color);
        }
    }

    #[test]
    fn unknown_color() {
        let err = "black".parse::<Color>().unwrap_err();
        assert_eq!(err.invalid(), "black");
        assert!(err.to_string().contains("'black'"));
    }

    #[test]
    fn parse_choice() {
        let parse = |s: &str| s.parse::<ColorChoice>().unwrap();
        assert_eq!(parse("ALWAYS"), ColorChoice::Always);
        assert_eq!(parse("auto"), ColorChoice::Auto);
        assert_eq!(parse("never"), ColorChoice::Never);
        let err = "sometimes".parse::<ColorChoice>().unwrap_err();
        assert_eq!(err.invalid_choice(), "sometimes");
        assert_eq!(ColorChoice::default(), ColorChoice::Auto);
    }

    #[test]
    fn fixed_choices() {
        assert!(ColorChoice::Always.should_attempt_color());
        assert!(!ColorChoice::Never.should_attempt_color());
    }

    #[test]
    fn auto_without_term() {
        assert!(!env_allows(None, false, false));
        assert!(env_allows(None, false, true));
        assert!(!env_allows(None, true, true));
    }

    #[test]
    fn auto_with_dumb_term() {
        let dumb = Some(OsStr::new("dumb"));
        assert!(!env_allows(dumb, false, false));
        assert!(!env_allows(dumb, false, true));
    }

    #[test]
    fn auto_with_no_color() {
        let xterm = Some(OsStr::new("xterm-256color"));
        assert!(env_allows(xterm, false, false));
        assert!(env_allows(xterm, false, true));
        assert!(!env_allows(xterm, true, false));
        assert!(!env_allows(xterm, true, true));
    }
}
