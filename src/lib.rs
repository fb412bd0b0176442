/*!
This crate provides scoped foreground colors for text consoles. A color
change is undone automatically when the value that made it goes out of
scope, and changes nest: leaving an inner scope brings back exactly the
colors of the outer one.

Colors are changed through the console's own attribute word, the way the
Windows console API works. Each change saves the word it replaces on a
stack and only touches the foreground bits, so the background survives.
On platforms without such a console every operation is a no-op.

# Organization

`ColorGuard` is the main type. Creating one applies a color and dropping it
restores whatever was there before.

`Tint` is a color value that is applied as a side effect of being inserted
into output, either through the `WriteColor` extension trait or by
formatting it with `{}`. Its changes are undone when it drops.

`Terminal` is the context both of them work through. It owns the
`ColorStack` of saved words and a `Console` implementation. The
process-wide `Terminal::global` uses `PlatformConsole`; `MemoryConsole` keeps
attributes in memory, which is useful for testing.

# Example: scoped colors

```rust,no_run
use colorguard::Color;

{
    let _warn = colorguard::with_color(Color::Yellow);
    println!("This is a yellow warning!");
    {
        let _err = colorguard::with_color(Color::Red);
        println!("This is red.");
    }
    println!("Yellow again.");
}
println!("Back to the original colors.");
```

# Example: an isolated terminal

```rust
use colorguard::{
    Attributes, Color, ColorChoice, MemoryConsole, Stream, Terminal,
};

let term = Terminal::new(MemoryConsole::new(Attributes::from_bits(0x07)))
    .with_choice(ColorChoice::Always);
{
    let _guard = term.guard(Color::Green);
    assert_eq!(term.console().current(Stream::Stdout).bits(), 0x0A);
}
assert_eq!(term.console().current(Stream::Stdout).bits(), 0x07);
```
*/

#![deny(missing_docs)]

mod console;
mod guard;
mod stack;
mod traits;
mod types;

pub use console::{Console, MemoryConsole, PlatformConsole, Stream};
pub use guard::{ColorGuard, Terminal, Tint};
pub use stack::ColorStack;
pub use traits::WriteColor;
pub use types::{
    Attributes, Color, ColorChoice, ColorChoiceParseError, FOREGROUND_BLUE,
    FOREGROUND_GREEN, FOREGROUND_INTENSITY, FOREGROUND_RED, ParseColorError,
};

/// Change the foreground of the process console to `color` until the
/// returned guard drops.
///
/// This uses [`Terminal::global`].
pub fn with_color(color: Color) -> ColorGuard<'static, PlatformConsole> {
    Terminal::global().guard(color)
}

/// Create a color value for the process console.
///
/// This uses [`Terminal::global`]. See [`Tint`] for when the color is
/// applied and undone.
pub fn tint(color: Color) -> Tint<'static, PlatformConsole> {
    Terminal::global().tint(color)
}
