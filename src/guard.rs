use std::cell::Cell;
use std::fmt;
use std::io::{self, Write};
use std::sync::OnceLock;

use crate::{Color, ColorChoice, ColorStack, Console, PlatformConsole, Stream};

/// The context every color change goes through.
///
/// A `Terminal` pairs a [`Console`] with the [`ColorStack`] that remembers
/// what to restore, plus the user's [`ColorChoice`]. Guards and tints borrow
/// the terminal they were created from, so the stack always outlives them.
///
/// Most programs use the process-wide [`Terminal::global`]. Tests, and
/// programs that change colors from more than one thread, should create
/// their own so that unrelated guards never share a stack.
#[derive(Debug)]
pub struct Terminal<C = PlatformConsole> {
    console: C,
    stack: ColorStack,
    choice: ColorChoice,
}

static GLOBAL: OnceLock<Terminal<PlatformConsole>> = OnceLock::new();

impl Terminal<PlatformConsole> {
    /// Return the process-wide terminal bound to the standard handles.
    ///
    /// It is created on first use with [`ColorChoice::Auto`] and lives until
    /// the process exits.
    pub fn global() -> &'static Terminal<PlatformConsole> {
        GLOBAL.get_or_init(|| Terminal::new(PlatformConsole::new()))
    }
}

impl<C: Console> Terminal<C> {
    /// Create a terminal over `console` with an empty stack and
    /// [`ColorChoice::Auto`].
    ///
    /// `Auto` reads `TERM` and `NO_COLOR` every time a guard binds, so the
    /// same code may change colors in one environment and do nothing in
    /// another. Use [`Terminal::with_choice`] to pin the behavior.
    pub fn new(console: C) -> Terminal<C> {
        Terminal {
            console,
            stack: ColorStack::new(),
            choice: ColorChoice::Auto,
        }
    }

    /// Set the color preference used when binding guards.
    pub fn with_choice(mut self, choice: ColorChoice) -> Terminal<C> {
        self.choice = choice;
        self
    }

    /// Return the color preference of this terminal.
    pub fn choice(&self) -> ColorChoice {
        self.choice
    }

    /// Return the underlying console.
    pub fn console(&self) -> &C {
        &self.console
    }

    /// Return the stack of saved attribute words.
    pub fn stack(&self) -> &ColorStack {
        &self.stack
    }

    /// Resolve which stream color changes should be applied to.
    ///
    /// Stdout is preferred. If it can't be queried, which usually means it
    /// is redirected, stderr is tried instead. `None` means neither works
    /// (or colors are disabled), and anything bound this way is a no-op.
    pub fn bind(&self) -> Option<Stream> {
        if !self.choice.should_attempt_color() {
            tracing::debug!(choice = ?self.choice, "colors disabled");
            return None;
        }
        for stream in [Stream::Stdout, Stream::Stderr] {
            match self.console.attributes(stream) {
                Ok(_) => {
                    tracing::debug!(?stream, "bound to console");
                    return Some(stream);
                }
                Err(err) => {
                    tracing::debug!(?stream, %err, "console not queryable");
                }
            }
        }
        None
    }

    /// Create a color value for `color` without applying it.
    ///
    /// The color is applied each time the tint is inserted into output via
    /// [`WriteColor::colorize`](crate::WriteColor::colorize) or formatted
    /// with `{}`, and every application is undone when the tint drops.
    pub fn tint(&self, color: Color) -> Tint<'_, C> {
        Tint::new(self, color)
    }

    /// Change the foreground to `color` until the returned guard drops.
    pub fn guard(&self, color: Color) -> ColorGuard<'_, C> {
        ColorGuard::new(self, color)
    }

    /// Run `f` with the foreground set to `color`.
    ///
    /// The previous colors are restored when `f` returns or unwinds.
    pub fn scoped<R>(
        &self,
        color: Color,
        f: impl FnOnce(&ColorGuard<'_, C>) -> R,
    ) -> R {
        let guard = self.guard(color);
        f(&guard)
    }
}

/// A foreground color bound to a terminal.
///
/// Creating a `Tint` resolves the output stream but leaves the console
/// alone. [`Tint::change_color`] saves the current attribute word and
/// applies the color while keeping the background. When the tint drops,
/// each saved word is restored, newest first.
///
/// Inserting a temporary tint into output colors only the remainder of the
/// statement, because temporaries drop at the end of it:
///
/// ```no_run
/// use std::io::{self, Write};
/// use colorguard::{Color, WriteColor};
///
/// # fn main() -> io::Result<()> {
/// let mut out = io::stdout();
/// out.colorize(&colorguard::tint(Color::Red))?.write_all(b"error\n")?;
/// // Back to the previous color here.
/// writeln!(out, "plain")?;
/// # Ok(()) }
/// ```
///
/// Text still sitting in a buffer when the tint drops is drawn with the
/// restored colors, so flush before then.
#[derive(Debug)]
pub struct Tint<'t, C: Console> {
    terminal: &'t Terminal<C>,
    color: Color,
    stream: Option<Stream>,
    applied: Cell<usize>,
}

impl<'t, C: Console> Tint<'t, C> {
    fn new(terminal: &'t Terminal<C>, color: Color) -> Tint<'t, C> {
        let stream = terminal.bind();
        Tint { terminal, color, stream, applied: Cell::new(0) }
    }

    /// Return the color this tint applies.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Return the stream this tint is bound to, if any.
    pub fn stream(&self) -> Option<Stream> {
        self.stream
    }

    /// Returns true if and only if this tint can change colors.
    pub fn is_bound(&self) -> bool {
        self.stream.is_some()
    }

    /// Save the current attribute word and switch the foreground to this
    /// tint's color.
    ///
    /// Does nothing when unbound or when the console can't be queried.
    pub fn change_color(&self) {
        let Some(stream) = self.stream else {
            return;
        };
        let console = self.terminal.console();
        let current = match console.attributes(stream) {
            Ok(attrs) => attrs,
            Err(err) => {
                tracing::debug!(?stream, %err, "skipping color change");
                return;
            }
        };
        self.terminal.stack().push(current);
        self.applied.set(self.applied.get() + 1);
        let next = current.with_foreground(self.color);
        if let Err(err) = console.set_attributes(stream, next) {
            tracing::warn!(
                ?stream, %next, %err,
                "failed to set console attributes"
            );
        }
    }
}

impl<'t, C: Console> Drop for Tint<'t, C> {
    fn drop(&mut self) {
        let Some(stream) = self.stream else {
            return;
        };
        for _ in 0..self.applied.get() {
            let Some(saved) = self.terminal.stack().pop() else {
                break;
            };
            if let Err(err) =
                self.terminal.console().set_attributes(stream, saved)
            {
                tracing::warn!(
                    ?stream, %saved, %err,
                    "failed to restore console attributes"
                );
            }
        }
    }
}

/// Formatting a tint writes nothing and applies its color.
impl<'t, C: Console> fmt::Display for Tint<'t, C> {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.change_color();
        Ok(())
    }
}

/// A scoped foreground color.
///
/// The color is applied when the guard is created and the previous attribute
/// word is restored when it drops, on every exit path. Guards must be dropped
/// in the reverse order of their creation, which ordinary lexical scoping
/// guarantees.
///
/// A guard bound to stdout flushes stdout when it drops, so text written
/// with `print!` and still buffered is drawn in the guard's color. Other
/// writers must be flushed before the guard drops, or their buffered text
/// shows up in the restored colors.
///
/// ```no_run
/// use colorguard::Color;
///
/// {
///     let _warn = colorguard::with_color(Color::Yellow);
///     println!("This is a yellow warning!");
///     println!("This is a second yellow warning!");
/// }
/// colorguard::with_color(Color::Yellow)
///     .print(format_args!("This will be yellow\n"))
///     .unwrap();
/// ```
#[derive(Debug)]
#[must_use = "the previous colors are restored as soon as the guard drops"]
pub struct ColorGuard<'t, C: Console> {
    tint: Tint<'t, C>,
}

impl<'t, C: Console> ColorGuard<'t, C> {
    fn new(terminal: &'t Terminal<C>, color: Color) -> ColorGuard<'t, C> {
        let tint = Tint::new(terminal, color);
        tint.change_color();
        ColorGuard { tint }
    }

    /// Return the color this guard applied.
    pub fn color(&self) -> Color {
        self.tint.color()
    }

    /// Return the stream this guard is bound to, if any.
    pub fn stream(&self) -> Option<Stream> {
        self.tint.stream()
    }

    /// Returns true if and only if this guard changed colors.
    pub fn is_bound(&self) -> bool {
        self.tint.is_bound()
    }

    /// Write formatted text to stdout and flush it.
    ///
    /// Returns the number of bytes written.
    pub fn print(&self, args: fmt::Arguments<'_>) -> io::Result<usize> {
        write_counted(io::stdout().lock(), args, false)
    }

    /// Like [`ColorGuard::print`], followed by a newline.
    pub fn println(&self, args: fmt::Arguments<'_>) -> io::Result<usize> {
        write_counted(io::stdout().lock(), args, true)
    }
}

impl<'t, C: Console> Drop for ColorGuard<'t, C> {
    fn drop(&mut self) {
        if self.stream() != Some(Stream::Stdout) {
            return;
        }
        if let Err(err) = io::stdout().flush() {
            tracing::debug!(%err, "failed to flush stdout before restoring");
        }
    }
}

fn write_counted<W: io::Write>(
    wtr: W,
    args: fmt::Arguments<'_>,
    newline: bool,
) -> io::Result<usize> {
    let mut wtr = CountingWriter { wtr, count: 0 };
    wtr.write_fmt(args)?;
    if newline {
        wtr.write_all(b"\n")?;
    }
    wtr.flush()?;
    Ok(wtr.count)
}

struct CountingWriter<W> {
    wtr: W,
    count: usize,
}

impl<W: io::Write> io::Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.wtr.write(buf)?;
        self.count += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attributes, MemoryConsole};
    use pretty_assertions::assert_eq;

    const BLUE_ON_GRAY: Attributes = Attributes::from_bits(0x71);

    fn terminal() -> Terminal<MemoryConsole> {
        Terminal::new(MemoryConsole::new(BLUE_ON_GRAY))
            .with_choice(ColorChoice::Always)
    }

    #[test]
    fn guard_applies_and_restores() {
        let term = terminal();
        {
            let guard = term.guard(Color::Red);
            assert!(guard.is_bound());
            assert_eq!(guard.stream(), Some(Stream::Stdout));
            assert_eq!(
                term.console().current(Stream::Stdout),
                Attributes::from_bits(0x7C)
            );
            assert_eq!(term.stack().len(), 1);
        }
        assert_eq!(term.console().current(Stream::Stdout), BLUE_ON_GRAY);
        assert!(term.stack().is_empty());
    }

    #[test]
    fn tint_waits_for_insertion() {
        let term = terminal();
        let tint = term.tint(Color::Green);
        assert!(tint.is_bound());
        assert!(term.stack().is_empty());
        assert_eq!(term.console().writes(Stream::Stdout), 0);
        drop(tint);
        assert!(term.stack().is_empty());
        assert_eq!(term.console().writes(Stream::Stdout), 0);
    }

    #[test]
    fn tint_restores_every_application() {
        let term = terminal();
        {
            let tint = term.tint(Color::Cyan);
            tint.change_color();
            tint.change_color();
            assert_eq!(term.stack().len(), 2);
        }
        assert!(term.stack().is_empty());
        assert_eq!(term.console().current(Stream::Stdout), BLUE_ON_GRAY);
    }

    #[test]
    fn tint_drop_after_underflow_restores_nothing() {
        let term = terminal();
        let tint = term.tint(Color::Red);
        tint.change_color();
        tint.change_color();
        assert_eq!(term.stack().len(), 2);
        while term.stack().pop().is_some() {}

        let red = BLUE_ON_GRAY.with_foreground(Color::Red);
        let writes = term.console().writes(Stream::Stdout);
        assert_eq!(term.console().current(Stream::Stdout), red);
        drop(tint);
        assert_eq!(term.console().current(Stream::Stdout), red);
        assert_eq!(term.console().writes(Stream::Stdout), writes);
        assert!(term.stack().is_empty());
    }

    #[test]
    fn stdout_guard_drop_flushes_then_restores() {
        let term = terminal();
        let guard = term.guard(Color::Green);
        assert_eq!(guard.stream(), Some(Stream::Stdout));
        drop(guard);
        assert_eq!(term.console().current(Stream::Stdout), BLUE_ON_GRAY);
        assert_eq!(term.console().writes(Stream::Stdout), 2);
        assert!(term.stack().is_empty());
    }

    #[test]
    fn display_applies_color() {
        let term = terminal();
        let tint = term.tint(Color::Magenta);
        assert_eq!(format!("{tint}"), "");
        assert_eq!(
            term.console().current(Stream::Stdout),
            BLUE_ON_GRAY.with_foreground(Color::Magenta)
        );
        drop(tint);
        assert_eq!(term.console().current(Stream::Stdout), BLUE_ON_GRAY);
    }

    #[test]
    fn falls_back_to_stderr() {
        let term = terminal();
        term.console().redirect(Stream::Stdout);
        {
            let guard = term.guard(Color::Yellow);
            assert_eq!(guard.stream(), Some(Stream::Stderr));
            assert_eq!(
                term.console().current(Stream::Stderr),
                BLUE_ON_GRAY.with_foreground(Color::Yellow)
            );
        }
        assert_eq!(term.console().current(Stream::Stderr), BLUE_ON_GRAY);
    }

    #[test]
    fn new_terminal_defaults_to_auto() {
        let term = Terminal::new(MemoryConsole::default());
        assert_eq!(term.choice(), ColorChoice::Auto);
        assert_eq!(terminal().choice(), ColorChoice::Always);
    }

    #[test]
    fn never_choice_is_a_no_op() {
        let term = Terminal::new(MemoryConsole::new(BLUE_ON_GRAY))
            .with_choice(ColorChoice::Never);
        let guard = term.guard(Color::Red);
        assert!(!guard.is_bound());
        assert!(term.stack().is_empty());
        drop(guard);
        assert_eq!(term.console().writes(Stream::Stdout), 0);
    }

    #[test]
    fn scoped_restores_on_return() {
        let term = terminal();
        let color = term.scoped(Color::White, |guard| {
            assert_eq!(term.stack().len(), 1);
            guard.color()
        });
        assert_eq!(color, Color::White);
        assert!(term.stack().is_empty());
        assert_eq!(term.console().current(Stream::Stdout), BLUE_ON_GRAY);
    }

    #[test]
    fn counted_write() {
        let mut buf: Vec<u8> = vec![];
        let n = write_counted(&mut buf, format_args!("{}-{}", 1, 22), true)
            .unwrap();
        assert_eq!(n, 5);
        assert_eq!(buf, b"1-22\n");
    }
}
