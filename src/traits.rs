use std::io;

use crate::{Color, ColorGuard, Console, Terminal, Tint};

/// This trait lets any writer change console colors in the middle of
/// output.
///
/// Both methods flush the writer first, so text written before the call is
/// drawn with the colors that were in effect when it was written.
///
/// This trait is implemented for every `io::Write`.
pub trait WriteColor: io::Write {
    /// Apply `tint` to the console and return the writer for chaining.
    ///
    /// Restoring the previous colors is left to `tint`, which undoes its
    /// changes when it drops. For a temporary that is the end of the
    /// current statement.
    ///
    /// If flushing fails, the error is returned and colors are unchanged.
    fn colorize<C: Console>(
        &mut self,
        tint: &Tint<'_, C>,
    ) -> io::Result<&mut Self> {
        self.flush()?;
        tint.change_color();
        Ok(self)
    }

    /// Change the foreground to `color` until the returned guard drops.
    ///
    /// If flushing fails, the error is returned and colors are unchanged.
    fn colorize_scoped<'t, C: Console>(
        &mut self,
        terminal: &'t Terminal<C>,
        color: Color,
    ) -> io::Result<ColorGuard<'t, C>> {
        self.flush()?;
        Ok(terminal.guard(color))
    }
}

impl<W: ?Sized + io::Write> WriteColor for W {}
