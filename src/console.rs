use std::io;
use std::sync::{Mutex, MutexGuard};

#[cfg(windows)]
use winapi_util::console as wincon;

use crate::Attributes;

/// The standard output devices a color change can be bound to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Stream {
    /// Primary output.
    Stdout,
    /// Error output, used when stdout can't be queried (e.g., redirected).
    Stderr,
}

/// The host console's attribute query and set primitives.
///
/// Implementations resolve the device for `stream` on every call and never
/// own or close it.
pub trait Console {
    /// Query the full attribute word currently in effect for `stream`.
    ///
    /// An error means the stream is not attached to a console that can be
    /// queried, e.g., because it was redirected to a file.
    fn attributes(&self, stream: Stream) -> io::Result<Attributes>;

    /// Replace the attribute word in effect for `stream`.
    fn set_attributes(
        &self,
        stream: Stream,
        attrs: Attributes,
    ) -> io::Result<()>;
}

impl<C: ?Sized + Console> Console for &C {
    fn attributes(&self, stream: Stream) -> io::Result<Attributes> {
        (**self).attributes(stream)
    }
    fn set_attributes(
        &self,
        stream: Stream,
        attrs: Attributes,
    ) -> io::Result<()> {
        (**self).set_attributes(stream, attrs)
    }
}

/// The console attached to this process's standard handles.
///
/// On Windows this reads and writes the text attributes of the console
/// screen buffer behind stdout or stderr. Other platforms have no queryable
/// attribute word, so every call fails and colors are never changed.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlatformConsole;

impl PlatformConsole {
    /// Create a handle to the process console.
    pub fn new() -> PlatformConsole {
        PlatformConsole
    }
}

#[cfg(windows)]
impl Console for PlatformConsole {
    fn attributes(&self, stream: Stream) -> io::Result<Attributes> {
        let info = match stream {
            Stream::Stdout => wincon::screen_buffer_info(io::stdout())?,
            Stream::Stderr => wincon::screen_buffer_info(io::stderr())?,
        };
        Ok(Attributes::from_bits(info.attributes()))
    }

    fn set_attributes(
        &self,
        stream: Stream,
        attrs: Attributes,
    ) -> io::Result<()> {
        match stream {
            Stream::Stdout => {
                wincon::set_text_attributes(io::stdout(), attrs.bits())
            }
            Stream::Stderr => {
                wincon::set_text_attributes(io::stderr(), attrs.bits())
            }
        }
    }
}

#[cfg(not(windows))]
impl Console for PlatformConsole {
    fn attributes(&self, _: Stream) -> io::Result<Attributes> {
        Err(unsupported())
    }

    fn set_attributes(&self, _: Stream, _: Attributes) -> io::Result<()> {
        Err(unsupported())
    }
}

#[cfg(not(windows))]
fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "console text attributes are only available on Windows",
    )
}

/// An in-memory console.
///
/// `MemoryConsole` keeps one attribute word per stream and lets callers
/// inspect it, which makes color changes observable without a real console.
/// A stream can be marked as redirected, after which querying it fails just
/// like a real redirected handle would.
#[derive(Debug)]
pub struct MemoryConsole {
    state: Mutex<MemoryState>,
}

#[derive(Debug)]
struct MemoryState {
    stdout: MemoryStream,
    stderr: MemoryStream,
}

#[derive(Clone, Copy, Debug)]
struct MemoryStream {
    attrs: Attributes,
    redirected: bool,
    writes: usize,
}

impl MemoryStream {
    fn new(attrs: Attributes) -> MemoryStream {
        MemoryStream { attrs, redirected: false, writes: 0 }
    }
}

impl MemoryState {
    fn stream(&self, stream: Stream) -> &MemoryStream {
        match stream {
            Stream::Stdout => &self.stdout,
            Stream::Stderr => &self.stderr,
        }
    }

    fn stream_mut(&mut self, stream: Stream) -> &mut MemoryStream {
        match stream {
            Stream::Stdout => &mut self.stdout,
            Stream::Stderr => &mut self.stderr,
        }
    }
}

impl MemoryConsole {
    /// Create a console whose streams both start with `attrs`.
    pub fn new(attrs: Attributes) -> MemoryConsole {
        MemoryConsole {
            state: Mutex::new(MemoryState {
                stdout: MemoryStream::new(attrs),
                stderr: MemoryStream::new(attrs),
            }),
        }
    }

    /// Mark `stream` as redirected. Queries and updates on it fail from now
    /// on.
    pub fn redirect(&self, stream: Stream) {
        self.lock().stream_mut(stream).redirected = true;
    }

    /// Return the attribute word currently set on `stream`, regardless of
    /// whether it is redirected.
    pub fn current(&self, stream: Stream) -> Attributes {
        self.lock().stream(stream).attrs
    }

    /// Return how many times the attribute word of `stream` was set.
    pub fn writes(&self, stream: Stream) -> usize {
        self.lock().stream(stream).writes
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryConsole {
    /// Light gray on black, the usual console default.
    fn default() -> MemoryConsole {
        MemoryConsole::new(Attributes::from_bits(0x07))
    }
}

impl Console for MemoryConsole {
    fn attributes(&self, stream: Stream) -> io::Result<Attributes> {
        let state = self.lock();
        let s = state.stream(stream);
        if s.redirected {
            return Err(redirected(stream));
        }
        Ok(s.attrs)
    }

    fn set_attributes(
        &self,
        stream: Stream,
        attrs: Attributes,
    ) -> io::Result<()> {
        let mut state = self.lock();
        let s = state.stream_mut(stream);
        if s.redirected {
            return Err(redirected(stream));
        }
        s.attrs = attrs;
        s.writes += 1;
        Ok(())
    }
}

fn redirected(stream: Stream) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{stream:?} is not attached to a console"),
    )
}
