use std::sync::{Mutex, MutexGuard};

use crate::Attributes;

/// A last-in-first-out stack of saved console attribute words.
///
/// Every color change pushes the word it is about to overwrite, and every
/// restore pops the most recent one and replays it verbatim. One stack is
/// shared by all guards and tints of a [`Terminal`](crate::Terminal).
///
/// The internal lock only keeps the stack itself consistent. Guards on
/// different threads that share a stack still interleave their pushes and
/// pops, which restores the wrong words. Give each thread its own
/// `Terminal` if more than one thread changes colors.
#[derive(Debug, Default)]
pub struct ColorStack {
    words: Mutex<Vec<Attributes>>,
}

impl ColorStack {
    /// Create a new empty stack.
    pub const fn new() -> ColorStack {
        ColorStack { words: Mutex::new(Vec::new()) }
    }

    /// Save `attrs` on top of the stack.
    pub fn push(&self, attrs: Attributes) {
        let mut words = self.lock();
        words.push(attrs);
        tracing::trace!(
            %attrs,
            depth = words.len(),
            "saved console attributes"
        );
    }

    /// Remove and return the most recently saved word.
    ///
    /// Returns `None` if the stack is empty. That only happens when pushes
    /// and pops are not balanced, which is a bug in the caller.
    pub fn pop(&self) -> Option<Attributes> {
        let mut words = self.lock();
        let attrs = words.pop();
        match attrs {
            Some(attrs) => tracing::trace!(
                %attrs,
                depth = words.len(),
                "popped console attributes"
            ),
            None => tracing::warn!("color stack underflow"),
        }
        attrs
    }

    /// Return the most recently saved word without removing it.
    pub fn peek(&self) -> Option<Attributes> {
        self.lock().last().copied()
    }

    /// Return the number of saved words.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if and only if no words are saved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock can't leave a `Vec<Attributes>` in a
    // torn state, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Vec<Attributes>> {
        self.words.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
