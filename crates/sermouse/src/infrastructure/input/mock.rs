//! Scripted mouse source for tests.
//!
//! Replays a fixed list of polls without any input hardware.  Once the
//! script is exhausted every poll reports "nothing ready".
//!
//! Consecutive `Event` polls at the front of the script model what is
//! already buffered in the device; an `Empty` poll marks the point where the
//! buffer ran dry.  `discard_pending` drops exactly that buffered run.

use std::collections::VecDeque;

use sermouse_core::MouseEvent;

use crate::application::relay::{InputError, MouseEventSource};

/// One scripted answer to `next_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedPoll {
    /// An event is ready.
    Event(MouseEvent),
    /// Nothing is ready (would block).
    Empty,
    /// The device has gone away.
    Disconnected,
}

/// A [`MouseEventSource`] that replays [`ScriptedPoll`]s.
#[derive(Debug, Default)]
pub struct ScriptedMouseSource {
    script: VecDeque<ScriptedPoll>,
    /// Number of `next_event` calls so far.
    pub polls: usize,
    /// Events thrown away by `discard_pending`.
    pub discarded: usize,
    /// Set once `release` has been called.
    pub released: bool,
}

impl ScriptedMouseSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source that yields `events` back to back.
    pub fn with_events<T>(events: T) -> Self
    where
        T: IntoIterator<Item = MouseEvent>,
    {
        let mut source = Self::new();
        source.push_events(events);
        source
    }

    pub fn push(&mut self, poll: ScriptedPoll) {
        self.script.push_back(poll);
    }

    pub fn push_events<T>(&mut self, events: T)
    where
        T: IntoIterator<Item = MouseEvent>,
    {
        self.script.extend(events.into_iter().map(ScriptedPoll::Event));
    }

    /// Polls still queued.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl MouseEventSource for ScriptedMouseSource {
    fn next_event(&mut self) -> Result<Option<MouseEvent>, InputError> {
        self.polls += 1;
        match self.script.pop_front() {
            Some(ScriptedPoll::Event(event)) => Ok(Some(event)),
            Some(ScriptedPoll::Empty) | None => Ok(None),
            Some(ScriptedPoll::Disconnected) => Err(InputError::Read(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "mock device removed",
            ))),
        }
    }

    fn discard_pending(&mut self) -> Result<usize, InputError> {
        let mut dropped = 0;
        while let Some(ScriptedPoll::Event(_)) = self.script.front() {
            self.script.pop_front();
            dropped += 1;
        }
        self.discarded += dropped;
        Ok(dropped)
    }

    fn release(&mut self) -> Result<(), InputError> {
        self.released = true;
        Ok(())
    }
}
