//! Single-slot holder for the most recent input event.

use std::sync::mpsc::{self, Receiver, Sender};

use log::debug;

use crate::error::{BrowseError, Result};

/// An input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Event {
    #[default]
    None,
    Keyboard(char),
    /// Pixel position on the full grid image.
    Mouse { x: u32, y: u32 },
}

impl Event {
    /// Raw tag of keyboard events; the payload is the character code.
    pub const KEYBOARD: u32 = 1;
    /// Raw tag of mouse events; the payload is `y * 65536 + x`.
    pub const MOUSE: u32 = 2;

    /// Decode a host event. Unknown tags and invalid character codes
    /// decode to [`Event::None`].
    pub fn from_raw(tag: u32, payload: u32) -> Self {
        match tag {
            Self::KEYBOARD => char::from_u32(payload).map_or(Event::None, Event::Keyboard),
            Self::MOUSE => Event::Mouse {
                x: payload % 65536,
                y: payload / 65536,
            },
            _ => Event::None,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Event::None)
    }
}

/// Where events come from.
pub trait InputSource {
    /// The most recent event delivered since the last call, without
    /// blocking.
    fn listen(&mut self) -> Option<Event>;

    /// Block until an event is delivered. `None` means the source is closed
    /// and will never deliver again.
    fn wait(&mut self) -> Option<Event>;
}

/// Producer half of [`channel`].
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<Event>,
}

impl EventSender {
    /// Deliver an event. Returns false once the receiving side is gone.
    pub fn send(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Receiving half of [`channel`]. Whatever piles up between reads collapses
/// to the newest event.
#[derive(Debug)]
pub struct ChannelInput {
    rx: Receiver<Event>,
}

impl InputSource for ChannelInput {
    fn listen(&mut self) -> Option<Event> {
        self.rx.try_iter().last()
    }

    fn wait(&mut self) -> Option<Event> {
        let first = self.rx.recv().ok()?;
        Some(self.rx.try_iter().last().unwrap_or(first))
    }
}

/// An input source fed from other threads.
pub fn channel() -> (EventSender, ChannelInput) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, ChannelInput { rx })
}

/// Holds exactly one event; newer events overwrite older ones.
#[derive(Debug)]
pub struct Mailbox<I> {
    input: I,
    held: Event,
}

impl<I: InputSource> Mailbox<I> {
    pub fn new(input: I) -> Self {
        Self {
            input,
            held: Event::None,
        }
    }

    /// The held event, after picking up anything newly delivered. Never
    /// blocks and never clears.
    pub fn poll(&mut self) -> Event {
        if let Some(event) = self.input.listen() {
            self.held = event;
        }
        self.held
    }

    /// Block until the held event differs from the one held at call time,
    /// then return it and clear the holder.
    pub fn wait_for_change(&mut self) -> Result<Event> {
        let start = self.held;
        loop {
            if self.poll() != start {
                return Ok(self.take());
            }
            match self.input.wait() {
                Some(event) => self.held = event,
                None => {
                    debug!("Input closed while waiting for an event");
                    return Err(BrowseError::InputClosed);
                }
            }
        }
    }

    /// Return the held event and clear the holder.
    pub fn take(&mut self) -> Event {
        std::mem::take(&mut self.held)
    }

    pub fn reset(&mut self) {
        self.held = Event::None;
    }

    /// The held event, without looking for new input.
    #[inline]
    pub fn held(&self) -> Event {
        self.held
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedInput;
    use super::*;

    #[test]
    fn test_from_raw() {
        assert_eq!(Event::from_raw(1, 'q' as u32), Event::Keyboard('q'));
        assert_eq!(
            Event::from_raw(2, 3 * 65536 + 700),
            Event::Mouse { x: 700, y: 3 }
        );
        assert_eq!(Event::from_raw(9, 0), Event::None);
        assert_eq!(Event::from_raw(1, 0xD800), Event::None);
    }

    #[test]
    fn test_poll_is_idempotent() {
        let (tx, rx) = channel();
        let mut mailbox = Mailbox::new(rx);
        assert_eq!(mailbox.poll(), Event::None);

        tx.send(Event::Keyboard('g'));
        assert_eq!(mailbox.poll(), Event::Keyboard('g'));
        assert_eq!(mailbox.poll(), Event::Keyboard('g'));
        assert_eq!(mailbox.held(), Event::Keyboard('g'));
    }

    #[test]
    fn test_last_write_wins() {
        let (tx, rx) = channel();
        let mut mailbox = Mailbox::new(rx);
        tx.send(Event::Keyboard('a'));
        tx.send(Event::Keyboard('b'));
        tx.send(Event::Mouse { x: 1, y: 2 });
        assert_eq!(mailbox.poll(), Event::Mouse { x: 1, y: 2 });
    }

    #[test]
    fn test_wait_for_change_skips_unchanged_events() {
        let input = ScriptedInput::waits(&[Event::None, Event::None, Event::Keyboard('f')]);
        let mut mailbox = Mailbox::new(input);
        assert_eq!(mailbox.wait_for_change().unwrap(), Event::Keyboard('f'));
        assert_eq!(mailbox.held(), Event::None);
    }

    #[test]
    fn test_wait_for_change_returns_pending_event_immediately() {
        let (tx, rx) = channel();
        let mut mailbox = Mailbox::new(rx);
        tx.send(Event::Keyboard('s'));
        assert_eq!(mailbox.wait_for_change().unwrap(), Event::Keyboard('s'));
    }

    #[test]
    fn test_wait_for_change_reports_closed_input() {
        let (tx, rx) = channel();
        let mut mailbox = Mailbox::new(rx);
        drop(tx);
        assert!(matches!(
            mailbox.wait_for_change(),
            Err(BrowseError::InputClosed)
        ));
    }

    #[test]
    fn test_take_and_reset_clear() {
        let input = ScriptedInput::default().listen_at(0, Event::Keyboard('x'));
        let mut mailbox = Mailbox::new(input);
        assert_eq!(mailbox.poll(), Event::Keyboard('x'));
        assert_eq!(mailbox.take(), Event::Keyboard('x'));
        assert_eq!(mailbox.held(), Event::None);

        mailbox.poll();
        mailbox.reset();
        assert_eq!(mailbox.poll(), Event::None);
    }
}
