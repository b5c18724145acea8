//! The gridding loop: apply an action across a range of slots, stopping
//! early when input arrives.

use std::ops::Range;

use log::debug;

use super::mailbox::{InputSource, Mailbox};
use crate::error::Result;

/// How a gridding pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gridding {
    /// Every index in the range was visited.
    Completed,
    /// An event was pending before index `at`, which was not visited.
    Interrupted { at: usize },
}

impl Gridding {
    #[inline]
    pub fn is_completed(&self) -> bool {
        matches!(self, Gridding::Completed)
    }
}

/// Run `action` on each index of `range` in ascending order.
///
/// The mailbox is polled before every index. A pending event stops the pass
/// before that index is touched; the event stays held for the caller.
pub fn gridding<I, F>(mailbox: &mut Mailbox<I>, range: Range<usize>, mut action: F) -> Result<Gridding>
where
    I: InputSource,
    F: FnMut(usize, &mut Mailbox<I>) -> Result<()>,
{
    for index in range {
        if !mailbox.poll().is_none() {
            debug!("Gridding interrupted at slot {index} by {:?}", mailbox.held());
            return Ok(Gridding::Interrupted { at: index });
        }
        action(index, mailbox)?;
    }
    Ok(Gridding::Completed)
}
