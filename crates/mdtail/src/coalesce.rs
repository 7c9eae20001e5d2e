/// Whether a commit is currently scheduled for the next tick. At most one
/// flush is ever armed, no matter how many chunks arrive in between.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlushState {
    #[default]
    Idle,
    Armed,
}

/// Accumulates inbound chunks and commits them to the document at most once
/// per tick, decoupling chunk arrival rate from re-render rate.
///
/// The document grows only through [`commit`](Self::flush_tick) /
/// [`force_flush`](Self::force_flush) and resets only through
/// [`clear`](Self::clear); nothing else mutates it.
#[derive(Debug, Default)]
pub struct CoalescingBuffer {
    document: String,
    pending: String,
    flush_state: FlushState,
}

impl CoalescingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn is_armed(&self) -> bool {
        self.flush_state == FlushState::Armed
    }

    #[cfg(test)]
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Stage a chunk for the next commit. Arms a flush if none is armed;
    /// otherwise the chunk rides along with the already-armed flush. An empty
    /// chunk is a legal no-op contribution and does not arm.
    pub fn append(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.pending.push_str(chunk);
        self.flush_state = FlushState::Armed;
    }

    /// Scheduled commit. No-op unless a flush is armed, so a tick that fires
    /// after the buffer was drained by a teardown path resurrects nothing.
    pub fn flush_tick(&mut self) -> bool {
        if self.flush_state == FlushState::Idle {
            return false;
        }
        self.commit()
    }

    /// Synchronous drain used by connection teardown and explicit clear.
    /// Safe to call with nothing armed or nothing pending.
    pub fn force_flush(&mut self) -> bool {
        self.commit()
    }

    /// Drop pending and committed content and de-arm any scheduled flush.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.document.clear();
        self.flush_state = FlushState::Idle;
    }

    fn commit(&mut self) -> bool {
        self.flush_state = FlushState::Idle;
        if self.pending.is_empty() {
            return false;
        }
        self.document.push_str(&self.pending);
        self.pending.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_within_one_window_commit_as_one_append_in_order() {
        let mut buffer = CoalescingBuffer::new();
        buffer.append("a");
        buffer.append("b");
        buffer.append("c");
        assert!(buffer.is_armed());
        assert_eq!(buffer.document(), "");

        assert!(buffer.flush_tick());
        assert_eq!(buffer.document(), "abc");
        assert!(!buffer.is_armed());

        // The next tick has nothing to do.
        assert!(!buffer.flush_tick());
        assert_eq!(buffer.document(), "abc");
    }

    #[test]
    fn empty_chunk_is_a_no_op_and_does_not_arm() {
        let mut buffer = CoalescingBuffer::new();
        buffer.append("");
        assert!(!buffer.is_armed());
        assert!(!buffer.flush_tick());
        assert_eq!(buffer.document(), "");
    }

    #[test]
    fn empty_flush_is_idempotent() {
        let mut buffer = CoalescingBuffer::new();
        assert!(!buffer.force_flush());
        assert!(!buffer.force_flush());
        assert!(!buffer.flush_tick());
        assert_eq!(buffer.document(), "");
    }

    #[test]
    fn force_flush_drains_pending_even_when_armed_flush_never_ran() {
        let mut buffer = CoalescingBuffer::new();
        buffer.append("hello ");
        buffer.append("world");
        assert!(buffer.force_flush());
        assert_eq!(buffer.document(), "hello world");
        assert!(!buffer.is_armed());
    }

    #[test]
    fn clear_wins_over_a_previously_armed_flush() {
        let mut buffer = CoalescingBuffer::new();
        buffer.append("committed");
        buffer.flush_tick();
        buffer.append("staged");
        assert!(buffer.is_armed());

        buffer.clear();
        // The tick that was armed before the clear fires late: it must not
        // reintroduce cleared content.
        assert!(!buffer.flush_tick());
        assert_eq!(buffer.document(), "");
        assert_eq!(buffer.pending(), "");
    }

    #[test]
    fn document_grows_monotonically_across_commits() {
        let mut buffer = CoalescingBuffer::new();
        buffer.append("one\n");
        buffer.flush_tick();
        buffer.append("two\n");
        buffer.flush_tick();
        assert_eq!(buffer.document(), "one\ntwo\n");
    }
}
