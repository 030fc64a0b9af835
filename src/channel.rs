//! Typed, bounded/unbounded channel with close semantics (§4.3 `Channel`).
//!
//! Built directly on `parking_lot::{Mutex, Condvar}` rather than an
//! off-the-shelf channel crate: the close/range/try-variant contract here
//! (idempotent close with an error string, capacity-0 rendezvous, a
//! `Condvar` shared between send- and receive-side waiters so `select` can
//! register against it without spawning a thread per case) doesn't map onto
//! any single existing channel type cleanly, and hand-rolling it keeps the
//! state machine in one place we can reason about against §4.11's Channel
//! state diagram.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::CoreError;
use crate::value::Value;

/// Recommended maximum channel capacity (§5 "Resource caps").
pub const MAX_CAPACITY: usize = 1 << 20;

/// Direction restriction placed on a channel handle (§3 `Channel`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Bidirectional,
    SendOnly,
    ReceiveOnly,
}

/// The buffer plus the rendezvous bookkeeping, all behind one lock so a
/// push/pop and its ticket accounting are always one atomic step.
struct BufferState {
    queue: VecDeque<Value>,
    /// Ticket handed to the next rendezvous (capacity-0) push — each
    /// capacity-0 `send` takes the current value and increments this.
    next_ticket: u64,
    /// Count of values popped from this channel so far, in FIFO order.
    /// Since the queue is strictly FIFO, a rendezvous sender holding
    /// ticket `t` knows its own value has been consumed exactly when
    /// `popped > t` — no other sender's pop can satisfy that, because pops
    /// happen in the same order values were pushed.
    popped: u64,
}

struct Shared {
    buffer: Mutex<BufferState>,
    cond: Condvar,
    capacity: usize,
    closed: std::sync::atomic::AtomicBool,
}

/// A handle to one channel. Cloning shares the same underlying queue —
/// channels are reference types, never copied by value (§9).
#[derive(Clone)]
pub struct Channel {
    shared: Arc<Shared>,
    direction: Direction,
}

impl Channel {
    /// `channel(cap, dir)`. Capacity 0 means rendezvous; capacity above
    /// [`MAX_CAPACITY`] is rejected as [`CoreError::InvalidArgument`].
    pub fn new(capacity: usize, direction: Direction) -> Result<Channel, CoreError> {
        if capacity > MAX_CAPACITY {
            return Err(CoreError::invalid_argument(format!(
                "channel capacity {capacity} exceeds max {MAX_CAPACITY}"
            )));
        }
        Ok(Channel {
            shared: Arc::new(Shared {
                buffer: Mutex::new(BufferState {
                    queue: VecDeque::with_capacity(capacity.min(64)),
                    next_ticket: 0,
                    popped: 0,
                }),
                cond: Condvar::new(),
                capacity,
                closed: std::sync::atomic::AtomicBool::new(false),
            }),
            direction,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn require_sendable(&self) -> Result<(), CoreError> {
        if self.direction == Direction::ReceiveOnly {
            return Err(CoreError::invalid_argument(
                "send on a receive-only channel",
            ));
        }
        Ok(())
    }

    fn require_receivable(&self) -> Result<(), CoreError> {
        if self.direction == Direction::SendOnly {
            return Err(CoreError::invalid_argument("receive on a send-only channel"));
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// `send(v)` — blocks until buffered (cap>0) or rendezvoused (cap=0).
    pub fn send(&self, v: Value) -> Result<(), CoreError> {
        self.require_sendable()?;
        let mut buf = self.shared.buffer.lock();
        loop {
            if self.is_closed() {
                return Err(CoreError::closed("send on closed channel"));
            }
            if self.shared.capacity == 0 {
                // Rendezvous: publish the value under a unique ticket and
                // wait until a receive has popped at least that far, or the
                // channel is closed out from under us. Tracking a ticket
                // (rather than the buffer's instantaneous length) is what
                // keeps this correct with multiple concurrent rendezvous
                // senders: length alone can't tell a sender whether *its*
                // value was the one a concurrent receive just took.
                let my_ticket = buf.next_ticket;
                buf.next_ticket += 1;
                buf.queue.push_back(v.deep_copy_for_send());
                self.shared.cond.notify_all();
                loop {
                    if buf.popped > my_ticket {
                        return Ok(());
                    }
                    if self.is_closed() {
                        return Err(CoreError::closed("send on closed channel"));
                    }
                    self.shared.cond.wait(&mut buf);
                }
            }
            if buf.queue.len() < self.shared.capacity {
                buf.queue.push_back(v.deep_copy_for_send());
                self.shared.cond.notify_all();
                return Ok(());
            }
            self.shared.cond.wait(&mut buf);
        }
    }

    /// `try_send(v) -> ok`. Never blocks; `false` without buffering on a
    /// full or closed channel.
    pub fn try_send(&self, v: Value) -> Result<bool, CoreError> {
        self.require_sendable()?;
        let mut buf = self.shared.buffer.lock();
        if self.is_closed() {
            return Ok(false);
        }
        if self.shared.capacity == 0 {
            // A non-blocking rendezvous only succeeds if a receiver is
            // already parked waiting for a value.
            return Ok(false);
        }
        if buf.queue.len() < self.shared.capacity {
            buf.queue.push_back(v.deep_copy_for_send());
            self.shared.cond.notify_all();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// `receive() -> (v, ok)`. Blocks until a value is available or the
    /// channel is closed-and-drained.
    pub fn receive(&self) -> Result<(Option<Value>, bool), CoreError> {
        self.require_receivable()?;
        let mut buf = self.shared.buffer.lock();
        loop {
            if let Some(v) = buf.queue.pop_front() {
                buf.popped += 1;
                self.shared.cond.notify_all();
                return Ok((Some(v), true));
            }
            if self.is_closed() {
                return Ok((None, false));
            }
            self.shared.cond.wait(&mut buf);
        }
    }

    /// `try_receive() -> (v, ok)`. `(nil, false)` on empty-non-closed.
    pub fn try_receive(&self) -> Result<(Option<Value>, bool), CoreError> {
        self.require_receivable()?;
        let mut buf = self.shared.buffer.lock();
        if let Some(v) = buf.queue.pop_front() {
            buf.popped += 1;
            self.shared.cond.notify_all();
            return Ok((Some(v), true));
        }
        Ok((None, false))
    }

    /// `close()`. Idempotent failure: a second close returns
    /// `(false, "already closed")`.
    pub fn close(&self) -> (bool, Option<&'static str>) {
        let _buf = self.shared.buffer.lock();
        if self.shared.closed.swap(true, std::sync::atomic::Ordering::SeqCst) {
            (false, Some("already closed"))
        } else {
            self.shared.cond.notify_all();
            (true, None)
        }
    }

    pub fn len(&self) -> usize {
        self.shared.buffer.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cap(&self) -> usize {
        self.shared.capacity
    }

    /// Observational only — §4.3: "users must not rely on it for
    /// synchronization."
    pub fn is_closed_observational(&self) -> bool {
        self.is_closed()
    }

    /// `range(handler)` — consume to exhaustion. Handler errors are logged
    /// and swallowed (§4.3, §9 Open Question 3 — kept intentional here).
    pub fn range<F>(&self, mut handler: F) -> Result<(), CoreError>
    where
        F: FnMut(Value) -> Result<(), CoreError>,
    {
        self.require_receivable()?;
        loop {
            let (value, ok) = self.receive()?;
            if !ok {
                return Ok(());
            }
            if let Some(v) = value {
                if let Err(e) = handler(v) {
                    tracing::warn!(target: "goroutine", error = %e, "channel range handler error");
                }
            }
        }
    }

    /// Internal hook used by the select multiplexer: true if a receive
    /// would succeed right now without blocking (value ready, or closed and
    /// drained so receive would return `(nil, false)` immediately).
    pub(crate) fn receive_ready(&self) -> bool {
        let buf = self.shared.buffer.lock();
        !buf.queue.is_empty() || self.is_closed()
    }

    /// Internal hook: true if a send of `cap` tokens would succeed right
    /// now without blocking. Capacity-0 channels never report ready here —
    /// a non-blocking select case on a rendezvous channel can only fire
    /// once a receiver is already parked, which this snapshot cannot see,
    /// so conservatively this crate treats a capacity-0 send case as never
    /// select-ready (documented limitation, consistent with `try_send`
    /// always returning `false` on a rendezvous channel above).
    pub(crate) fn send_ready(&self) -> bool {
        if self.is_closed() {
            return true; // ready to fail fast with SendOnClosed
        }
        if self.shared.capacity == 0 {
            return false;
        }
        self.shared.buffer.lock().queue.len() < self.shared.capacity
    }

    pub(crate) fn wait_for_activity(&self, timeout: Option<Duration>) {
        let mut buf = self.shared.buffer.lock();
        match timeout {
            Some(d) => {
                let _ = self.shared.cond.wait_for(&mut buf, d);
            }
            None => {
                let deadline = Instant::now() + Duration::from_millis(50);
                let _ = self.shared.cond.wait_until(&mut buf, deadline);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn ch(cap: usize) -> Channel {
        Channel::new(cap, Direction::Bidirectional).unwrap()
    }

    #[test]
    fn double_close_returns_already_closed() {
        let c = ch(1);
        assert_eq!(c.close(), (true, None));
        assert_eq!(c.close(), (false, Some("already closed")));
    }

    #[test]
    fn closed_drain_then_eof() {
        let c = ch(2);
        c.send(Value::Number(1.0)).unwrap();
        c.close();
        assert_eq!(c.receive().unwrap().1, true);
        let (v, ok) = c.receive().unwrap();
        assert!(!ok);
        assert!(v.is_none());
    }

    #[test]
    fn send_on_closed_fails() {
        let c = ch(1);
        c.close();
        assert!(c.send(Value::Nil).is_err());
    }

    #[test]
    fn try_send_full_returns_false() {
        let c = ch(1);
        assert!(c.try_send(Value::Number(1.0)).unwrap());
        assert!(!c.try_send(Value::Number(2.0)).unwrap());
    }

    #[test]
    fn try_receive_empty_returns_false() {
        let c = ch(1);
        let (v, ok) = c.try_receive().unwrap();
        assert!(!ok && v.is_none());
    }

    #[test]
    fn rendezvous_send_blocks_until_receive() {
        let c = ch(0);
        let c2 = c.clone();
        let received = thread::spawn(move || {
            let (v, ok) = c2.receive().unwrap();
            assert!(ok);
            v
        });
        c.send(Value::Number(7.0)).unwrap();
        let v = received.join().unwrap();
        matches!(v, Some(Value::Number(n)) if n == 7.0);
    }

    /// Regression test for the ticket-less rendezvous bug: with two
    /// concurrent senders and two concurrent receivers on a capacity-0
    /// channel, every sender must observe its *own* value consumed before
    /// returning, and no sender may block forever.
    #[test]
    fn rendezvous_multiple_senders_each_unblock_on_their_own_value() {
        let c = ch(0);

        let senders: Vec<_> = (0..4)
            .map(|i| {
                let c = c.clone();
                thread::spawn(move || {
                    c.send(Value::Number(i as f64)).unwrap();
                    i
                })
            })
            .collect();

        let receivers: Vec<_> = (0..4)
            .map(|_| {
                let c = c.clone();
                thread::spawn(move || {
                    let (v, ok) = c.receive().unwrap();
                    assert!(ok);
                    match v {
                        Some(Value::Number(n)) => n as i64,
                        other => panic!("unexpected value: {other:?}"),
                    }
                })
            })
            .collect();

        let mut sent: Vec<i64> = senders.into_iter().map(|h| h.join().unwrap()).collect();
        let mut received: Vec<i64> = receivers.into_iter().map(|h| h.join().unwrap()).collect();
        sent.sort();
        received.sort();
        assert_eq!(sent, vec![0, 1, 2, 3]);
        assert_eq!(received, vec![0, 1, 2, 3]);
    }

    #[test]
    fn direction_restrictions_enforced() {
        let send_only = Channel::new(1, Direction::SendOnly).unwrap();
        assert!(send_only.receive().is_err());
        let recv_only = Channel::new(1, Direction::ReceiveOnly).unwrap();
        assert!(recv_only.send(Value::Nil).is_err());
    }

    #[test]
    fn received_count_never_exceeds_sent_count() {
        let c = ch(8);
        for i in 0..5 {
            c.send(Value::Number(i as f64)).unwrap();
        }
        c.close();
        let mut received = 0;
        c.range(|_| {
            received += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(received, 5);
    }
}
