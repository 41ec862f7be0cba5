use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};

use crate::dispatch::envelope::Envelope;
use crate::error::{MailboxError, MailboxResult};

type Comparator<M> = Arc<dyn Fn(&M, &M) -> Ordering + Send + Sync>;

struct HeapEntry<M> {
  envelope: Envelope<M>,
  cmp: Comparator<M>,
}

impl<M> PartialEq for HeapEntry<M> {
  fn eq(&self, other: &Self) -> bool {
    (self.cmp)(&self.envelope.message, &other.envelope.message) == Ordering::Equal
  }
}
impl<M> Eq for HeapEntry<M> {}

impl<M> PartialOrd for HeapEntry<M> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl<M> Ord for HeapEntry<M> {
  fn cmp(&self, other: &Self) -> Ordering {
    // Reversed so that `BinaryHeap` (a max-heap) yields the
    // comparator-*least* element first.
    (self.cmp)(&other.envelope.message, &self.envelope.message)
  }
}

struct PriorityInner<M> {
  heap: BinaryHeap<HeapEntry<M>>,
}

struct PriorityState<M> {
  inner: Mutex<PriorityInner<M>>,
  not_empty: Condvar,
  not_full: Condvar,
  capacity: Option<usize>,
  push_timeout: Option<Duration>,
  cmp: Comparator<M>,
}

impl<M> PriorityState<M> {
  fn new(capacity: Option<usize>, push_timeout: Option<Duration>, cmp: Comparator<M>) -> Self {
    Self {
      inner: Mutex::new(PriorityInner { heap: BinaryHeap::new() }),
      not_empty: Condvar::new(),
      not_full: Condvar::new(),
      capacity,
      push_timeout,
      cmp,
    }
  }

  fn len(&self) -> usize {
    self.inner.lock().expect("priority queue mutex poisoned").heap.len()
  }

  fn push(&self, envelope: Envelope<M>) -> MailboxResult<()>
  where
    M: Debug,
  {
    let mut guard = self.inner.lock().expect("priority queue mutex poisoned");
    if let Some(capacity) = self.capacity {
      let timeout = self.push_timeout.unwrap_or(Duration::ZERO);
      let deadline = if timeout.is_zero() { None } else { Some(Instant::now() + timeout) };
      while guard.heap.len() >= capacity {
        guard = match deadline {
          None => self.not_full.wait(guard).expect("priority queue mutex poisoned"),
          Some(deadline) => {
            let now = Instant::now();
            if now >= deadline {
              return Err(MailboxError::EnqueueFailure {
                envelope: format!("{}", envelope),
                mailbox: "bounded-priority user queue".to_string(),
              });
            }
            let (g, result) = self
              .not_full
              .wait_timeout(guard, deadline - now)
              .expect("priority queue mutex poisoned");
            if result.timed_out() && g.heap.len() >= capacity {
              return Err(MailboxError::EnqueueFailure {
                envelope: format!("{}", envelope),
                mailbox: "bounded-priority user queue".to_string(),
              });
            }
            g
          }
        };
      }
    }
    guard.heap.push(HeapEntry {
      envelope,
      cmp: self.cmp.clone(),
    });
    self.not_empty.notify_one();
    Ok(())
  }

  fn pop(&self) -> Option<Envelope<M>> {
    let mut guard = self.inner.lock().expect("priority queue mutex poisoned");
    let entry = guard.heap.pop();
    if entry.is_some() {
      self.not_full.notify_one();
    }
    entry.map(|e| e.envelope)
  }
}

/// Variant user-message queue backing a `Mailbox`.
///
/// `Unbounded`/`Bounded` are lock-free MPSC channels (`crossbeam::channel`);
/// `UnboundedPriority`/`BoundedPriority` are a mutex-guarded binary heap
/// ordered by a caller-supplied comparator, since a heap has no practical
/// lock-free formulation worth the complexity at this scale.
pub enum UserQueue<M> {
  Unbounded {
    sender: Sender<Envelope<M>>,
    receiver: Receiver<Envelope<M>>,
  },
  Bounded {
    sender: Sender<Envelope<M>>,
    receiver: Receiver<Envelope<M>>,
    push_timeout: Duration,
  },
  UnboundedPriority(PriorityState<M>),
  BoundedPriority(PriorityState<M>),
}

impl<M: Debug> UserQueue<M> {
  pub fn unbounded() -> Self {
    let (sender, receiver) = channel::unbounded();
    Self::Unbounded { sender, receiver }
  }

  pub fn bounded(capacity: usize, push_timeout: Duration) -> Self {
    let (sender, receiver) = channel::bounded(capacity);
    Self::Bounded {
      sender,
      receiver,
      push_timeout,
    }
  }

  pub fn unbounded_priority(cmp: impl Fn(&M, &M) -> Ordering + Send + Sync + 'static) -> Self {
    Self::UnboundedPriority(PriorityState::new(None, None, Arc::new(cmp)))
  }

  pub fn bounded_priority(
    capacity: usize,
    push_timeout: Duration,
    cmp: impl Fn(&M, &M) -> Ordering + Send + Sync + 'static,
  ) -> Self {
    Self::BoundedPriority(PriorityState::new(Some(capacity), Some(push_timeout), Arc::new(cmp)))
  }

  pub fn enqueue(&self, envelope: Envelope<M>) -> MailboxResult<()> {
    match self {
      Self::Unbounded { sender, .. } => {
        sender.send(envelope).expect("receiver outlives sender: owned by the same mailbox");
        Ok(())
      }
      Self::Bounded { sender, push_timeout, .. } => {
        if push_timeout.is_zero() {
          sender.send(envelope).expect("receiver outlives sender: owned by the same mailbox");
          return Ok(());
        }
        match sender.send_timeout(envelope, *push_timeout) {
          Ok(()) => Ok(()),
          Err(channel::SendTimeoutError::Timeout(envelope)) => Err(MailboxError::EnqueueFailure {
            envelope: format!("{}", envelope),
            mailbox: "bounded user queue".to_string(),
          }),
          Err(channel::SendTimeoutError::Disconnected(_)) => {
            unreachable!("receiver outlives sender: owned by the same mailbox")
          }
        }
      }
      Self::UnboundedPriority(state) => state.push(envelope),
      Self::BoundedPriority(state) => state.push(envelope),
    }
  }

  /// Non-blocking dequeue; used only by the dispatcher's run loop, which
  /// never waits for a message that has not yet arrived.
  pub fn dequeue(&self) -> Option<Envelope<M>> {
    match self {
      Self::Unbounded { receiver, .. } | Self::Bounded { receiver, .. } => receiver.try_recv().ok(),
      Self::UnboundedPriority(state) | Self::BoundedPriority(state) => state.pop(),
    }
  }

  pub fn has_messages(&self) -> bool {
    match self {
      Self::Unbounded { receiver, .. } | Self::Bounded { receiver, .. } => !receiver.is_empty(),
      Self::UnboundedPriority(state) | Self::BoundedPriority(state) => state.len() > 0,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      Self::Unbounded { receiver, .. } | Self::Bounded { receiver, .. } => receiver.len(),
      Self::UnboundedPriority(state) | Self::BoundedPriority(state) => state.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}
