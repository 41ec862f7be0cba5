use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::dispatch::system_message::SystemMessage;

struct Node {
  message: SystemMessage,
  next: *mut Node,
}

/// Lock-free LIFO of pending system messages, rooted at a single head
/// pointer.
///
/// Push is a CAS-linked prepend; drain atomically swaps the head for null
/// and reverses the taken chain so that callers observe arrival order
/// (FIFO) despite the stack itself being LIFO. Only one thread at a time
/// ever calls `drain` (the owning mailbox's current runner), so reclamation
/// of drained nodes needs no epoch scheme: a node popped off the head is
/// never again reachable from a concurrent pusher.
pub struct SystemQueue {
  head: AtomicPtr<Node>,
}

unsafe impl Send for SystemQueue {}
unsafe impl Sync for SystemQueue {}

impl SystemQueue {
  pub fn new() -> Self {
    Self {
      head: AtomicPtr::new(ptr::null_mut()),
    }
  }

  pub fn push(&self, message: SystemMessage) {
    let node = Box::into_raw(Box::new(Node {
      message,
      next: ptr::null_mut(),
    }));
    loop {
      let head = self.head.load(Ordering::Acquire);
      unsafe {
        (*node).next = head;
      }
      match self
        .head
        .compare_exchange_weak(head, node, Ordering::AcqRel, Ordering::Acquire)
      {
        Ok(_) => return,
        Err(_) => continue,
      }
    }
  }

  pub fn has_messages(&self) -> bool {
    !self.head.load(Ordering::Acquire).is_null()
  }

  /// Takes the entire current chain and returns it in arrival order.
  pub fn drain(&self) -> Vec<SystemMessage> {
    let mut taken = loop {
      let head = self.head.load(Ordering::Acquire);
      if head.is_null() {
        return Vec::new();
      }
      match self
        .head
        .compare_exchange_weak(head, ptr::null_mut(), Ordering::AcqRel, Ordering::Acquire)
      {
        Ok(_) => break head,
        Err(_) => continue,
      }
    };

    // `taken` is LIFO (most recently pushed first); walk it and reverse.
    let mut messages = Vec::new();
    while !taken.is_null() {
      let node = unsafe { Box::from_raw(taken) };
      taken = node.next;
      messages.push(node.message);
    }
    messages.reverse();
    messages
  }
}

impl Default for SystemQueue {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for SystemQueue {
  fn drop(&mut self) {
    let mut node = *self.head.get_mut();
    while !node.is_null() {
      let boxed = unsafe { Box::from_raw(node) };
      node = boxed.next;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_queue_drains_nothing() {
    let q = SystemQueue::new();
    assert!(!q.has_messages());
    assert!(q.drain().is_empty());
  }

  #[test]
  fn preserves_arrival_order() {
    let q = SystemQueue::new();
    q.push(SystemMessage::Create);
    q.push(SystemMessage::Suspend);
    q.push(SystemMessage::Resume);
    let drained = q.drain();
    let tags: Vec<_> = drained.iter().map(|m| format!("{}", m)).collect();
    assert_eq!(tags, vec!["Create", "Suspend", "Resume"]);
    assert!(!q.has_messages());
  }

  #[test]
  fn drain_then_push_then_drain() {
    let q = SystemQueue::new();
    q.push(SystemMessage::Create);
    assert_eq!(q.drain().len(), 1);
    q.push(SystemMessage::Terminate);
    let drained = q.drain();
    assert_eq!(drained.len(), 1);
  }
}
