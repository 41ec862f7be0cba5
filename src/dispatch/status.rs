use std::sync::atomic::{AtomicU8, Ordering};

use num_enum::TryFromPrimitive;

/// Primary lifecycle state, packed into the low two bits of a `StatusWord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum PrimaryState {
  Open = 0,
  Suspended = 1,
  Closed = 2,
}

const PRIMARY_MASK: u8 = 0b011;
const SCHEDULED_BIT: u8 = 0b100;

/// Packed atomic word coordinating suspension, closure and scheduling for a
/// single mailbox.
///
/// The low two bits hold `PrimaryState`; bit 2 holds the scheduled flag. The
/// numeric assignment of `PrimaryState` is load-bearing: `word <= Suspended`
/// (i.e. the raw byte compared against `1`) identifies "not closed and not
/// scheduled" in a single comparison, which `set_as_scheduled` relies on.
#[derive(Debug)]
pub struct StatusWord(AtomicU8);

impl StatusWord {
  pub fn new() -> Self {
    Self(AtomicU8::new(PrimaryState::Open as u8))
  }

  #[inline]
  pub fn status(&self) -> u8 {
    self.0.load(Ordering::Acquire)
  }

  #[inline]
  pub fn primary(&self) -> PrimaryState {
    PrimaryState::try_from(self.status() & PRIMARY_MASK)
      .expect("reserved primary state bits observed")
  }

  #[inline]
  pub fn should_process_message(&self) -> bool {
    self.primary() == PrimaryState::Open
  }

  #[inline]
  pub fn is_suspended(&self) -> bool {
    self.primary() == PrimaryState::Suspended
  }

  #[inline]
  pub fn is_closed(&self) -> bool {
    self.primary() == PrimaryState::Closed
  }

  #[inline]
  pub fn is_scheduled(&self) -> bool {
    self.status() & SCHEDULED_BIT != 0
  }

  fn become_primary(&self, target: PrimaryState) -> bool {
    loop {
      let current = self.0.load(Ordering::Acquire);
      if current & PRIMARY_MASK == PrimaryState::Closed as u8 {
        return false;
      }
      let next = (current & SCHEDULED_BIT) | target as u8;
      match self
        .0
        .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
      {
        Ok(_) => return true,
        Err(_) => continue,
      }
    }
  }

  pub fn become_open(&self) -> bool {
    self.become_primary(PrimaryState::Open)
  }

  pub fn become_suspended(&self) -> bool {
    self.become_primary(PrimaryState::Suspended)
  }

  pub fn become_closed(&self) -> bool {
    self.become_primary(PrimaryState::Closed)
  }

  /// Sets the scheduled bit iff the primary state is `Open` or `Suspended`
  /// and the bit is currently clear; equivalently, iff the raw word is
  /// `<= Suspended`. Returns false without retrying when ineligible.
  pub fn set_as_scheduled(&self) -> bool {
    loop {
      let current = self.0.load(Ordering::Acquire);
      if current > PrimaryState::Suspended as u8 {
        return false;
      }
      let next = current | SCHEDULED_BIT;
      match self
        .0
        .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
      {
        Ok(_) => return true,
        Err(_) => continue,
      }
    }
  }

  /// Clears the scheduled bit unconditionally, preserving primary state.
  pub fn set_as_idle(&self) {
    loop {
      let current = self.0.load(Ordering::Acquire);
      let next = current & !SCHEDULED_BIT;
      if current == next {
        return;
      }
      match self
        .0
        .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
      {
        Ok(_) => return,
        Err(_) => continue,
      }
    }
  }
}

impl Default for StatusWord {
  fn default() -> Self {
    Self::new()
  }
}
