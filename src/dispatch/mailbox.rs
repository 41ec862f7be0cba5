use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::dispatch::dead_letter::DeadLetterSink;
use crate::dispatch::dispatcher::Dispatcher;
use crate::dispatch::envelope::Envelope;
use crate::dispatch::status::StatusWord;
use crate::dispatch::system_message::SystemMessage;
use crate::dispatch::system_queue::SystemQueue;
use crate::dispatch::user_queue::UserQueue;
use crate::error::MailboxResult;

pub type MailboxId = u64;

/// Opaque actor-side collaborator a `Mailbox` delivers messages to.
///
/// The full invocation semantics (what running user code against an actor
/// means) belong to the surrounding actor runtime; from here both methods
/// are callbacks whose internals are never inspected.
pub trait ActorCell<M>: Send + Sync {
  fn invoke(&self, envelope: Envelope<M>);
  fn system_invoke(&self, message: SystemMessage);
}

/// Per-actor queue assembly plus status word; the unit a `Dispatcher`
/// schedules.
///
/// Breaks the mailbox/actor/dispatcher reference triangle the way the
/// design calls for: the mailbox holds its collaborators as `Arc<dyn Trait>`
/// (borrowed collaborators, not a structural cycle back to itself), and the
/// dispatcher never holds a permanent strong reference to the mailbox (see
/// `TokioDispatcher`).
pub struct Mailbox<M: fmt::Debug + Send + 'static> {
  pub(crate) id: MailboxId,
  pub(crate) status: StatusWord,
  system_queue: SystemQueue,
  user_queue: UserQueue<M>,
  actor: Arc<dyn ActorCell<M>>,
  dispatcher: Arc<dyn Dispatcher<M>>,
  dead_letters: Arc<dyn DeadLetterSink<M>>,
  cleaned_up: std::sync::atomic::AtomicBool,
}

impl<M: fmt::Debug + Send + 'static> fmt::Debug for Mailbox<M> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Mailbox")
      .field("id", &self.id)
      .field("status", &self.status.status())
      .finish()
  }
}

impl<M: fmt::Debug + Send + 'static> Mailbox<M> {
  pub fn new(
    id: MailboxId,
    user_queue: UserQueue<M>,
    actor: Arc<dyn ActorCell<M>>,
    dispatcher: Arc<dyn Dispatcher<M>>,
    dead_letters: Arc<dyn DeadLetterSink<M>>,
  ) -> Self {
    log::info!("mailbox {} constructed", id);
    Self {
      id,
      status: StatusWord::new(),
      system_queue: SystemQueue::new(),
      user_queue,
      actor,
      dispatcher,
      dead_letters,
      cleaned_up: std::sync::atomic::AtomicBool::new(false),
    }
  }

  pub fn id(&self) -> MailboxId {
    self.id
  }

  pub fn enqueue(&self, envelope: Envelope<M>) -> MailboxResult<()> {
    self.user_queue.enqueue(envelope)
  }

  pub fn system_enqueue(&self, message: SystemMessage) {
    self.system_queue.push(message);
  }

  pub fn suspend(&self) -> bool {
    self.status.become_suspended()
  }

  pub fn resume(&self) -> bool {
    self.status.become_open()
  }

  pub fn close(&self) -> bool {
    self.status.become_closed()
  }

  pub fn is_closed(&self) -> bool {
    self.status.is_closed()
  }

  pub fn is_suspended(&self) -> bool {
    self.status.is_suspended()
  }

  /// Whether the dispatcher should schedule this mailbox, given hints about
  /// whether new messages have arrived. A `Closed` mailbox never schedules;
  /// a `Suspended` one schedules only for pending system messages; an
  /// `Open` one schedules whenever either queue is non-empty.
  pub fn can_be_scheduled_for_execution(&self, has_message_hint: bool, has_system_message_hint: bool) -> bool {
    if self.status.is_closed() {
      return false;
    }
    let has_system = has_system_message_hint || self.system_queue.has_messages();
    if self.status.is_suspended() {
      return has_system;
    }
    let has_user = has_message_hint || self.user_queue.has_messages();
    has_system || has_user
  }

  /// Dispatcher entry point. Drains system messages to exhaustion, then
  /// user messages up to the throughput bound, then unconditionally clears
  /// the scheduled bit and asks the dispatcher to re-register — with
  /// `(false, false)` hints, so the dispatcher's own
  /// `can_be_scheduled_for_execution` re-check is what actually decides
  /// whether anything arrived during this run.
  pub async fn run(self: Arc<Self>) {
    if !self.status.is_closed() {
      self.process_all_system_messages();
      self.process_mailbox();
    }
    self.status.set_as_idle();
    let dispatcher = self.dispatcher.clone();
    dispatcher.register_for_execution(self.clone(), false, false).await;
  }

  fn process_all_system_messages(&self) {
    loop {
      let drained = self.system_queue.drain();
      if drained.is_empty() {
        return;
      }
      let remaining = drained.len();
      for (i, message) in drained.into_iter().enumerate() {
        let tail_after_this = remaining - i - 1;
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
          self.actor.system_invoke(message);
        }));
        if let Err(payload) = outcome {
          let reason = panic_message(&payload);
          log::error!(
            "mailbox {} system message handler panicked ({}) with {} message(s) left undelivered in this batch",
            self.id,
            reason,
            tail_after_this
          );
          std::panic::resume_unwind(payload);
        }
      }
    }
  }

  fn process_mailbox(&self) {
    if !self.status.should_process_message() {
      return;
    }
    let mut next = self.user_queue.dequeue();
    if next.is_none() {
      return;
    }

    let throughput = self.dispatcher.throughput();
    if throughput == 0 {
      if let Some(envelope) = next {
        self.actor.invoke(envelope);
        self.process_all_system_messages();
      }
      return;
    }

    let deadline = if self.dispatcher.has_deadline() {
      Some(Instant::now() + self.dispatcher.deadline())
    } else {
      None
    };

    let mut processed = 0usize;
    while let Some(envelope) = next {
      self.actor.invoke(envelope);
      self.process_all_system_messages();
      if !self.status.should_process_message() {
        break;
      }
      processed += 1;
      if processed >= throughput {
        break;
      }
      if let Some(deadline) = deadline {
        if Instant::now() >= deadline {
          break;
        }
      }
      next = self.user_queue.dequeue();
    }
  }

  /// Drains both queues to the dead letter sink exactly once. Idempotent:
  /// a second call observes both queues already empty and enqueues
  /// nothing.
  pub fn clean_up(&self) {
    if self
      .cleaned_up
      .swap(true, std::sync::atomic::Ordering::AcqRel)
    {
      return;
    }
    let mut system_drained = 0usize;
    loop {
      let drained = self.system_queue.drain();
      if drained.is_empty() {
        break;
      }
      system_drained += drained.len();
      for message in drained {
        self.dead_letters.system_enqueue(message);
      }
    }
    let mut user_drained = 0usize;
    while let Some(envelope) = self.user_queue.dequeue() {
      user_drained += 1;
      self.dead_letters.enqueue(envelope);
    }
    log::info!(
      "mailbox {} cleaned up: {} system message(s), {} user message(s) forwarded to dead letters",
      self.id,
      system_drained,
      user_drained
    );
  }
}

/// Renders a caught panic payload the way `Display` would for the common
/// `&str`/`String` panic-message shapes produced by `panic!`/`.unwrap()`;
/// falls back to a fixed placeholder for anything else.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
  if let Some(s) = payload.downcast_ref::<&str>() {
    s.to_string()
  } else if let Some(s) = payload.downcast_ref::<String>() {
    s.clone()
  } else {
    "non-string panic payload".to_string()
  }
}
