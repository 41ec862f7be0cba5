use std::fmt::Debug;
use std::sync::Arc;

use crate::config::{MailboxSettings, QueueVariant};
use crate::dispatch::dead_letter::DeadLetterSink;
use crate::dispatch::dispatcher::Dispatcher;
use crate::dispatch::mailbox::{ActorCell, Mailbox};
use crate::dispatch::user_queue::UserQueue;
use crate::error::{MailboxError, MailboxResult};

/// Builds mailboxes from `MailboxSettings`, selecting one of the four
/// `UserQueue` flavors and validating the bounded variants' required
/// fields before any mailbox is constructed.
pub struct MailboxFactory<M> {
  settings: MailboxSettings,
  dispatcher: Arc<dyn Dispatcher<M>>,
  dead_letters: Arc<dyn DeadLetterSink<M>>,
}

impl<M: Debug + Send + 'static> MailboxFactory<M> {
  pub fn new(settings: MailboxSettings, dispatcher: Arc<dyn Dispatcher<M>>, dead_letters: Arc<dyn DeadLetterSink<M>>) -> Self {
    Self {
      settings,
      dispatcher,
      dead_letters,
    }
  }

  /// `priority_cmp` is only consulted for the two priority variants; it is
  /// ignored (and may be a trivial comparator) for the FIFO ones.
  pub fn create_mailbox(
    &self,
    id: crate::dispatch::mailbox::MailboxId,
    actor: Arc<dyn ActorCell<M>>,
    priority_cmp: impl Fn(&M, &M) -> std::cmp::Ordering + Send + Sync + 'static,
  ) -> MailboxResult<Mailbox<M>> {
    let user_queue = match self.settings.queue_variant {
      QueueVariant::Unbounded => UserQueue::unbounded(),
      QueueVariant::UnboundedPriority => UserQueue::unbounded_priority(priority_cmp),
      QueueVariant::Bounded => {
        let capacity = self.settings.capacity.ok_or_else(|| {
          MailboxError::InvalidArgument("bounded mailbox requires a capacity".to_string())
        })?;
        let push_timeout = self.settings.push_timeout.ok_or_else(|| {
          MailboxError::InvalidArgument("bounded mailbox requires a push-timeout".to_string())
        })?;
        UserQueue::bounded(capacity, push_timeout)
      }
      QueueVariant::BoundedPriority => {
        let capacity = self.settings.capacity.ok_or_else(|| {
          MailboxError::InvalidArgument("bounded-priority mailbox requires a capacity".to_string())
        })?;
        let push_timeout = self.settings.push_timeout.ok_or_else(|| {
          MailboxError::InvalidArgument("bounded-priority mailbox requires a push-timeout".to_string())
        })?;
        UserQueue::bounded_priority(capacity, push_timeout, priority_cmp)
      }
    };

    Ok(Mailbox::new(id, user_queue, actor, self.dispatcher.clone(), self.dead_letters.clone()))
  }
}
