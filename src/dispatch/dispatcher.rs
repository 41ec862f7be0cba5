use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::dispatch::mailbox::{Mailbox, MailboxId};

/// External contract an executor must satisfy to drive mailboxes.
///
/// Implementations guarantee at most one concurrent `Mailbox::run` per
/// mailbox; the scheduled-bit CAS on `StatusWord` is what actually enforces
/// this, `register_for_execution` only decides whether to hand a mailbox to
/// the executor at all.
#[async_trait]
pub trait Dispatcher<M>: Send + Sync
where
  M: Debug + Send + 'static,
{
  fn throughput(&self) -> usize;
  fn has_deadline(&self) -> bool;
  fn deadline(&self) -> Duration;

  /// Consults `Mailbox::can_be_scheduled_for_execution`; on a positive
  /// result, attempts the `set_as_scheduled` CAS and, only if that succeeds,
  /// hands the mailbox to the executor. Returns whether it actually
  /// scheduled a run.
  async fn register_for_execution(
    &self,
    mailbox: Arc<Mailbox<M>>,
    has_message_hint: bool,
    has_system_message_hint: bool,
  ) -> bool;
}

/// `tokio`-backed dispatcher. Spawns `Mailbox::run` as a task whenever
/// scheduling succeeds; holds no permanent strong reference to any mailbox
/// (the spawned task's own `Arc` clone is released as soon as `run`
/// returns), which is what keeps the mailbox/actor/dispatcher reference
/// triangle from becoming a real ownership cycle. The registry below is
/// bookkeeping only (diagnostics, mailbox-id allocation), not ownership.
pub struct TokioDispatcher<M> {
  throughput: usize,
  has_deadline: bool,
  deadline: Duration,
  next_id: AtomicU64,
  registry: DashMap<MailboxId, Weak<Mailbox<M>>>,
}

impl<M> TokioDispatcher<M> {
  pub fn new(throughput: usize, deadline: Option<Duration>) -> Self {
    Self {
      throughput,
      has_deadline: deadline.is_some(),
      deadline: deadline.unwrap_or_default(),
      next_id: AtomicU64::new(1),
      registry: DashMap::new(),
    }
  }

  pub fn from_settings(settings: &crate::config::MailboxSettings) -> Self {
    Self::new(settings.throughput, settings.throughput_deadline_time)
  }

  pub fn allocate_mailbox_id(&self) -> MailboxId {
    self.next_id.fetch_add(1, Ordering::Relaxed)
  }

  pub fn track(&self, id: MailboxId, mailbox: &Arc<Mailbox<M>>) {
    self.registry.insert(id, Arc::downgrade(mailbox));
  }

  pub fn active_mailbox_count(&self) -> usize {
    self.registry.iter().filter(|entry| entry.value().strong_count() > 0).count()
  }
}

#[async_trait]
impl<M> Dispatcher<M> for TokioDispatcher<M>
where
  M: Debug + Send + 'static,
{
  fn throughput(&self) -> usize {
    self.throughput
  }

  fn has_deadline(&self) -> bool {
    self.has_deadline
  }

  fn deadline(&self) -> Duration {
    self.deadline
  }

  async fn register_for_execution(
    &self,
    mailbox: Arc<Mailbox<M>>,
    has_message_hint: bool,
    has_system_message_hint: bool,
  ) -> bool {
    if !mailbox.can_be_scheduled_for_execution(has_message_hint, has_system_message_hint) {
      return false;
    }
    if !mailbox.status.set_as_scheduled() {
      return false;
    }
    log::debug!("scheduling mailbox {} for execution", mailbox.id());
    tokio::spawn(async move {
      mailbox.run().await;
    });
    true
  }
}
