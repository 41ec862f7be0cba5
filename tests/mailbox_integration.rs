use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actuator_mailbox::config::{MailboxSettings, QueueVariant};
use actuator_mailbox::dispatch::dead_letter::DeadLetterSink;
use actuator_mailbox::dispatch::dispatcher::{Dispatcher, TokioDispatcher};
use actuator_mailbox::dispatch::envelope::Envelope;
use actuator_mailbox::dispatch::mailbox::{ActorCell, Mailbox};
use actuator_mailbox::dispatch::mailbox_factory::MailboxFactory;
use actuator_mailbox::dispatch::system_message::SystemMessage;

#[ctor::ctor]
fn init_logging() {
  let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Default)]
struct RecordingActor {
  trace: Mutex<Vec<String>>,
  suspend_after: AtomicUsize,
  invoked: AtomicUsize,
  mailbox: Mutex<Option<Arc<Mailbox<i32>>>>,
}

impl RecordingActor {
  fn trace(&self) -> Vec<String> {
    self.trace.lock().unwrap().clone()
  }
}

impl ActorCell<i32> for RecordingActor {
  fn invoke(&self, envelope: Envelope<i32>) {
    self.trace.lock().unwrap().push(format!("invoke({})", envelope.message));
    let count = self.invoked.fetch_add(1, AtomicOrdering::SeqCst) + 1;
    let threshold = self.suspend_after.load(AtomicOrdering::SeqCst);
    if threshold != 0 && count == threshold {
      if let Some(mailbox) = self.mailbox.lock().unwrap().as_ref() {
        mailbox.suspend();
      }
    }
  }

  fn system_invoke(&self, message: SystemMessage) {
    self
      .trace
      .lock()
      .unwrap()
      .push(format!("systemInvoke({})", message));
  }
}

struct RecordingSink {
  user: Mutex<Vec<i32>>,
  system: Mutex<Vec<String>>,
}

impl RecordingSink {
  fn new() -> Self {
    Self {
      user: Mutex::new(Vec::new()),
      system: Mutex::new(Vec::new()),
    }
  }
}

impl DeadLetterSink<i32> for RecordingSink {
  fn enqueue(&self, envelope: Envelope<i32>) {
    self.user.lock().unwrap().push(envelope.message);
  }

  fn system_enqueue(&self, message: SystemMessage) {
    self.system.lock().unwrap().push(format!("{}", message));
  }
}

fn int_cmp(a: &i32, b: &i32) -> Ordering {
  a.cmp(b)
}

#[tokio::test]
async fn basic_ordering_runs_messages_in_fifo_order() {
  let dispatcher: Arc<dyn Dispatcher<i32>> = Arc::new(TokioDispatcher::new(10, None));
  let factory = MailboxFactory::new(MailboxSettings::default_values(), dispatcher.clone(), Arc::new(actuator_mailbox::dispatch::dead_letter::LoggingDeadLetterSink));
  let actor = Arc::new(RecordingActor::default());
  let mailbox = Arc::new(
    factory
      .create_mailbox(1, actor.clone(), int_cmp)
      .expect("unbounded mailbox always constructs"),
  );

  mailbox.enqueue(Envelope::new(1)).unwrap();
  mailbox.enqueue(Envelope::new(2)).unwrap();
  mailbox.enqueue(Envelope::new(3)).unwrap();

  mailbox.clone().run().await;

  assert_eq!(actor.trace(), vec!["invoke(1)", "invoke(2)", "invoke(3)"]);
  assert!(!mailbox.is_closed());
}

#[tokio::test]
async fn system_messages_take_priority_over_user_messages() {
  let dispatcher: Arc<dyn Dispatcher<i32>> = Arc::new(TokioDispatcher::new(10, None));
  let factory = MailboxFactory::new(MailboxSettings::default_values(), dispatcher, Arc::new(actuator_mailbox::dispatch::dead_letter::LoggingDeadLetterSink));
  let actor = Arc::new(RecordingActor::default());
  let mailbox = Arc::new(factory.create_mailbox(1, actor.clone(), int_cmp).unwrap());

  mailbox.enqueue(Envelope::new(10)).unwrap();
  mailbox.system_enqueue(SystemMessage::Suspend);
  mailbox.enqueue(Envelope::new(20)).unwrap();
  mailbox.system_enqueue(SystemMessage::Resume);

  mailbox.clone().run().await;

  let trace = actor.trace();
  assert_eq!(
    trace,
    vec!["systemInvoke(Suspend)", "systemInvoke(Resume)", "invoke(10)", "invoke(20)"]
  );
}

#[tokio::test]
async fn suspending_mid_batch_stops_user_processing() {
  let dispatcher: Arc<dyn Dispatcher<i32>> = Arc::new(TokioDispatcher::new(10, None));
  let factory = MailboxFactory::new(MailboxSettings::default_values(), dispatcher, Arc::new(actuator_mailbox::dispatch::dead_letter::LoggingDeadLetterSink));
  let actor = Arc::new(RecordingActor::default());
  actor.suspend_after.store(2, AtomicOrdering::SeqCst);
  let mailbox = Arc::new(factory.create_mailbox(1, actor.clone(), int_cmp).unwrap());
  *actor.mailbox.lock().unwrap() = Some(mailbox.clone());

  for v in 1..=5 {
    mailbox.enqueue(Envelope::new(v)).unwrap();
  }

  mailbox.clone().run().await;

  assert_eq!(actor.trace(), vec!["invoke(1)", "invoke(2)"]);
  assert!(mailbox.is_suspended());

  // the remaining three messages are still queued, not lost: resuming and
  // running again delivers them.
  mailbox.resume();
  mailbox.clone().run().await;
  assert_eq!(
    actor.trace(),
    vec!["invoke(1)", "invoke(2)", "invoke(3)", "invoke(4)", "invoke(5)"]
  );
}

#[tokio::test]
async fn bounded_queue_fails_enqueue_after_timeout() {
  let dispatcher: Arc<dyn Dispatcher<i32>> = Arc::new(TokioDispatcher::new(10, None));
  let settings = MailboxSettings {
    queue_variant: QueueVariant::Bounded,
    capacity: Some(1),
    push_timeout: Some(Duration::from_millis(30)),
    throughput: 5,
    throughput_deadline_time: None,
  };
  let factory = MailboxFactory::new(settings, dispatcher, Arc::new(actuator_mailbox::dispatch::dead_letter::LoggingDeadLetterSink));
  let actor = Arc::new(RecordingActor::default());
  let mailbox = Arc::new(factory.create_mailbox(1, actor, int_cmp).unwrap());

  mailbox.enqueue(Envelope::new(1)).expect("first message fits");
  let result = mailbox.enqueue(Envelope::new(2));
  assert!(result.is_err(), "second message should fail once capacity is exhausted");
}

#[tokio::test]
async fn closing_and_cleaning_up_drains_to_dead_letters() {
  let dispatcher: Arc<dyn Dispatcher<i32>> = Arc::new(TokioDispatcher::new(10, None));
  let sink = Arc::new(RecordingSink::new());
  let factory = MailboxFactory::new(MailboxSettings::default_values(), dispatcher, sink.clone());
  let actor = Arc::new(RecordingActor::default());
  let mailbox = Arc::new(factory.create_mailbox(1, actor, int_cmp).unwrap());

  mailbox.enqueue(Envelope::new(1)).unwrap();
  mailbox.enqueue(Envelope::new(2)).unwrap();
  mailbox.system_enqueue(SystemMessage::Terminate);
  mailbox.close();

  mailbox.clean_up();

  assert_eq!(*sink.user.lock().unwrap(), vec![1, 2]);
  assert_eq!(*sink.system.lock().unwrap(), vec!["Terminate".to_string()]);

  // idempotent: a second clean_up drains nothing further
  mailbox.clean_up();
  assert_eq!(sink.user.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn priority_queue_dequeues_in_comparator_order() {
  let dispatcher: Arc<dyn Dispatcher<i32>> = Arc::new(TokioDispatcher::new(10, None));
  let settings = MailboxSettings {
    queue_variant: QueueVariant::UnboundedPriority,
    capacity: None,
    push_timeout: None,
    throughput: 10,
    throughput_deadline_time: None,
  };
  let factory = MailboxFactory::new(settings, dispatcher, Arc::new(actuator_mailbox::dispatch::dead_letter::LoggingDeadLetterSink));
  let actor = Arc::new(RecordingActor::default());
  let mailbox = Arc::new(factory.create_mailbox(1, actor.clone(), int_cmp).unwrap());

  for v in [5, 1, 3, 1] {
    mailbox.enqueue(Envelope::new(v)).unwrap();
  }

  mailbox.clone().run().await;

  assert_eq!(actor.trace(), vec!["invoke(1)", "invoke(1)", "invoke(3)", "invoke(5)"]);
}

#[tokio::test]
async fn run_on_closed_mailbox_invokes_nothing() {
  let dispatcher: Arc<dyn Dispatcher<i32>> = Arc::new(TokioDispatcher::new(10, None));
  let factory = MailboxFactory::new(MailboxSettings::default_values(), dispatcher, Arc::new(actuator_mailbox::dispatch::dead_letter::LoggingDeadLetterSink));
  let actor = Arc::new(RecordingActor::default());
  let mailbox = Arc::new(factory.create_mailbox(1, actor.clone(), int_cmp).unwrap());

  mailbox.enqueue(Envelope::new(1)).unwrap();
  mailbox.close();

  mailbox.clone().run().await;

  assert!(actor.trace().is_empty());
  assert!(mailbox.is_closed());
}

#[tokio::test]
async fn throughput_bound_caps_invokes_per_run() {
  let dispatcher: Arc<dyn Dispatcher<i32>> = Arc::new(TokioDispatcher::new(2, None));
  let factory = MailboxFactory::new(MailboxSettings::default_values(), dispatcher, Arc::new(actuator_mailbox::dispatch::dead_letter::LoggingDeadLetterSink));
  let actor = Arc::new(RecordingActor::default());
  let mailbox = Arc::new(factory.create_mailbox(1, actor.clone(), int_cmp).unwrap());

  for v in 1..=5 {
    mailbox.enqueue(Envelope::new(v)).unwrap();
  }

  mailbox.clone().run().await;

  assert_eq!(actor.trace(), vec!["invoke(1)", "invoke(2)"]);
  assert!(mailbox.can_be_scheduled_for_execution(false, false));
}
