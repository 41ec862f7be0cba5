use std::fmt::Debug;

use crate::dispatch::envelope::Envelope;
use crate::dispatch::system_message::SystemMessage;

/// Destination for messages that can no longer be delivered because their
/// mailbox has closed. Never rejects.
pub trait DeadLetterSink<M>: Send + Sync {
  fn enqueue(&self, envelope: Envelope<M>);
  fn system_enqueue(&self, message: SystemMessage);
}

/// Default sink: logs each dropped message at `warn` and otherwise discards
/// it. Suitable as the crate's fallback when no sink is wired in by the
/// surrounding actor runtime.
#[derive(Debug, Default)]
pub struct LoggingDeadLetterSink;

impl<M: Debug> DeadLetterSink<M> for LoggingDeadLetterSink {
  fn enqueue(&self, envelope: Envelope<M>) {
    log::warn!("dead letter: {}", envelope);
  }

  fn system_enqueue(&self, message: SystemMessage) {
    log::warn!("dead letter (system): {}", message);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn logging_sink_accepts_everything() {
    let sink = LoggingDeadLetterSink;
    sink.enqueue(Envelope::new("hello"));
    sink.system_enqueue(SystemMessage::Terminate);
  }
}
