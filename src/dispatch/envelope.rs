use std::fmt;

/// A user message paired with its sender, as handed to `Mailbox::enqueue`.
///
/// The sender is an opaque identity string here; the surrounding actor
/// system is the one that resolves it into a real `ActorRef`.
#[derive(Debug, Clone)]
pub struct Envelope<M> {
  pub message: M,
  pub sender: Option<String>,
}

impl<M> Envelope<M> {
  pub fn new(message: M) -> Self {
    Self { message, sender: None }
  }

  pub fn with_sender(message: M, sender: impl Into<String>) -> Self {
    Self {
      message,
      sender: Some(sender.into()),
    }
  }
}

impl<M: fmt::Debug> fmt::Display for Envelope<M> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.sender {
      Some(s) => write!(f, "Envelope {{ message: {:?}, sender: {} }}", self.message, s),
      None => write!(f, "Envelope {{ message: {:?}, sender: none }}", self.message),
    }
  }
}
