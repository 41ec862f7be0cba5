use thiserror::Error;

/// Error surface exposed by the mailbox core.
///
/// Handler exceptions raised by `invoke`/`systemInvoke` are deliberately not
/// represented here: user-message failures propagate to the caller of
/// `Mailbox::run`, and system-message failures are caught, logged and
/// re-raised from within `processAllSystemMessages` (see `Mailbox::run`).
#[derive(Debug, Error)]
pub enum MailboxError {
  #[error("Couldn't enqueue message {envelope} to {mailbox}")]
  EnqueueFailure { envelope: String, mailbox: String },

  #[error("invalid argument: {0}")]
  InvalidArgument(String),
}

pub type MailboxResult<T> = Result<T, MailboxError>;
