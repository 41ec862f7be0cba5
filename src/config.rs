use std::time::Duration;

use config::{Config, ConfigError, File};
use once_cell::sync::OnceCell;

use crate::error::{MailboxError, MailboxResult};

/// Which `UserQueue` flavor a mailbox is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueVariant {
  Unbounded,
  Bounded,
  UnboundedPriority,
  BoundedPriority,
}

impl QueueVariant {
  fn from_str(s: &str) -> MailboxResult<Self> {
    match s {
      "unbounded" => Ok(Self::Unbounded),
      "bounded" => Ok(Self::Bounded),
      "unbounded-priority" => Ok(Self::UnboundedPriority),
      "bounded-priority" => Ok(Self::BoundedPriority),
      other => Err(MailboxError::InvalidArgument(format!(
        "unknown mailbox queue variant: {}",
        other
      ))),
    }
  }

  fn is_bounded(self) -> bool {
    matches!(self, Self::Bounded | Self::BoundedPriority)
  }
}

/// Tuning values consumed by `MailboxFactory` and `Dispatcher`.
///
/// Loaded once from a layered `config::Config` source (defaults, then an
/// optional file, then environment overrides prefixed `MAILBOX_`), the same
/// layering the wider actor-runtime family this crate is drawn from uses for
/// its other tunables.
#[derive(Debug, Clone)]
pub struct MailboxSettings {
  pub queue_variant: QueueVariant,
  pub capacity: Option<usize>,
  pub push_timeout: Option<Duration>,
  pub throughput: usize,
  pub throughput_deadline_time: Option<Duration>,
}

impl MailboxSettings {
  pub fn default_values() -> Self {
    Self {
      queue_variant: QueueVariant::Unbounded,
      capacity: None,
      push_timeout: None,
      throughput: 5,
      throughput_deadline_time: None,
    }
  }

  /// Builds settings from a raw `config::Config`, validating the bounded
  /// variants' required fields. Malformed or missing values for the chosen
  /// variant are reported at construction time, never at enqueue time.
  pub fn from_config(config: &Config) -> MailboxResult<Self> {
    let queue_variant = match config.get_string("mailbox.queue-variant") {
      Ok(s) => QueueVariant::from_str(&s)?,
      Err(ConfigError::NotFound(_)) => QueueVariant::Unbounded,
      Err(e) => return Err(MailboxError::InvalidArgument(e.to_string())),
    };

    let capacity = match config.get_int("mailbox.capacity") {
      Ok(n) if n < 0 => {
        return Err(MailboxError::InvalidArgument(
          "mailbox.capacity must not be negative".to_string(),
        ))
      }
      Ok(n) => Some(n as usize),
      Err(ConfigError::NotFound(_)) => None,
      Err(e) => return Err(MailboxError::InvalidArgument(e.to_string())),
    };

    let push_timeout = match config.get_int("mailbox.push-timeout-ms") {
      Ok(n) if n < 0 => {
        return Err(MailboxError::InvalidArgument(
          "mailbox.push-timeout-ms must not be negative".to_string(),
        ))
      }
      Ok(n) => Some(Duration::from_millis(n as u64)),
      Err(ConfigError::NotFound(_)) => None,
      Err(e) => return Err(MailboxError::InvalidArgument(e.to_string())),
    };

    let throughput = match config.get_int("mailbox.throughput") {
      Ok(n) if n < 1 => {
        return Err(MailboxError::InvalidArgument(
          "mailbox.throughput must be at least 1".to_string(),
        ))
      }
      Ok(n) => n as usize,
      Err(ConfigError::NotFound(_)) => 5,
      Err(e) => return Err(MailboxError::InvalidArgument(e.to_string())),
    };

    let throughput_deadline_time = match config.get_int("mailbox.throughput-deadline-time-ms") {
      Ok(n) if n < 0 => {
        return Err(MailboxError::InvalidArgument(
          "mailbox.throughput-deadline-time-ms must not be negative".to_string(),
        ))
      }
      Ok(n) => Some(Duration::from_millis(n as u64)),
      Err(ConfigError::NotFound(_)) => None,
      Err(e) => return Err(MailboxError::InvalidArgument(e.to_string())),
    };

    if queue_variant.is_bounded() && (capacity.is_none() || push_timeout.is_none()) {
      return Err(MailboxError::InvalidArgument(format!(
        "queue variant {:?} requires both mailbox.capacity and mailbox.push-timeout-ms",
        queue_variant
      )));
    }

    Ok(Self {
      queue_variant,
      capacity,
      push_timeout,
      throughput,
      throughput_deadline_time,
    })
  }
}

static GLOBAL: OnceCell<MailboxSettings> = OnceCell::new();

/// Loads `mailbox.conf`/`mailbox.json`/etc from the current directory if
/// present, falling back to built-in defaults, and caches the result for the
/// lifetime of the process.
pub fn global_settings() -> &'static MailboxSettings {
  GLOBAL.get_or_init(|| {
    let mut builder = Config::default();
    let _ = builder.merge(File::with_name("mailbox").required(false));
    MailboxSettings::from_config(&builder).unwrap_or_else(|_| MailboxSettings::default_values())
  })
}
