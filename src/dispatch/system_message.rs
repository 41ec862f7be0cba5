use std::fmt;

/// A lifecycle control message, strictly prioritized over user envelopes.
///
/// This is a deliberately small set compared to the richer lineage this
/// crate's queue machinery is grounded on; actor-path watching, supervision
/// and failure propagation are out of scope here and are represented only as
/// opaque payloads the surrounding actor runtime attaches meaning to.
#[derive(Debug, Clone)]
pub enum SystemMessage {
  Create,
  Suspend,
  Resume,
  Terminate,
  Watch,
}

impl fmt::Display for SystemMessage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:?}", self)
  }
}
