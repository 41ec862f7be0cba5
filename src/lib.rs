pub mod config;
pub mod dispatch;
pub mod error;

#[macro_use]
extern crate once_cell;

#[cfg(test)]
extern crate env_logger as logger;

#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
  let _ = logger::builder().is_test(true).try_init();
}
