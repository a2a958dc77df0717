//! Stand-in backend for targets with neither `poll(2)` nor `select(2)`.
//! It keeps `Poll` constructible everywhere; every wait fails.

use libc::c_int;

use super::backend::Backend;
use super::table::PollTable;
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, Default)]
pub struct UnsupportedBackend;

impl Backend for UnsupportedBackend {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn wait(&self, _table: &mut PollTable, _timeout_ms: c_int) -> Result<usize> {
        Err(Error::NotImplemented)
    }
}
