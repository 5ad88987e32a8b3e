use std::time::Duration;

use crate::endpoint::PrinterEndpoint;
use crate::events::EventSink;
use crate::job::JobTable;
use crate::printer::PrinterRegistry;
use crate::types::TypeRegistry;

pub const DEFAULT_MAX_PRINTERS: usize = 32;
pub const DEFAULT_MAX_JOBS: usize = 256;

/// Owned spooler state, threaded through every operation rather than kept
/// in scattered statics (spec.md §9's "owned spooler state object" note).
/// `scheduler`, `reaper`, and `sweeper` are free functions over `&mut
/// Spooler` so each concern keeps its own module instead of one large impl.
pub struct Spooler {
    pub types: TypeRegistry,
    pub printers: PrinterRegistry,
    pub jobs: JobTable,
    pub sink: Box<dyn EventSink>,
    pub endpoint: Box<dyn PrinterEndpoint>,
    pub grace_window: Duration,
}

impl Spooler {
    pub fn new(
        sink: Box<dyn EventSink>,
        endpoint: Box<dyn PrinterEndpoint>,
        max_printers: usize,
        max_jobs: usize,
        grace_window: Duration,
    ) -> Self {
        Self {
            types: TypeRegistry::new(),
            printers: PrinterRegistry::new(max_printers),
            jobs: JobTable::new(max_jobs),
            sink,
            endpoint,
            grace_window,
        }
    }
}
