use crate::job::JobStatus;
use crate::printer::PrinterStatus;

/// Notifications emitted exactly once per state transition described in
/// the component design. Consumers (the REPL, tests) observe the
/// spooler's behavior only through this sink.
pub trait EventSink {
    fn cmd_ok(&mut self);
    fn cmd_error(&mut self, reason: &str);
    fn printer_defined(&mut self, id: usize, name: &str, type_name: &str);
    fn printer_status(&mut self, id: usize, name: &str, status: PrinterStatus);
    fn job_created(&mut self, id: usize, input_path: &str, type_name: &str);
    fn job_status(&mut self, id: usize, status: JobStatus);
    fn job_started(&mut self, id: usize, printer_name: &str, argv: &[Vec<String>]);
    fn job_finished(&mut self, id: usize, exit_code: i32);
    fn job_aborted(&mut self, id: usize, signal: Option<i32>);
    fn job_deleted(&mut self, id: usize);
}

/// Production sink: every event is logged through the `log` facade rather
/// than printed directly, so the event stream doubles as the operator's
/// audit trail regardless of terminal output.
#[derive(Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn cmd_ok(&mut self) {
        log::info!("cmd_ok");
    }

    fn cmd_error(&mut self, reason: &str) {
        log::warn!("cmd_error: {reason}");
    }

    fn printer_defined(&mut self, id: usize, name: &str, type_name: &str) {
        log::info!("printer_defined: id={id} name={name} type={type_name}");
    }

    fn printer_status(&mut self, id: usize, name: &str, status: PrinterStatus) {
        log::info!("printer_status: id={id} name={name} status={status:?}");
    }

    fn job_created(&mut self, id: usize, input_path: &str, type_name: &str) {
        log::info!("job_created: id={id} input={input_path} type={type_name}");
    }

    fn job_status(&mut self, id: usize, status: JobStatus) {
        log::info!("job_status: id={id} status={status:?}");
    }

    fn job_started(&mut self, id: usize, printer_name: &str, argv: &[Vec<String>]) {
        log::info!("job_started: id={id} printer={printer_name} chain={argv:?}");
    }

    fn job_finished(&mut self, id: usize, exit_code: i32) {
        log::info!("job_finished: id={id} exit_code={exit_code}");
    }

    fn job_aborted(&mut self, id: usize, signal: Option<i32>) {
        log::info!("job_aborted: id={id} signal={signal:?}");
    }

    fn job_deleted(&mut self, id: usize) {
        log::info!("job_deleted: id={id}");
    }
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CmdOk,
    CmdError(String),
    PrinterDefined(usize, String, String),
    PrinterStatus(usize, String, PrinterStatus),
    JobCreated(usize, String, String),
    JobStatus(usize, JobStatus),
    JobStarted(usize, String),
    JobFinished(usize, i32),
    JobAborted(usize, Option<i32>),
    JobDeleted(usize),
}

/// Test-only sink: records every call for assertion instead of printing,
/// the same capture-not-print shape the teacher uses for builtin output.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingEventSink {
    pub events: Vec<Event>,
}

#[cfg(test)]
impl EventSink for RecordingEventSink {
    fn cmd_ok(&mut self) {
        self.events.push(Event::CmdOk);
    }

    fn cmd_error(&mut self, reason: &str) {
        self.events.push(Event::CmdError(reason.to_string()));
    }

    fn printer_defined(&mut self, id: usize, name: &str, type_name: &str) {
        self.events
            .push(Event::PrinterDefined(id, name.to_string(), type_name.to_string()));
    }

    fn printer_status(&mut self, id: usize, name: &str, status: PrinterStatus) {
        self.events
            .push(Event::PrinterStatus(id, name.to_string(), status));
    }

    fn job_created(&mut self, id: usize, input_path: &str, type_name: &str) {
        self.events
            .push(Event::JobCreated(id, input_path.to_string(), type_name.to_string()));
    }

    fn job_status(&mut self, id: usize, status: JobStatus) {
        self.events.push(Event::JobStatus(id, status));
    }

    fn job_started(&mut self, id: usize, printer_name: &str, _argv: &[Vec<String>]) {
        self.events.push(Event::JobStarted(id, printer_name.to_string()));
    }

    fn job_finished(&mut self, id: usize, exit_code: i32) {
        self.events.push(Event::JobFinished(id, exit_code));
    }

    fn job_aborted(&mut self, id: usize, signal: Option<i32>) {
        self.events.push(Event::JobAborted(id, signal));
    }

    fn job_deleted(&mut self, id: usize) {
        self.events.push(Event::JobDeleted(id));
    }
}
