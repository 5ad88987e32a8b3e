use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::error::Result;
use crate::events::EventSink;
use crate::job::JobStatus;
use crate::pipeline::{self, PipelineEvent};
use crate::printer::PrinterStatus;
use crate::scheduler;
use crate::spooler::Spooler;

/// Set by the `SIGCHLD` handler, which does nothing else — the handler
/// itself must stay async-signal-safe. The spooler polls this flag at
/// every safe point (before blocking for input, and after each command).
pub static CHILD_EVENT_PENDING: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigchld(_: libc::c_int) {
    CHILD_EVENT_PENDING.store(true, Ordering::SeqCst);
}

/// Install the `SIGCHLD` handler. Must be called once at startup, before
/// any pipeline is spawned.
pub fn install() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigchld),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    // SAFETY: called once during single-threaded startup.
    unsafe { signal::sigaction(Signal::SIGCHLD, &action) }
        .map_err(|e| std::io::Error::from(e).into())
        .map(|_| ())
}

/// Drain every pending child-status change, updating job/printer state,
/// then re-run the scheduler so printers just freed pick up pending jobs.
/// A no-op if the flag was not set.
pub fn drain_child_events(spooler: &mut Spooler) {
    if !CHILD_EVENT_PENDING.swap(false, Ordering::SeqCst) {
        return;
    }

    loop {
        let Some(event) = pipeline::poll_pipeline(-1) else {
            break;
        };

        let pid = match event {
            PipelineEvent::Stopped(p)
            | PipelineEvent::Continued(p)
            | PipelineEvent::Exited(p, _)
            | PipelineEvent::Signalled(p, _) => p,
        };
        let Some(job_id) = spooler.jobs.find_by_pgid(pid) else {
            continue;
        };

        apply_event(spooler, job_id, event);
    }

    scheduler::try_schedule(spooler);
}

fn apply_event(spooler: &mut Spooler, job_id: usize, event: PipelineEvent) {
    match event {
        PipelineEvent::Stopped(_) => {
            spooler.jobs.set_status(job_id, JobStatus::Paused);
            spooler.sink.job_status(job_id, JobStatus::Paused);
        }
        PipelineEvent::Continued(_) => {
            spooler.jobs.set_status(job_id, JobStatus::Running);
            spooler.sink.job_status(job_id, JobStatus::Running);
        }
        PipelineEvent::Exited(_, code) => {
            // A non-zero supervisor exit is treated as Aborted, not
            // Finished — see SPEC_FULL.md §9.1.
            let (new_status, finished_ok) = if code == 0 {
                (JobStatus::Finished, true)
            } else {
                (JobStatus::Aborted, false)
            };
            finish_job(spooler, job_id, new_status);
            if finished_ok {
                spooler.sink.job_finished(job_id, code);
            } else {
                spooler.sink.job_aborted(job_id, None);
            }
        }
        PipelineEvent::Signalled(_, sig) => {
            finish_job(spooler, job_id, JobStatus::Aborted);
            spooler.sink.job_aborted(job_id, Some(sig));
        }
    }
}

fn finish_job(spooler: &mut Spooler, job_id: usize, status: JobStatus) {
    spooler.jobs.set_status(job_id, status);
    spooler.sink.job_status(job_id, status);
    if let Some(printer_id) = spooler.jobs.get(job_id).and_then(|j| j.assigned_printer) {
        spooler.printers.set_status(printer_id, PrinterStatus::Idle);
        if let Some(printer) = spooler.printers.at(printer_id) {
            let name = printer.name.clone();
            spooler.sink.printer_status(printer_id, &name, PrinterStatus::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::PrinterEndpoint;
    use crate::events::RecordingEventSink;
    use crate::spooler::Spooler;
    use std::fs::File;
    use std::io;
    use std::time::Duration;

    struct NullEndpoint;
    impl PrinterEndpoint for NullEndpoint {
        fn connect(&self, _printer_name: &str, _type_name: &str) -> io::Result<File> {
            Err(io::Error::new(io::ErrorKind::Other, "unused in tests"))
        }
    }

    /// A `Spooler` with one `txt` printer `Busy` on one `Running` job,
    /// standing in for whatever `scheduler::start_pipeline` would have set
    /// up had a real pipeline actually been spawned.
    fn spooler_with_running_job() -> (Spooler, usize, usize) {
        let mut spooler = Spooler::new(
            Box::new(RecordingEventSink::default()),
            Box::new(NullEndpoint),
            8,
            8,
            Duration::from_secs(10),
        );
        let txt = spooler.types.declare("txt");
        let printer_id = spooler.printers.declare("alice", txt).unwrap();
        spooler.printers.set_status(printer_id, PrinterStatus::Busy);
        let job_id = spooler.jobs.insert("a.txt".to_string(), txt).unwrap();
        let job = spooler.jobs.get_mut(job_id).unwrap();
        job.assigned_printer = Some(printer_id);
        job.supervisor_pgid = Some(4242);
        job.status = JobStatus::Running;
        (spooler, job_id, printer_id)
    }

    #[test]
    fn stopped_event_pauses_job() {
        let (mut spooler, job_id, _) = spooler_with_running_job();
        apply_event(&mut spooler, job_id, PipelineEvent::Stopped(4242));
        assert_eq!(spooler.jobs.get(job_id).unwrap().status, JobStatus::Paused);
    }

    #[test]
    fn continued_event_resumes_job() {
        let (mut spooler, job_id, _) = spooler_with_running_job();
        spooler.jobs.set_status(job_id, JobStatus::Paused);
        apply_event(&mut spooler, job_id, PipelineEvent::Continued(4242));
        assert_eq!(spooler.jobs.get(job_id).unwrap().status, JobStatus::Running);
    }

    #[test]
    fn zero_exit_finishes_job_and_frees_printer() {
        let (mut spooler, job_id, printer_id) = spooler_with_running_job();
        apply_event(&mut spooler, job_id, PipelineEvent::Exited(4242, 0));
        assert_eq!(spooler.jobs.get(job_id).unwrap().status, JobStatus::Finished);
        assert_eq!(spooler.printers.at(printer_id).unwrap().status, PrinterStatus::Idle);
    }

    /// SPEC_FULL.md §9.1: a non-zero supervisor exit is Aborted, not Finished.
    #[test]
    fn nonzero_exit_aborts_job_and_frees_printer() {
        let (mut spooler, job_id, printer_id) = spooler_with_running_job();
        apply_event(&mut spooler, job_id, PipelineEvent::Exited(4242, 1));
        assert_eq!(spooler.jobs.get(job_id).unwrap().status, JobStatus::Aborted);
        assert_eq!(spooler.printers.at(printer_id).unwrap().status, PrinterStatus::Idle);
    }

    #[test]
    fn signalled_aborts_job_and_frees_printer() {
        let (mut spooler, job_id, printer_id) = spooler_with_running_job();
        apply_event(&mut spooler, job_id, PipelineEvent::Signalled(4242, 15));
        assert_eq!(spooler.jobs.get(job_id).unwrap().status, JobStatus::Aborted);
        assert_eq!(spooler.printers.at(printer_id).unwrap().status, PrinterStatus::Idle);
    }
}
