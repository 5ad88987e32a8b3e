use std::ffi::CString;
use std::fs::File;
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};

use nix::sys::signal::{self, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use crate::error::{Result, SpoolerError};
use crate::types::ConverterInvocation;

/// Outcome of reaping a pipeline supervisor, carrying the pid the status
/// change was observed on (`poll_pipeline(-1, ..)` can report any child).
pub enum PipelineEvent {
    Stopped(i32),
    Continued(i32),
    Exited(i32, i32),
    Signalled(i32, i32),
}

/// Fork a supervisor process that establishes a new process group and, in
/// turn, forks one stage child per entry in `chain` (or a single `/bin/cat`
/// passthrough stage if `chain` is empty), wiring them together with pipes.
/// The final stage's stdout is `printer_out`. Returns the supervisor's pid,
/// which equals its process-group id — the single handle the rest of the
/// spooler signals.
///
/// Every stage joins the supervisor's group by its id explicitly
/// (`setpgid(0, master_pgid)`) rather than the `setpgid(0, 0)` the
/// reference pipeline uses for every stage — see SPEC_FULL.md §9.4 for why
/// that would fragment a multi-stage pipeline into separate groups.
///
/// Process creation here uses raw `libc` calls directly rather than nix's
/// `unistd` wrappers: the supervisor must itself fork further children from
/// inside an already-forked child, which `std::process::Command::pre_exec`
/// cannot express, and the pipe/dup2/exec plumbing mirrors the reference
/// implementation closely enough that the raw calls are the clearest match.
pub fn spawn_pipeline(
    input_path: &str,
    chain: &[ConverterInvocation],
    printer_out: File,
) -> Result<i32> {
    // SAFETY: fork() is only ever called from this single-threaded REPL
    // process, before any additional threads exist.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(SpoolerError::Launch(std::io::Error::last_os_error()));
    }
    if pid == 0 {
        run_supervisor(input_path, chain, printer_out);
        unreachable!("run_supervisor always calls std::process::exit");
    }
    Ok(pid)
}

/// Runs entirely inside the forked supervisor process. Never returns: every
/// path ends in `std::process::exit`, since this branch must not unwind
/// back into the parent's call stack or run the parent's `Drop`s.
fn run_supervisor(input_path: &str, chain: &[ConverterInvocation], printer_out: File) -> ! {
    if unsafe { libc::setpgid(0, 0) } != 0 {
        std::process::exit(1);
    }
    let master_pgid = unsafe { libc::getpid() };

    let stages: Vec<Vec<String>> = if chain.is_empty() {
        vec![vec!["/bin/cat".to_string()]]
    } else {
        chain.iter().map(|c| c.argv.clone()).collect()
    };
    let num_stages = stages.len();

    let input_path = input_path.to_string();
    let printer_fd = printer_out.as_raw_fd();
    let mut prev_read_fd: Option<RawFd> = None;
    let mut failed = false;

    for (i, argv) in stages.iter().enumerate() {
        let is_last = i == num_stages - 1;

        let pipe_fds = if !is_last {
            let mut fds: [RawFd; 2] = [0, 0];
            if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
                std::process::exit(1);
            }
            Some((fds[0], fds[1]))
        } else {
            None
        };

        let stage_pid = unsafe { libc::fork() };
        if stage_pid < 0 {
            failed = true;
            break;
        }
        if stage_pid == 0 {
            run_stage(
                master_pgid,
                i,
                &input_path,
                prev_read_fd,
                pipe_fds,
                printer_fd,
                argv,
            );
            unreachable!("run_stage always execs or exits");
        }

        if let Some(fd) = prev_read_fd.take() {
            unsafe { libc::close(fd) };
        }
        if let Some((read_fd, write_fd)) = pipe_fds {
            unsafe { libc::close(write_fd) };
            prev_read_fd = Some(read_fd);
        }
    }

    drop(printer_out);

    loop {
        let mut status: libc::c_int = 0;
        let waited = unsafe { libc::wait(&mut status as *mut libc::c_int) };
        if waited < 0 {
            break; // ECHILD once every stage has been reaped
        }
        if libc::WIFEXITED(status) {
            if libc::WEXITSTATUS(status) != 0 {
                failed = true;
            }
        } else if libc::WIFSIGNALED(status) {
            failed = true;
        }
    }

    std::process::exit(if failed { 1 } else { 0 });
}

/// Runs inside a forked stage child. Wires stdin/stdout then execs the
/// converter; never returns.
fn run_stage(
    master_pgid: i32,
    stage_index: usize,
    input_path: &str,
    prev_read_fd: Option<RawFd>,
    pipe_fds: Option<(RawFd, RawFd)>,
    printer_fd: RawFd,
    argv: &[String],
) -> ! {
    if unsafe { libc::setpgid(0, master_pgid) } != 0 {
        std::process::exit(1);
    }

    if stage_index == 0 {
        match std::fs::File::open(input_path) {
            Ok(f) => {
                let fd = f.into_raw_fd();
                unsafe { libc::dup2(fd, libc::STDIN_FILENO) };
                unsafe { libc::close(fd) };
            }
            Err(_) => std::process::exit(1),
        }
    } else if let Some(fd) = prev_read_fd {
        unsafe { libc::dup2(fd, libc::STDIN_FILENO) };
        unsafe { libc::close(fd) };
    }

    if let Some((read_fd, write_fd)) = pipe_fds {
        // Not the last stage: write to the next pipe, and release the
        // inherited printer descriptor this stage never uses.
        unsafe { libc::close(read_fd) };
        unsafe { libc::dup2(write_fd, libc::STDOUT_FILENO) };
        unsafe { libc::close(write_fd) };
        unsafe { libc::close(printer_fd) };
    } else {
        unsafe { libc::dup2(printer_fd, libc::STDOUT_FILENO) };
        unsafe { libc::close(printer_fd) };
    }

    let Some((prog, args)) = argv.split_first() else {
        std::process::exit(1);
    };
    let Ok(c_prog) = CString::new(prog.as_str()) else {
        std::process::exit(1);
    };
    let c_args: Vec<CString> = std::iter::once(c_prog.clone())
        .chain(args.iter().filter_map(|a| CString::new(a.as_str()).ok()))
        .collect();
    let mut argv_ptrs: Vec<*const libc::c_char> = c_args.iter().map(|a| a.as_ptr()).collect();
    argv_ptrs.push(std::ptr::null());

    unsafe { libc::execvp(c_prog.as_ptr(), argv_ptrs.as_ptr()) };
    std::process::exit(1);
}

fn killpg(pgid: i32, sig: Signal) -> Result<()> {
    signal::killpg(Pid::from_raw(pgid), sig)
        .map_err(|e| SpoolerError::RuntimeFailure(format!("kill(-{pgid}, {sig:?}): {e}")))
}

pub fn pause_group(pgid: i32) -> Result<()> {
    killpg(pgid, Signal::SIGSTOP)
}

pub fn resume_group(pgid: i32) -> Result<()> {
    killpg(pgid, Signal::SIGCONT)
}

/// Cancel a pipeline. A stopped group must be continued before it can
/// observe the terminate signal.
pub fn cancel_group(pgid: i32, was_paused: bool) -> Result<()> {
    if was_paused {
        killpg(pgid, Signal::SIGCONT)?;
    }
    killpg(pgid, Signal::SIGTERM)
}

/// Non-blocking poll for a status change. `pid` is a specific supervisor
/// pid, or `-1` to report a change on any child (the reaper's drain loop
/// uses `-1` since it doesn't yet know which pipeline changed).
pub fn poll_pipeline(pid: i32) -> Option<PipelineEvent> {
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    match wait::waitpid(Pid::from_raw(pid), Some(flags)) {
        Ok(WaitStatus::Exited(p, code)) => Some(PipelineEvent::Exited(p.as_raw(), code)),
        Ok(WaitStatus::Signaled(p, sig, _)) => Some(PipelineEvent::Signalled(p.as_raw(), sig as i32)),
        Ok(WaitStatus::Stopped(p, _)) => Some(PipelineEvent::Stopped(p.as_raw())),
        Ok(WaitStatus::Continued(p)) => Some(PipelineEvent::Continued(p.as_raw())),
        _ => None,
    }
}
