use std::io::Write;

use crate::error::SpoolerError;
use crate::events::EventSink;
use crate::job::JobStatus;
use crate::pipeline;
use crate::printer::PrinterStatus;
use crate::scheduler;
use crate::spooler::Spooler;
use crate::sweeper;

const MAX_TOKENS: usize = 32;
const SUMMARY: &str =
    "Commands are: help quit type printer conversion printers jobs print cancel disable enable pause resume";

/// Plain whitespace split, capped at 32 tokens, no quoting — deliberately
/// simpler than a shell's quote-aware tokenizer since the command language
/// has no quoting construct.
pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace()
        .take(MAX_TOKENS)
        .map(str::to_string)
        .collect()
}

pub enum Outcome {
    Continue,
    Quit,
}

/// Dispatch one already-tokenized command line, writing user-facing output
/// to `out` and notifying `spooler.sink` of every state transition. Always
/// followed by a reaper drain and expiry sweep at the call site.
pub fn dispatch(spooler: &mut Spooler, out: &mut dyn Write, tokens: &[String]) -> Outcome {
    if tokens.is_empty() {
        return Outcome::Continue;
    }
    let cmd = tokens[0].as_str();
    let argc = tokens.len();

    match cmd {
        "help" => {
            if argc != 1 {
                wrong_args(out, &mut spooler.sink, "help", argc, 0);
            } else {
                let _ = writeln!(out, "{SUMMARY}");
                spooler.sink.cmd_ok();
            }
        }
        "quit" => {
            spooler.sink.cmd_ok();
            return Outcome::Quit;
        }
        "type" => cmd_type(spooler, out, tokens),
        "conversion" => cmd_conversion(spooler, out, tokens),
        "printer" => cmd_printer(spooler, out, tokens),
        "enable" => cmd_enable(spooler, out, tokens),
        "disable" => cmd_disable(spooler, out, tokens),
        "printers" => cmd_printers(spooler, out),
        "print" => cmd_print(spooler, out, tokens),
        "jobs" => cmd_jobs(spooler, out),
        "cancel" => cmd_cancel(spooler, out, tokens),
        "pause" => cmd_pause(spooler, out, tokens),
        "resume" => cmd_resume(spooler, out, tokens),
        other => {
            let err = SpoolerError::UnrecognizedCommand(other.to_string());
            let _ = writeln!(out, "{err}");
            spooler.sink.cmd_error(&err.to_string());
        }
    }

    Outcome::Continue
}

fn wrong_args(out: &mut dyn Write, sink: &mut dyn EventSink, cmd: &str, given: usize, required: usize) {
    let err = SpoolerError::InvalidArgs {
        command: cmd.to_string(),
        given: given.saturating_sub(1),
        required,
    };
    let _ = writeln!(out, "{err}");
    sink.cmd_error(&err.to_string());
}

fn cmd_type(spooler: &mut Spooler, out: &mut dyn Write, tokens: &[String]) {
    if tokens.len() != 2 {
        wrong_args(out, &mut spooler.sink, "type", tokens.len(), 1);
        return;
    }
    spooler.types.declare(&tokens[1]);
    spooler.sink.cmd_ok();
}

fn cmd_conversion(spooler: &mut Spooler, out: &mut dyn Write, tokens: &[String]) {
    if tokens.len() < 4 {
        wrong_args(out, &mut spooler.sink, "conversion", tokens.len(), 3);
        return;
    }
    let from_name = &tokens[1];
    let to_name = &tokens[2];
    let (from, to) = match (spooler.types.find_type(from_name), spooler.types.find_type(to_name)) {
        (Some(f), Some(t)) => (f, t),
        (None, _) => {
            let _ = writeln!(out, "Undeclared file type: {from_name}");
            spooler.sink.cmd_error("conversion");
            let _ = writeln!(out, "Command error: conversion (failed)");
            return;
        }
        (_, None) => {
            let _ = writeln!(out, "Undeclared file type: {to_name}");
            spooler.sink.cmd_error("conversion");
            let _ = writeln!(out, "Command error: conversion (failed)");
            return;
        }
    };
    let argv: Vec<String> = tokens[3..].to_vec();
    spooler.types.add_conversion(from, to, argv);
    spooler.sink.cmd_ok();
}

fn cmd_printer(spooler: &mut Spooler, out: &mut dyn Write, tokens: &[String]) {
    if tokens.len() != 3 {
        wrong_args(out, &mut spooler.sink, "printer", tokens.len(), 2);
        return;
    }
    let name = &tokens[1];
    let type_name = &tokens[2];
    let Some(type_id) = spooler.types.find_type(type_name) else {
        let _ = writeln!(out, "Unknown file type: {type_name}");
        spooler.sink.cmd_error("printer");
        let _ = writeln!(out, "Command error: printer (failed)");
        return;
    };

    match spooler.printers.declare(name, type_id) {
        Ok(id) => {
            let _ = writeln!(
                out,
                "PRINTER: id={id}, name={name}, type={type_name}, status={}",
                status_name(PrinterStatus::Disabled)
            );
            spooler.sink.printer_defined(id, name, type_name);
            spooler.sink.cmd_ok();
        }
        Err(_) => {
            spooler.sink.cmd_error("printer");
            let _ = writeln!(out, "Command error: printer (failed)");
        }
    }
}

fn cmd_enable(spooler: &mut Spooler, out: &mut dyn Write, tokens: &[String]) {
    if tokens.len() != 2 {
        wrong_args(out, &mut spooler.sink, "enable", tokens.len(), 1);
        return;
    }
    let name = &tokens[1];
    let Some(id) = spooler.printers.find_by_name(name) else {
        spooler.sink.cmd_error("enable");
        let _ = writeln!(out, "Command error: enable (no printer)");
        return;
    };
    spooler.printers.set_status(id, PrinterStatus::Idle);
    spooler.sink.printer_status(id, name, PrinterStatus::Idle);
    let type_name = spooler.types.name_of(spooler.printers.at(id).unwrap().native_type).to_string();
    let _ = writeln!(
        out,
        "PRINTER: id={id}, name={name}, type={type_name}, status={}",
        status_name(PrinterStatus::Idle)
    );
    scheduler::try_schedule(spooler);
    spooler.sink.cmd_ok();
}

/// `disable` — implemented per SPEC_FULL.md §9.2: `Idle -> Disabled` only.
/// A printer currently `Busy` cannot be disabled out from under its job.
fn cmd_disable(spooler: &mut Spooler, out: &mut dyn Write, tokens: &[String]) {
    if tokens.len() != 2 {
        wrong_args(out, &mut spooler.sink, "disable", tokens.len(), 1);
        return;
    }
    let name = &tokens[1];
    let Some(id) = spooler.printers.find_by_name(name) else {
        spooler.sink.cmd_error("disable");
        let _ = writeln!(out, "Command error: disable (no printer)");
        return;
    };
    if spooler.printers.at(id).unwrap().status != PrinterStatus::Idle {
        spooler.sink.cmd_error("disable");
        let _ = writeln!(out, "Command error: disable (printer busy)");
        return;
    }
    spooler.printers.set_status(id, PrinterStatus::Disabled);
    spooler.sink.printer_status(id, name, PrinterStatus::Disabled);
    let type_name = spooler.types.name_of(spooler.printers.at(id).unwrap().native_type).to_string();
    let _ = writeln!(
        out,
        "PRINTER: id={id}, name={name}, type={type_name}, status={}",
        status_name(PrinterStatus::Disabled)
    );
    spooler.sink.cmd_ok();
}

fn cmd_printers(spooler: &mut Spooler, out: &mut dyn Write) {
    for (id, p) in spooler.printers.iter() {
        let type_name = spooler.types.name_of(p.native_type);
        let _ = writeln!(
            out,
            "PRINTER: id={id}, name={}, type={type_name}, status={}",
            p.name,
            status_name(p.status)
        );
    }
    spooler.sink.cmd_ok();
}

fn cmd_print(spooler: &mut Spooler, out: &mut dyn Write, tokens: &[String]) {
    if tokens.len() < 2 || tokens.len() > 3 {
        wrong_args(out, &mut spooler.sink, "print", tokens.len(), 1);
        return;
    }
    let path = &tokens[1];
    let explicit_printer = tokens.get(2).map(String::as_str);
    match scheduler::submit(spooler, path, explicit_printer) {
        Ok(_) => spooler.sink.cmd_ok(),
        Err(e) => {
            let _ = writeln!(out, "Command error: print (failed): {e}");
            spooler.sink.cmd_error(&e.to_string());
        }
    }
}

fn cmd_jobs(spooler: &mut Spooler, out: &mut dyn Write) {
    for id in spooler.jobs.ids_sorted() {
        let job = spooler.jobs.get(id).unwrap();
        let _ = writeln!(out, "JOB[{id}]: status={:?}", job.status);
        spooler.sink.job_status(id, job.status);
    }
    spooler.sink.cmd_ok();
}

fn cmd_cancel(spooler: &mut Spooler, out: &mut dyn Write, tokens: &[String]) {
    if tokens.len() != 2 {
        wrong_args(out, &mut spooler.sink, "cancel", tokens.len(), 1);
        return;
    }
    let Ok(id) = tokens[1].parse::<usize>() else {
        let err = SpoolerError::BadId(tokens[1].clone());
        let _ = writeln!(out, "Error: {err}");
        spooler.sink.cmd_error(&err.to_string());
        return;
    };
    match cancel_job(spooler, id) {
        Ok(()) => spooler.sink.cmd_ok(),
        Err(e) => {
            let _ = writeln!(out, "Error: Failed to cancel job {id}: {e}");
            spooler.sink.cmd_error(&e.to_string());
        }
    }
}

fn cmd_pause(spooler: &mut Spooler, out: &mut dyn Write, tokens: &[String]) {
    if tokens.len() != 2 {
        wrong_args(out, &mut spooler.sink, "pause", tokens.len(), 1);
        return;
    }
    let Ok(id) = tokens[1].parse::<usize>() else {
        let err = SpoolerError::BadId(tokens[1].clone());
        let _ = writeln!(out, "Error: {err}");
        spooler.sink.cmd_error(&err.to_string());
        return;
    };
    match pause_job(spooler, id) {
        Ok(()) => spooler.sink.cmd_ok(),
        Err(e) => {
            let _ = writeln!(out, "Error: Failed to pause job {id}: {e}");
            spooler.sink.cmd_error(&e.to_string());
        }
    }
}

fn cmd_resume(spooler: &mut Spooler, out: &mut dyn Write, tokens: &[String]) {
    if tokens.len() != 2 {
        wrong_args(out, &mut spooler.sink, "resume", tokens.len(), 1);
        return;
    }
    let Ok(id) = tokens[1].parse::<usize>() else {
        let err = SpoolerError::BadId(tokens[1].clone());
        let _ = writeln!(out, "Error: {err}");
        spooler.sink.cmd_error(&err.to_string());
        return;
    };
    match resume_job(spooler, id) {
        Ok(()) => spooler.sink.cmd_ok(),
        Err(e) => {
            let _ = writeln!(out, "Error: Failed to resume job {id}: {e}");
            spooler.sink.cmd_error(&e.to_string());
        }
    }
}

fn cancel_job(spooler: &mut Spooler, id: usize) -> crate::error::Result<()> {
    let job = spooler
        .jobs
        .get(id)
        .ok_or_else(|| SpoolerError::UnknownIdentifier("job", id.to_string()))?;
    match job.status {
        JobStatus::Created => {
            spooler.jobs.set_status(id, JobStatus::Aborted);
            spooler.sink.job_status(id, JobStatus::Aborted);
            Ok(())
        }
        JobStatus::Running => {
            let pgid = job.supervisor_pgid.unwrap();
            pipeline::cancel_group(pgid, false)
        }
        JobStatus::Paused => {
            let pgid = job.supervisor_pgid.unwrap();
            pipeline::cancel_group(pgid, true)
        }
        JobStatus::Finished | JobStatus::Aborted => {
            Err(SpoolerError::StateViolation(format!("job {id} is already terminal")))
        }
    }
}

fn pause_job(spooler: &mut Spooler, id: usize) -> crate::error::Result<()> {
    let job = spooler
        .jobs
        .get(id)
        .ok_or_else(|| SpoolerError::UnknownIdentifier("job", id.to_string()))?;
    if job.status != JobStatus::Running {
        return Err(SpoolerError::StateViolation(format!("job {id} is not running")));
    }
    pipeline::pause_group(job.supervisor_pgid.unwrap())
}

fn resume_job(spooler: &mut Spooler, id: usize) -> crate::error::Result<()> {
    let job = spooler
        .jobs
        .get(id)
        .ok_or_else(|| SpoolerError::UnknownIdentifier("job", id.to_string()))?;
    if job.status != JobStatus::Paused {
        return Err(SpoolerError::StateViolation(format!("job {id} is not paused")));
    }
    pipeline::resume_group(job.supervisor_pgid.unwrap())
}

fn status_name(status: PrinterStatus) -> &'static str {
    match status {
        PrinterStatus::Disabled => "disabled",
        PrinterStatus::Idle => "idle",
        PrinterStatus::Busy => "busy",
    }
}

/// Run the expiry sweeper; exposed here so the main loop can call it after
/// every command without reaching into `sweeper` directly.
pub fn sweep(spooler: &mut Spooler) {
    sweeper::sweep_expired(spooler);
}
