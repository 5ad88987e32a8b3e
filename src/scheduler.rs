use crate::error::{Result, SpoolerError};
use crate::events::EventSink;
use crate::job::JobStatus;
use crate::pipeline;
use crate::printer::PrinterStatus;
use crate::spooler::Spooler;

/// Submit `input_path` as a new job. If `explicit_printer` is given it must
/// currently be idle and compatible with the inferred source type; the
/// pipeline starts immediately. Otherwise the job is recorded as `Created`
/// and `try_schedule` is run so it may be matched right away.
pub fn submit(
    spooler: &mut Spooler,
    input_path: &str,
    explicit_printer: Option<&str>,
) -> Result<usize> {
    let Some(source_type) = spooler.types.infer_type(input_path) else {
        return Err(SpoolerError::UnknownIdentifier("type for file", input_path.to_string()));
    };

    if let Some(printer_name) = explicit_printer {
        let Some(printer_id) = spooler.printers.find_by_name(printer_name) else {
            return Err(SpoolerError::UnknownIdentifier("printer", printer_name.to_string()));
        };
        let printer = spooler.printers.at(printer_id).unwrap();
        if printer.status != PrinterStatus::Idle {
            return Err(SpoolerError::StateViolation(format!(
                "printer '{printer_name}' is not idle"
            )));
        }
        if !spooler.types.is_compatible(source_type, printer.native_type) {
            return Err(SpoolerError::StateViolation(format!(
                "printer '{printer_name}' cannot accept this file type"
            )));
        }

        let id = spooler.jobs.insert(input_path.to_string(), source_type)?;
        let type_name = spooler.types.name_of(source_type).to_string();
        spooler.sink.job_created(id, input_path, &type_name);
        spooler.sink.job_status(id, JobStatus::Created);

        if let Err(e) = start_pipeline(spooler, id, printer_id) {
            spooler.jobs.remove(id);
            return Err(e);
        }
        return Ok(id);
    }

    let id = spooler.jobs.insert(input_path.to_string(), source_type)?;
    let type_name = spooler.types.name_of(source_type).to_string();
    spooler.sink.job_created(id, input_path, &type_name);
    spooler.sink.job_status(id, JobStatus::Created);
    try_schedule(spooler);
    Ok(id)
}

/// Match every `Created` job against the first idle, compatible printer in
/// registry order. Direct type matches and conversion matches are both
/// eligible; a printer is simply the first one (by index) that can accept
/// the job's source type, mirroring `select_compatible_printer`'s
/// per-printer direct-then-conversion check.
pub fn try_schedule(spooler: &mut Spooler) {
    let pending: Vec<usize> = spooler
        .jobs
        .ids_sorted()
        .into_iter()
        .filter(|&id| spooler.jobs.get(id).unwrap().status == JobStatus::Created)
        .collect();

    for job_id in pending {
        let source_type = spooler.jobs.get(job_id).unwrap().source_type;
        let Some(printer_id) = find_idle_compatible_printer(spooler, source_type) else {
            continue;
        };
        let _ = start_pipeline(spooler, job_id, printer_id);
    }
}

fn find_idle_compatible_printer(spooler: &Spooler, source_type: usize) -> Option<usize> {
    spooler
        .printers
        .iter()
        .find(|(_, p)| {
            p.status == PrinterStatus::Idle && spooler.types.is_compatible(source_type, p.native_type)
        })
        .map(|(id, _)| id)
}

fn start_pipeline(spooler: &mut Spooler, job_id: usize, printer_id: usize) -> Result<()> {
    let job = spooler.jobs.get(job_id).unwrap();
    let printer = spooler.printers.at(printer_id).unwrap();
    let printer_type = printer.native_type;
    let chain = spooler
        .types
        .find_conversion_path(job.source_type, printer_type)
        .ok_or_else(|| SpoolerError::StateViolation("no conversion path".to_string()))?;

    let printer_name = printer.name.clone();
    let type_name = spooler.types.name_of(printer_type).to_string();
    let out = spooler.endpoint.connect(&printer_name, &type_name)?;

    let pgid = pipeline::spawn_pipeline(&job.input_path, &chain, out)?;

    let job = spooler.jobs.get_mut(job_id).unwrap();
    job.assigned_printer = Some(printer_id);
    job.supervisor_pgid = Some(pgid);
    spooler.jobs.set_status(job_id, JobStatus::Running);
    spooler.printers.set_status(printer_id, PrinterStatus::Busy);

    let argv: Vec<Vec<String>> = chain.iter().map(|c| c.argv.clone()).collect();
    spooler.sink.job_status(job_id, JobStatus::Running);
    spooler.sink.printer_status(printer_id, &printer_name, PrinterStatus::Busy);
    spooler.sink.job_started(job_id, &printer_name, &argv);
    Ok(())
}
