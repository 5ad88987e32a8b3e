use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use presi::editor::{self, LineEditor};
use presi::events::LogEventSink;
use presi::spooler::{Spooler, DEFAULT_MAX_JOBS, DEFAULT_MAX_PRINTERS};
use presi::{command, endpoint, reaper};

/// Interactive print spooler.
#[derive(Parser, Debug)]
#[command(name = "presi")]
struct Cli {
    /// Replay commands from a file instead of the interactive prompt.
    #[arg(long)]
    batch: Option<PathBuf>,

    /// Directory printer output is written into (created if missing).
    #[arg(long, default_value = "./spool")]
    spool_dir: PathBuf,

    /// Override the compiled-in printer table capacity.
    #[arg(long, default_value_t = DEFAULT_MAX_PRINTERS)]
    max_printers: usize,

    /// Override the compiled-in job table capacity.
    #[arg(long, default_value_t = DEFAULT_MAX_JOBS)]
    max_jobs: usize,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = reaper::install() {
        eprintln!("presi: failed to install SIGCHLD handler: {e}");
        std::process::exit(1);
    }

    // Suppress the spurious newline ctrlc would otherwise print while the
    // line editor holds the terminal in raw mode.
    let _ = ctrlc::set_handler(|| {
        if !editor::EDITOR_ACTIVE.load(std::sync::atomic::Ordering::Relaxed) {
            println!();
        }
    });

    let endpoint = match endpoint::SpoolDirEndpoint::new(cli.spool_dir) {
        Ok(e) => Box::new(e),
        Err(e) => {
            eprintln!("presi: failed to create spool directory: {e}");
            std::process::exit(1);
        }
    };

    let mut spooler = Spooler::new(
        Box::new(LogEventSink),
        endpoint,
        cli.max_printers,
        cli.max_jobs,
        Duration::from_secs(10),
    );

    let exit_code = match cli.batch {
        Some(path) => run_batch(&mut spooler, &path),
        None => run_interactive(&mut spooler),
    };
    std::process::exit(exit_code);
}

fn run_interactive(spooler: &mut Spooler) -> i32 {
    let mut editor = LineEditor::new();
    let stdout = io::stdout();

    loop {
        let line = match editor.read_line("presi> ", || reaper::drain_child_events(spooler)) {
            Ok(Some(line)) => line,
            Ok(None) => break, // EOF
            Err(e) => {
                eprintln!("presi: input error: {e}");
                break;
            }
        };

        editor.add_to_history(&line);
        let tokens = command::tokenize(&line);
        if tokens.is_empty() {
            continue;
        }

        let mut out = stdout.lock();
        let outcome = command::dispatch(spooler, &mut out, &tokens);
        drop(out);

        reaper::drain_child_events(spooler);
        command::sweep(spooler);

        if matches!(outcome, command::Outcome::Quit) {
            return 1;
        }
    }
    0
}

fn run_batch(spooler: &mut Spooler, path: &std::path::Path) -> i32 {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("presi: cannot open batch file {}: {e}", path.display());
            return 1;
        }
    };
    let stdout = io::stdout();

    for line in io::BufReader::new(file).lines() {
        let Ok(line) = line else { break };
        reaper::drain_child_events(spooler);
        let tokens = command::tokenize(&line);
        if tokens.is_empty() {
            continue;
        }

        let mut out = stdout.lock();
        let outcome = command::dispatch(spooler, &mut out, &tokens);
        drop(out);

        reaper::drain_child_events(spooler);
        command::sweep(spooler);

        if matches!(outcome, command::Outcome::Quit) {
            return 1;
        }
    }
    let _ = io::stdout().flush();
    0
}
