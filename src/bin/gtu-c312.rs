use gtu_c312::Machine;
use std::process::ExitCode;

/// Thin runner: load a program/data file, execute it to completion, print
/// whatever `SYSCALL PRN` emits to stdout. Debug-output modes, memory dumps
/// and thread-table dumps are the CLI wrapper's job (spec's Non-goals) and
/// live outside this crate.
fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: gtu-c312 <program.txt>");
            return ExitCode::FAILURE;
        }
    };

    let mut machine = match Machine::load(&path) {
        Ok(machine) => machine,
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(err) = machine.run(&mut out) {
        log::error!("{err}");
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
