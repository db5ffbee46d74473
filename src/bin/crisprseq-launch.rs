use crisprseq_launch::app::commands::{self, CommandFailure};

fn run() -> Result<(), CommandFailure> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let output = commands::run_cli(args)?;
    println!("{output}");
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(err.exit_code);
    }
}
