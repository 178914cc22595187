use brisa::cli::{generate_completions, AppConfig, Args, Commands};
use brisa::interpreter::loader;
use brisa::{Error, Interpreter};
use clap::Parser;
use owo_colors::OwoColorize;
use std::path::Path;

fn main() {
    let args = Args::parse();

    if let Some(Commands::Completar { shell }) = args.command {
        generate_completions(shell);
        return;
    }

    let config = AppConfig::from_args(&args);

    let archivo = match &args.archivo {
        Some(path) => path.clone(),
        None => {
            let error = Error::invalid_argument("Se requiere un archivo para ejecutar");
            report_fatal(&error, config.color_enabled);
            std::process::exit(1);
        }
    };

    let mut interp = Interpreter::new();
    interp.set_colors(config.color_enabled);

    if let Err(error) = run(&mut interp, &archivo) {
        report_fatal(&error, config.color_enabled);
        std::process::exit(1);
    }
}

fn run(interp: &mut Interpreter, path: &Path) -> Result<(), Error> {
    loader::run_file(interp, path)?;
    Ok(())
}

fn report_fatal(error: &Error, color_enabled: bool) {
    let category = error.kind().category();
    if color_enabled {
        eprintln!("{} {}:", "error".bright_red(), category);
    } else {
        eprintln!("error {}:", category);
    }
    eprintln!("  {}", error.message());
}
