//! hexforge's application entry point.
//! Parses arguments, loads the template library and prints what the engine
//! generated or would generate.

use hexforge::{
    cli::{get_args, merge_stdin_options, Args},
    engine::{Engine, Generation, Preview},
    error::{default_error_handler, Error, Result},
    source::TemplateLibrary,
    staging::WriteAction,
};

/// Main application entry point.
fn main() {
    let args = get_args();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Trace
        } else {
            log::LevelFilter::Warn
        })
        .init();

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

fn print_preview(preview: &Preview) {
    for write in &preview.writes {
        println!("{} {} ({} bytes)", write.action, write.path, write.bytes);
        if write.action == WriteAction::Overwrite {
            if let Some(diff) = &write.diff {
                print!("{diff}");
            }
        }
    }
    for failure in &preview.failures {
        eprintln!("{failure}");
    }
    if !preview.conflicts.is_empty() {
        eprintln!(
            "{}",
            Error::DestinationConflict {
                paths: preview.conflicts.clone()
            }
        );
    }
    println!("Dry run: nothing was written.");
}

/// Main application logic execution.
///
/// # Flow
/// 1. Loads the template library
/// 2. Merges stdin and command-line options
/// 3. Runs the generation pipeline
/// 4. Reports the preview or the committed files
fn run(args: Args) -> Result<()> {
    let library = TemplateLibrary::load(args.templates_dir())?;
    let options = merge_stdin_options(&args)?;
    let engine = Engine::new(library, &args.workspace);

    match engine.generate(&args.schematic, &options)? {
        Generation::Preview(preview) => print_preview(&preview),
        Generation::Committed(report) => {
            for path in &report.created {
                println!("CREATE: '{path}'");
            }
            for path in &report.overwritten {
                println!("OVERWRITE: '{path}'");
            }
            println!(
                "Generation completed successfully: {} files in {}.",
                report.written(),
                engine.workspace_root().display()
            );
        }
    }
    Ok(())
}
