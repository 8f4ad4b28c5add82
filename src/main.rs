extern crate clap;

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    process::ExitCode,
    time::Instant,
};

use bfssa::{ir::DEFAULT_MODULE_NAME, translate, Translation, TranslatorOptions};
use clap::{Parser, ValueEnum};
use colored::Colorize;

/// Brainf**k to SSA IR translator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The file to translate, reads stdin if not given
    #[arg()]
    file: Option<String>,

    /// Where to write the output, stdout if not given
    #[arg(short, long)]
    output: Option<String>,

    /// Goes into the `ModuleID` and `source_filename` header
    #[arg(short, long, default_value = DEFAULT_MODULE_NAME)]
    module_name: String,

    #[arg(short, long, value_enum, default_value_t = Emit::Ir)]
    emit: Emit,

    /// Print how long each stage took
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Emit {
    /// LLVM textual IR
    Ir,
    /// Block/instruction/join counts
    Stats,
}

// stdout may be carrying the IR so everything else goes to stderr
macro_rules! status {
    ($verbose: expr, $($arg: tt)*) => {
        if $verbose {
            eprintln!($($arg)*);
        }
    };
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{0:}: {1:}", "Error".red(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let input: Box<dyn Read> = match &args.file {
        Some(file) => {
            status!(args.verbose, "Translating {}", file);
            Box::new(File::open(file)?)
        }
        None => Box::new(io::stdin().lock()),
    };

    let options = TranslatorOptions {
        module_name: args.module_name.clone(),
    };

    status!(args.verbose, "{}", "Starting translation".blue());
    let now = Instant::now();
    let Translation { module, stats } = translate(input, &options)?;
    status!(args.verbose, "{} {:.2?}", "Finished translation in".green(), now.elapsed());

    // nothing is created until translation has succeeded
    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let now = Instant::now();
    match args.emit {
        Emit::Ir => write!(out, "{}", module)?,
        Emit::Stats => writeln!(
            out,
            "blocks: {}\ninstructions: {}\njoins: {}\nmax loop depth: {}",
            stats.blocks, stats.instructions, stats.joins, stats.max_loop_depth
        )?,
    }
    out.flush()?;
    status!(args.verbose, "{} {:.2?}", "Finished writing in".green(), now.elapsed());

    Ok(())
}
