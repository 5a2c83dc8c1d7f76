use abc2ly::{
    export_tunes, parse_with_settings, render_book, AccidentalScope, ConversionSettings, Warning,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "abc2ly",
    about = "Convert ABC tune books to LilyPond scores"
)]
struct Args {
    /// Path to the ABC file.
    input: PathBuf,

    /// Writes one `<id>.ly` file per tune plus an `_index.ly` including them.
    #[arg(long, requires = "out")]
    file_per_tune: bool,

    /// Output directory for `--file-per-tune`.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Adds a `\version` line to the generated documents.
    #[arg(long = "lilypond-version")]
    lilypond_version: Option<String>,

    /// Whether an explicit accidental holds for the pitch in every octave or only in its own.
    #[arg(long, value_enum, default_value_t = Scope::Pitch)]
    accidental_scope: Scope,

    /// Prints the parsed tune book as JSON instead of LilyPond.
    #[arg(long, default_value_t = false)]
    dump_json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scope {
    Pitch,
    PitchAndOctave,
}

impl From<Scope> for AccidentalScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Pitch => AccidentalScope::Pitch,
            Scope::PitchAndOctave => AccidentalScope::PitchAndOctave,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let settings = ConversionSettings {
        target_lilypond_version: args.lilypond_version.clone(),
        accidental_scope: args.accidental_scope.into(),
        ..ConversionSettings::default()
    };

    let abc = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read '{}'", args.input.display()))?;

    // warnings are reported before any render error can stop the run
    let parsed = parse_with_settings(&abc, &settings)?;
    report(parsed.book.tunes.len(), &parsed.warnings);

    if args.dump_json {
        println!("{}", serde_json::to_string_pretty(&parsed.book)?);
        return Ok(());
    }

    if args.file_per_tune {
        let Some(out) = &args.out else {
            bail!("--out required when using --file-per-tune");
        };
        let written = export_tunes(&parsed.book, &settings, out)?;
        info!("Wrote {} tune files to '{}'", written.len(), out.display());
        return Ok(());
    }

    print!("{}", render_book(&parsed.book, &settings)?);
    Ok(())
}

fn report(tune_count: usize, warnings: &[Warning]) {
    info!("Parsed {} tunes", tune_count);
    for warning in warnings {
        warn!("{}", warning);
    }
}
