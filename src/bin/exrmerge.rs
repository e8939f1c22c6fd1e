use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
    thread,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use exrmerge::{
    Codec, ExrCodec, FrameGroup, InputArg, InputFileSpec, MergeJob, MergeOptions, MergeRun,
    RunReport, group_by_frame, group_channels, load_manifest, output_path, parse_input_arg,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  exrmerge merge --out merged.####.exr beauty.*.exr=@color depth.*.exr=Z --progress\n  exrmerge merge --manifest shot010.json --threads 8\n  exrmerge channels beauty.0001.exr --json\n  exrmerge frames beauty.*.exr depth.*.exr\n  exrmerge completions zsh > _exrmerge";

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Parser)]
#[command(
    name = "exrmerge",
    version,
    about = "Merge channels from multi-file OpenEXR sequences into per-frame composites",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while merging.
    #[arg(long, global = true)]
    progress: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Merge channels of every frame into one output file per frame.
    #[command(
        about = "Merge channels per frame",
        after_help = "Inputs are PATH[=SELECTORS]. Selectors are channel names, @category, or *.\n\nExamples:\n  exrmerge merge --out out.####.exr a.0001.exr=R,G,B b.0001.exr=Z\n  exrmerge merge --out out.####.exr beauty.*.exr=@color,@depth --threads 4"
    )]
    Merge {
        /// Input files with optional channel selectors.
        inputs: Vec<String>,

        /// Output path template; the rightmost run of `#` becomes the frame number.
        #[arg(long)]
        out: Option<String>,

        /// JSON manifest describing the output and inputs.
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Worker thread count (0 = automatic).
        #[arg(long)]
        threads: Option<usize>,

        /// Allow overwriting existing output files.
        #[arg(long)]
        overwrite: bool,

        /// Print the run report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List a file's channels grouped by category.
    #[command(
        about = "List channels by category",
        after_help = "Examples:\n  exrmerge channels beauty.0001.exr\n  exrmerge channels beauty.0001.exr --json"
    )]
    Channels {
        /// Input OpenEXR file.
        input: PathBuf,

        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show how files would be grouped into frames.
    #[command(about = "Preview frame grouping")]
    Frames {
        /// Input files.
        inputs: Vec<PathBuf>,

        /// Output path template used to preview output names.
        #[arg(long)]
        out: Option<String>,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn warn(message: impl AsRef<str>) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.as_ref().yellow());
}

fn read_channel_names(
    codec: &dyn Codec,
    path: &Path,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let version = codec
        .parse_version(path)
        .map_err(|error| format!("{}: {error}", path.display()))?;
    let header = codec
        .parse_header(path, &version)
        .map_err(|error| format!("{}: {error}", path.display()))?;
    Ok(header.channel_names())
}

fn resolve_inputs(
    codec: &dyn Codec,
    args: &[InputArg],
    verbose: bool,
) -> Result<Vec<InputFileSpec>, Box<dyn std::error::Error>> {
    let mut specs = Vec::with_capacity(args.len());
    for arg in args {
        let spec = match arg.resolve_names() {
            Some(spec) => spec,
            None => arg.resolve(&read_channel_names(codec, &arg.path)?),
        };
        if spec.channels.is_empty() {
            warn(format!("no channels selected from {}", arg.path.display()));
        }
        if verbose {
            let names: Vec<&str> = spec.channels.iter().map(String::as_str).collect();
            eprintln!("{} {} [{}]", "input".cyan().bold(), spec.path.display(), names.join(", "));
        }
        specs.push(spec);
    }
    Ok(specs)
}

fn check_outputs(
    groups: &[FrameGroup],
    template: &str,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut seen = HashSet::new();
    for group in groups {
        let path = output_path(template, group.frame);
        if !seen.insert(path.clone()) {
            warn(format!(
                "several frames write to {} (template has no # or frame is unnumbered)",
                path.display()
            ));
        }
        if path.exists() {
            if overwrite {
                warn(format!("overwriting {}", path.display()));
            } else {
                return Err(format!(
                    "output already exists: {} (use --overwrite to replace)",
                    path.display()
                )
                .into());
            }
        }
    }
    Ok(())
}

fn wait_with_progress(run: &MergeRun, max: usize) -> Result<(), Box<dyn std::error::Error>> {
    let progress_bar = ProgressBar::new(max as u64);
    let style =
        ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
    progress_bar.set_style(style.progress_chars("##-"));

    loop {
        let progress = run.poll();
        progress_bar.set_position(progress.done as u64);
        progress_bar.set_message(format!("{} errors", run.error_count()));
        if progress.complete {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    progress_bar.finish_with_message("done");
    Ok(())
}

fn print_report(report: &RunReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let payload = json!({
            "frame_groups": report.frame_groups,
            "threads": report.threads,
            "done": report.done,
            "max": report.max,
            "success": report.is_full_success(),
            "errors": report.errors,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if report.is_full_success() {
        println!(
            "{} {}",
            "success:".green().bold(),
            format!("Merged {} frame(s)", report.frame_groups).green()
        );
    } else {
        for error in &report.errors {
            eprintln!("{} {}", "error:".red().bold(), error);
        }
        warn(format!(
            "completed with {} error(s) across {} frame(s); other frames were written",
            report.failed_count(),
            report.frame_groups
        ));
    }
    Ok(())
}

fn run() -> Result<i32, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let codec = Arc::new(ExrCodec::new());

    match cli.command {
        Commands::Merge {
            inputs,
            out,
            manifest,
            threads,
            overwrite,
            json,
        } => {
            let mut args = Vec::new();
            let mut template = out;
            let mut thread_count = 0;

            if let Some(manifest_path) = manifest {
                let manifest = load_manifest(&manifest_path)?;
                args.extend(manifest.input_args()?);
                template = template.or(Some(manifest.output));
                thread_count = manifest.threads;
            }
            for input in &inputs {
                args.push(parse_input_arg(input)?);
            }

            let template = template.ok_or("--out is required unless the manifest sets it")?;
            if args.is_empty() {
                return Err("no input files given".into());
            }

            let specs = resolve_inputs(codec.as_ref(), &args, cli.global.verbose)?;
            let options = MergeOptions::new().with_threads(threads.unwrap_or(thread_count));
            let job = MergeJob::new(specs, template.as_str(), options);
            check_outputs(job.frame_groups(), &template, overwrite)?;

            if cli.global.verbose {
                eprintln!(
                    "{} {} file(s) in {} frame(s)",
                    "merging".cyan().bold(),
                    job.file_count(),
                    job.frame_groups().len()
                );
            }

            let max = job.total_units();
            let run = job.start(codec);
            if cli.global.progress {
                wait_with_progress(&run, max)?;
            }

            let report = run.release();
            print_report(&report, json)?;
            return Ok(if report.is_full_success() { 0 } else { 2 });
        }
        Commands::Channels { input, json } => {
            let names = read_channel_names(codec.as_ref(), &input)?;
            let groups = group_channels(names);
            if json {
                let payload: Vec<_> = groups
                    .iter()
                    .map(|(category, channels)| {
                        json!({
                            "category": category.label(),
                            "keyword": category.keyword(),
                            "channels": channels,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for (category, channels) in &groups {
                    println!(
                        "{} {} ({})",
                        category.label().bold(),
                        format!("@{}", category.keyword()).cyan(),
                        channels.len()
                    );
                    for channel in channels {
                        println!("  {channel}");
                    }
                }
            }
        }
        Commands::Frames { inputs, out } => {
            let specs = inputs
                .into_iter()
                .map(|path| InputFileSpec::new(path, Vec::<String>::new()));
            for group in group_by_frame(specs) {
                match &out {
                    Some(template) => println!(
                        "{} -> {}",
                        format!("frame {}", group.frame).bold(),
                        output_path(template, group.frame).display()
                    ),
                    None => println!("{}", format!("frame {}", group.frame).bold()),
                }
                for path in group.paths() {
                    println!("  {}", path.display());
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "exrmerge", &mut std::io::stdout());
        }
    }

    Ok(0)
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("error: {error}");
            std::process::exit(1);
        }
    }
}
