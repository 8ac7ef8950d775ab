//! CLI Entry Point for eetime
//!
//! Provides command-line access to:
//! - Collecting erase-time runs from a device (`collect`)
//! - Device utilities (`check`, `zero`)
//! - Log utilities (`extract`, `annotate`)
//! - Offline analysis (`stats`, `gen-table`, `aggregate`)
//!
//! # Usage
//!
//! Collect three program/erase cycles:
//! ```bash
//! eetime collect --device 2716 --passes 3 --write-init --sn ee20 --bulb 2 --eraser pe140t
//! ```
//!
//! Summarize a trial:
//! ```bash
//! eetime stats log/2022-03-23_01_sn-ee20_bulb-2
//! ```

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use eetime::acquisition::{
    default_postfix, default_run_dir, interval_from_secs, run_session, CollectOptions,
    RunMetadata,
};
use eetime::analysis::{analyze_trial, generate_table, run_aggregate, IdentityTable, TableOptions};
use eetime::config::EetimeConfig;
use eetime::hardware::{MemoryDevice, Minipro, MockEprom};
use eetime::logging::{self, LoggingConfig};
use eetime::tools;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "eetime")]
#[command(about = "Measure UV EPROM erase time", long_about = None)]
struct Cli {
    /// Configuration file (default: ./eetime.toml, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Programmer {
    /// Shell out to the `minipro` tool
    Minipro,
    /// Simulated device
    Mock,
}

#[derive(Args)]
struct DeviceArgs {
    /// Device name, see `minipro -l` (default from config)
    #[arg(long)]
    device: Option<String>,

    #[arg(long, value_enum, default_value = "minipro")]
    programmer: Programmer,

    /// Simulated device size in bytes
    #[arg(long, default_value_t = 2048)]
    mock_size: usize,
}

#[derive(Args)]
struct MetadataArgs {
    /// Operator
    #[arg(long)]
    user: Option<String>,
    /// Serial number
    #[arg(long)]
    sn: Option<String>,
    /// Eraser fixture
    #[arg(long)]
    eraser: Option<String>,
    /// Bulb id
    #[arg(long)]
    bulb: Option<String>,
}

impl From<MetadataArgs> for RunMetadata {
    fn from(args: MetadataArgs) -> Self {
        RunMetadata {
            user: args.user,
            sn: args.sn,
            eraser: args.eraser,
            bulb: args.bulb,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Collect erase-time runs
    Collect {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        metadata: MetadataArgs,

        /// Number of program/erase cycles; more than one requires --write-init
        #[arg(long)]
        passes: Option<u32>,

        /// Output directory (default: <log_root>/<date>_<NN>_<postfix>)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Suffix for the default output directory
        #[arg(long)]
        postfix: Option<String>,

        /// Percent of elapsed time that must read erased at the end of the run
        #[arg(long)]
        erased_threshold: Option<f64>,

        /// Seconds between reads
        #[arg(long)]
        interval: Option<f64>,

        /// Per-pass timeout in seconds; below 1 disables it
        #[arg(long)]
        timeout: Option<f64>,

        /// Skip the initial snapshot
        #[arg(long)]
        no_read_init: bool,

        /// Zero the device before every pass
        #[arg(long)]
        write_init: bool,
    },

    /// Read the device and report its erase state
    Check {
        #[command(flatten)]
        device: DeviceArgs,

        /// Check forever
        #[arg(long = "loop")]
        repeat: bool,
    },

    /// Write all bits of the device to 0
    Zero {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Write out (or hexdump) the initial snapshot of a run
    Extract {
        /// Log file, or a directory to use its first log
        jl: PathBuf,

        /// Output binary
        #[arg(default_value = "out.bin")]
        out: PathBuf,

        /// Hexdump instead of writing
        #[arg(long)]
        hexdump: bool,
    },

    /// Stamp metadata onto every log header in a directory
    Annotate {
        dir: PathBuf,

        #[command(flatten)]
        metadata: MetadataArgs,
    },

    /// T50/T100 of runs and their medians
    Stats {
        /// Log files and/or directories
        #[arg(required = true)]
        jls: Vec<PathBuf>,
    },

    /// Generate the per-trial table for every log directory under a root
    GenTable {
        root: PathBuf,

        out: PathBuf,

        /// S/N identity table
        #[arg(long, default_value = "sns.csv")]
        sns: PathBuf,

        /// Warn and continue instead of aborting on bad entries
        #[arg(long)]
        no_strict: bool,
    },

    /// Aggregate a per-trial table by vendor and device
    Aggregate { input: PathBuf, output: PathBuf },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EetimeConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let logging_config = LoggingConfig::from_config(&config)
        .map_err(anyhow::Error::msg)?
        .verbose(cli.verbose);
    logging::init(logging_config).map_err(anyhow::Error::msg)?;

    match cli.command {
        Commands::Collect {
            device,
            metadata,
            passes,
            dir,
            postfix,
            erased_threshold,
            interval,
            timeout,
            no_read_init,
            write_init,
        } => {
            let device = open_device(&config, &device)?;
            let mut metadata = RunMetadata::from(metadata);
            metadata.user = metadata.user.or_else(|| config.collect.user.clone());

            let dir = match dir {
                Some(dir) => dir,
                None => {
                    let postfix = postfix.unwrap_or_else(|| default_postfix(&metadata));
                    default_run_dir(
                        &config.collect.log_root,
                        Some(&postfix),
                        chrono::Local::now().date_naive(),
                    )?
                }
            };

            let mut options = CollectOptions::from_config(&config.collect, dir)?;
            options.metadata = metadata;
            if let Some(passes) = passes {
                options.passes = passes;
            }
            if let Some(threshold) = erased_threshold {
                options.erased_threshold = threshold;
            }
            if let Some(interval) = interval {
                options.interval = interval_from_secs(interval).context("--interval")?;
            }
            if let Some(timeout) = timeout {
                options.timeout = (timeout >= 1.0).then_some(timeout);
            }
            options.read_init &= !no_read_init;
            options.write_init |= write_init;

            println!("Writing to {}", options.dir.display());
            let footers = run_session(device.as_ref(), &options).await?;
            println!("Completed {} pass(es)", footers.len());
            Ok(())
        }
        Commands::Check { device, repeat } => {
            let device = open_device(&config, &device)?;
            if repeat {
                tokio::select! {
                    result = tools::check_loop(device.as_ref(), None) => { result?; }
                    _ = tokio::signal::ctrl_c() => {}
                }
            } else {
                tools::check(device.as_ref()).await?;
            }
            Ok(())
        }
        Commands::Zero { device } => {
            let device = open_device(&config, &device)?;
            let size = tools::zero(device.as_ref()).await?;
            println!("Zeroed {size} bytes");
            Ok(())
        }
        Commands::Extract { jl, out, hexdump } => {
            let image = tools::initial_snapshot(&jl)?;
            if hexdump {
                print!("{}", tools::hexdump(&image, true));
            } else {
                std::fs::write(&out, &image)
                    .with_context(|| format!("writing {}", out.display()))?;
                println!("Wrote {} bytes to {}", image.len(), out.display());
            }
            Ok(())
        }
        Commands::Annotate { dir, metadata } => {
            let touched = tools::annotate_dir(&dir, &metadata.into())?;
            println!("Annotated {} log(s)", touched.len());
            Ok(())
        }
        Commands::Stats { jls } => {
            let trial = analyze_trial(&jls)?;
            println!();
            println!("t50s");
            for run in &trial.runs {
                println!("  {:.1}", run.t50);
            }
            println!();
            println!("t100s");
            for run in &trial.runs {
                println!("  {:.1}", run.t100);
            }
            println!();
            println!("Summary ({} runs):", trial.n());
            println!("  t50: {:.1} sec", trial.t50);
            println!("  t100: {:.1} sec", trial.t100);
            Ok(())
        }
        Commands::GenTable {
            root,
            out,
            sns,
            no_strict,
        } => {
            let identities = IdentityTable::load(&sns)
                .with_context(|| format!("loading S/N table {}", sns.display()))?;
            let options = TableOptions::from_config(&config.analysis)
                .with_strict(config.analysis.strict && !no_strict);
            let summary = generate_table(&root, &out, &identities, &options)?;
            println!(
                "Wrote {} / {} entries to {}",
                summary.written,
                summary.attempted,
                out.display()
            );
            Ok(())
        }
        Commands::Aggregate { input, output } => {
            let products = run_aggregate(&input, &output)?;
            println!("Wrote {products} products to {}", output.display());
            Ok(())
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn open_device(config: &EetimeConfig, args: &DeviceArgs) -> Result<Box<dyn MemoryDevice>> {
    let name = args
        .device
        .clone()
        .or_else(|| config.programmer.device.clone());
    match args.programmer {
        Programmer::Minipro => {
            let Some(name) = name else {
                bail!("no device given: pass --device or set programmer.device");
            };
            Ok(Box::new(Minipro::from_config(&config.programmer, name)))
        }
        Programmer::Mock => Ok(Box::new(MockEprom::new(
            name.unwrap_or_else(|| "mock".to_string()),
            args.mock_size,
        ))),
    }
}
