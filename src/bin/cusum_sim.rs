//! cusum-sim - headless host loop for the detection engine
//!
//! Usage:
//!   cusum-sim run --seed 42 --steps-per-frame 5
//!   cusum-sim run --config session.json --injection additive
//!   cusum-sim analyze --seed 42 --no-adaptive

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info, warn};
use traffic_cusum::{BaselineMode, Injection, Session, SessionConfig, analyze};

#[derive(Parser)]
#[command(name = "cusum-sim")]
#[command(about = "Simulate traffic, inject a spike, and detect it with CUSUM")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Step a session and stream one JSON record per sample
    Run {
        #[command(flatten)]
        session: SessionArgs,

        /// Samples processed per frame
        #[arg(long, default_value = "5")]
        steps_per_frame: usize,

        /// Only print the final summary
        #[arg(long)]
        quiet: bool,
    },

    /// Analyze a whole trace at once and print the result
    Analyze {
        #[command(flatten)]
        session: SessionArgs,

        /// Include the full statistic and threshold series
        #[arg(long)]
        series: bool,
    },
}

#[derive(Args)]
struct SessionArgs {
    /// JSON configuration file (missing fields take defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(long)]
    attack_factor: Option<f64>,

    #[arg(long)]
    injection: Option<InjectionArg>,

    #[arg(long)]
    fixed_threshold: Option<f64>,

    #[arg(long)]
    adaptive_k: Option<f64>,

    /// Compare against the fixed threshold only
    #[arg(long)]
    no_adaptive: bool,

    /// Grow the baseline from the samples seen so far during warm-up
    #[arg(long)]
    provisional_baseline: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum InjectionArg {
    Ramp,
    Additive,
    None,
}

impl From<InjectionArg> for Injection {
    fn from(arg: InjectionArg) -> Self {
        match arg {
            InjectionArg::Ramp => Injection::Ramp,
            InjectionArg::Additive => Injection::Additive,
            InjectionArg::None => Injection::Disabled,
        }
    }
}

impl SessionArgs {
    fn into_config(self) -> traffic_cusum::Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_path(path)?,
            None => SessionConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.random_seed = Some(seed);
        }
        if let Some(factor) = self.attack_factor {
            config.attack_factor = factor;
        }
        if let Some(injection) = self.injection {
            config.injection = injection.into();
        }
        if let Some(threshold) = self.fixed_threshold {
            config.fixed_threshold = threshold;
        }
        if let Some(k) = self.adaptive_k {
            config.adaptive_k = k;
        }
        if self.no_adaptive {
            config.adaptive_enabled = false;
        }
        if self.provisional_baseline {
            config.baseline_mode = BaselineMode::Provisional;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            session,
            steps_per_frame,
            quiet,
        } => run_session(session, steps_per_frame, quiet),
        Commands::Analyze { session, series } => run_analyze(session, series),
    };

    if let Err(e) = result {
        error!(error = %e, "cusum-sim failed");
        std::process::exit(1);
    }
}

fn run_session(
    args: SessionArgs,
    steps_per_frame: usize,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.into_config()?;
    let mut session = Session::new(config)?;
    info!(
        seed = ?session.trace().seed,
        samples = session.total_samples(),
        attack = ?session.trace().attack,
        "Session started"
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut frames = 0u64;

    loop {
        let records = session.step_burst(steps_per_frame.max(1));
        if records.is_empty() {
            break;
        }
        frames += 1;

        for record in &records {
            if !quiet {
                serde_json::to_writer(&mut out, record)?;
                writeln!(out)?;
            }
            if record.just_detected {
                warn!(
                    index = record.index,
                    time = record.time,
                    delay = ?session.detection_delay(),
                    "Attack detected"
                );
            }
        }
    }

    let summary = session.summary();
    info!(frames, detected = summary.detection.is_some(), "Session finished");
    serde_json::to_writer_pretty(&mut out, &summary)?;
    writeln!(out)?;
    Ok(())
}

fn run_analyze(args: SessionArgs, series: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.into_config()?;
    let trace = traffic_cusum::simulation::generate(&config)?;
    let mut analysis = analyze(&config, &trace)?;

    if !series {
        analysis.statistic.clear();
        analysis.adaptive_threshold.clear();
    }

    let report = serde_json::json!({
        "seed": trace.seed,
        "attack": trace.attack,
        "attack_start_time": trace.attack_start_time(),
        "analysis": analysis,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
