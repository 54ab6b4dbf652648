use std::path::PathBuf;

use blast_throughput::BlastThroughput;
use clap::{Parser, Subcommand, ValueEnum};
use common::{config::Style, plot::Plot, sink::Sink};
use concurrency::{ConcurrencyResults, Mode};
use eyre::Result;
use operations::{Operations, Viz};
use tracing::{debug, error};
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const MODULES: &[&str] = &["common", "blast_throughput", "concurrency", "operations"];

#[derive(Parser)]
#[command(version, about = "Plot concurrent map benchmark results")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Extra tracing directives, ie. `common=debug`
    #[arg(long)]
    log: Vec<String>,
    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// YAML file overriding figure size, fonts and palette
    #[arg(long)]
    style: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plot blast throughput from JSON lines
    Blast {
        /// JSON lines throughput generated by blast
        data: PathBuf,
        /// Title to give to the figure
        #[arg(short, long)]
        title: Option<String>,
        /// Plot failures as well
        #[arg(short, long, default_value_t = false)]
        failure: bool,
        /// Path to save the figure
        #[arg(short, long)]
        savefig: Option<PathBuf>,
    },
    /// Plot throughput against concurrent clients for a single workload
    Results {
        /// Path to the results CSV file
        #[arg(default_value = concurrency::DEFAULT_DATA)]
        data: PathBuf,
        /// Path to save the figure out to
        #[arg(short, long, value_name = "PATH")]
        outpath: Option<PathBuf>,
        /// Make a line plot instead of a bar plot
        #[arg(short, long, default_value_t = false)]
        line: bool,
        /// Title to give to the figure
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Plot per-operation benchmark or blast results by store
    Ops {
        /// Path to CSV data
        data: Option<PathBuf>,
        /// Plot to draw from the data
        #[arg(short, long, value_enum, default_value_t = VizArg::Ops)]
        viz: VizArg,
        /// Path to store the figure
        #[arg(short, long)]
        outpath: Option<PathBuf>,
        /// Title to give to the figure
        #[arg(short, long)]
        title: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum VizArg {
    Ops,
    Blast,
}

impl From<VizArg> for Viz {
    fn from(value: VizArg) -> Self {
        match value {
            VizArg::Ops => Viz::Ops,
            VizArg::Blast => Viz::Blast,
        }
    }
}

/// The plot to run, the results it reads, and where the chart goes
struct Job {
    plot: Box<dyn Plot>,
    data: PathBuf,
    sink: Sink,
}

impl Commands {
    fn into_job(self) -> Job {
        match self {
            Commands::Blast {
                data,
                title,
                failure,
                savefig,
            } => Job {
                plot: Box::new(BlastThroughput {
                    title,
                    failures: failure,
                }),
                data,
                sink: Sink::from_output(savefig),
            },
            Commands::Results {
                data,
                outpath,
                line,
                title,
            } => Job {
                plot: Box::new(ConcurrencyResults {
                    title,
                    mode: if line { Mode::Line } else { Mode::Bar },
                }),
                data,
                sink: Sink::from_output(outpath),
            },
            Commands::Ops {
                data,
                viz,
                outpath,
                title,
            } => {
                let viz = Viz::from(viz);
                Job {
                    plot: Box::new(Operations { viz, title }),
                    data: data.unwrap_or_else(|| PathBuf::from(viz.default_data())),
                    sink: Sink::File(outpath.unwrap_or_else(|| PathBuf::from(viz.default_output()))),
                }
            }
        }
    }
}

fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();

    let mut env_filter = EnvFilter::new(format!("benchplot={log_level}"));
    for log in &args.log {
        env_filter = env_filter.add_directive(log.parse()?);
    }
    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    let (file_layer, _guard) = match &args.log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path.file_name().map(|n| n.to_owned()).unwrap_or_else(|| "log.log".into());
            let file_appender = tracing_appender::rolling::never(dir.unwrap_or(".".as_ref()), name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(layer().with_ansi(false).with_writer(non_blocking)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_writer(std::io::stderr)
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .with(file_layer)
        .init();

    let style = match &args.style {
        Some(path) => Style::load(path)?,
        None => Style::default(),
    };

    let job = args.command.into_job();
    debug!("Running {} on {}", job.plot.name(), job.data.display());
    if let Err(err) = common::plot::plot(&*job.plot, &job.data, &job.sink, &style) {
        error!("{err}");
        return Err(err.into());
    }
    Ok(())
}
