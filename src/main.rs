use std::error::Error;
use std::sync::Arc;

use log::info;

use taxondist::logging::{init_logging, log_critical_error, log_shutdown, log_system_info, set_log_level};
use taxondist::distance::is_insufficient;
use taxondist::{CancellationToken, DistanceConfig, DistanceContext, DistanceMatrix, DistanceMetric, Sequence};

const USAGE: &str = "usage: taxondist [--metric uncorrected|k2p|transversion] [--min-overlap N] [--no-ambiguity] NAME=SEQUENCE...";

struct Args {
    config: DistanceConfig,
    entries: Vec<(String, String)>,
}

fn parse_args(mut config: DistanceConfig, mut args: impl Iterator<Item = String>) -> Result<Args, Box<dyn Error>> {
    let mut entries = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--metric" => {
                let value = args.next().ok_or("--metric needs a value")?;
                config.metric = value.parse::<DistanceMetric>()?;
            }
            "--min-overlap" => {
                let value = args.next().ok_or("--min-overlap needs a value")?;
                config.minimum_overlap = value.parse()?;
            }
            "--no-ambiguity" => config.ambiguous_bases_allowed = false,
            "-h" | "--help" => return Err(USAGE.into()),
            _ => {
                let (name, bases) = arg
                    .split_once('=')
                    .ok_or_else(|| format!("expected NAME=SEQUENCE, got '{arg}'\n{USAGE}"))?;
                entries.push((name.to_string(), bases.to_string()));
            }
        }
    }

    if entries.len() < 2 {
        return Err(format!("need at least two sequences\n{USAGE}").into());
    }

    Ok(Args { config, entries })
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = parse_args(DistanceConfig::from_env(), std::env::args().skip(1))?;
    log_system_info(&args.config);

    let sequences = args
        .entries
        .iter()
        .map(|(name, bases)| Sequence::new(name, bases).map(Arc::new))
        .collect::<Result<Vec<_>, _>>()?;
    info!("Loaded {} sequences", sequences.len());

    let ctx = DistanceContext::new(args.config);
    let matrix = DistanceMatrix::compute(&sequences, &ctx, &CancellationToken::new()).into_result()?;

    let mut header = String::new();
    for label in matrix.labels() {
        header.push('\t');
        header.push_str(label);
    }
    println!("{header}");

    for (i, label) in matrix.labels().iter().enumerate() {
        let mut line = label.clone();
        for j in 0..matrix.len() {
            let cell = match matrix.get(i, j) {
                Some(d) if is_insufficient(d) => "NA".to_string(),
                Some(d) => format!("{d:.4}"),
                None => String::new(),
            };
            line.push('\t');
            line.push_str(&cell);
        }
        println!("{line}");
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    human_panic::setup_panic!();

    set_log_level();
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {e}");
    }

    let result = run();
    if let Err(e) = &result {
        log_critical_error(&e.to_string(), Some("main"));
    }
    log_shutdown();
    result
}
