//! Headless episode runner for the catmaze environment.
//!
//! Examples:
//!   catmazed --episodes 200 --policy oracle
//!   catmazed --policy random --seed 7 --summary run.json
//!   catmazed --config maze.json --curriculum
//!
//! Set `RUST_LOG=debug` to see maze regenerations and per-episode detail.

use std::path::PathBuf;
use std::process;

use tracing::info;

mod policy;
mod runner;

use runner::{PolicyKind, RunError, RunOptions};

fn usage(code: i32) -> ! {
    eprintln!("Usage: catmazed [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --episodes <n>        Episodes to run (default 100)");
    eprintln!("  --seed <n>            Seed for the maze and the policy (default 0)");
    eprintln!("  --policy <name>       random | oracle (default random)");
    eprintln!("  --config <path>       JSON EnvConfig; missing fields use defaults");
    eprintln!("  --max-steps <n>       Override the per-episode step budget");
    eprintln!("  --complexity <c>      Override the starting complexity (0.1-1.0)");
    eprintln!("  --curriculum          Raise complexity as the policy succeeds");
    eprintln!("  --summary <path>      Also write the JSON summary to a file");
    eprintln!("  --help                Show this message");
    process::exit(code);
}

fn parse_args<I>(args: I) -> Result<RunOptions, RunError>
where
    I: IntoIterator<Item = String>,
{
    let mut opts = RunOptions::default();
    let mut args = args.into_iter();

    while let Some(flag) = args.next() {
        let mut value = |name: &str| {
            args.next()
                .ok_or_else(|| RunError::Usage(format!("{name} needs a value")))
        };
        match flag.as_str() {
            "--episodes" => opts.episodes = parse_num(&value("--episodes")?, "--episodes")?,
            "--seed" => opts.seed = parse_num(&value("--seed")?, "--seed")?,
            "--policy" => {
                let name = value("--policy")?;
                opts.policy = PolicyKind::from_name(&name).ok_or_else(|| {
                    RunError::Usage(format!("policy must be 'random' or 'oracle', got '{name}'"))
                })?;
            }
            "--config" => opts.config = Some(PathBuf::from(value("--config")?)),
            "--max-steps" => {
                opts.max_steps = Some(parse_num(&value("--max-steps")?, "--max-steps")?)
            }
            "--complexity" => {
                opts.complexity = Some(parse_num(&value("--complexity")?, "--complexity")?)
            }
            "--curriculum" => opts.curriculum = true,
            "--summary" => opts.summary = Some(PathBuf::from(value("--summary")?)),
            "--help" | "-h" => usage(0),
            other => return Err(RunError::Usage(format!("unknown option '{other}'"))),
        }
    }
    Ok(opts)
}

fn parse_num<T: std::str::FromStr>(s: &str, flag: &str) -> Result<T, RunError> {
    s.parse()
        .map_err(|_| RunError::Usage(format!("{flag} expects a number, got '{s}'")))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("{e}");
            usage(1);
        }
    };

    let summary = runner::run(&opts)?;
    info!(
        caught = summary.caught,
        episodes = summary.episodes,
        success_rate = summary.success_rate,
        "run complete"
    );

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if let Some(path) = &opts.summary {
        runner::write_summary(path, &summary)?;
        info!("Summary written to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn parses_every_flag() {
        let opts = parse_args(args(
            "--episodes 12 --seed 3 --policy oracle --config c.json --max-steps 50 \
             --complexity 0.7 --curriculum --summary out.json",
        ))
        .unwrap();
        assert_eq!(opts.episodes, 12);
        assert_eq!(opts.seed, 3);
        assert_eq!(opts.policy, PolicyKind::Oracle);
        assert_eq!(opts.config, Some(PathBuf::from("c.json")));
        assert_eq!(opts.max_steps, Some(50));
        assert_eq!(opts.complexity, Some(0.7));
        assert!(opts.curriculum);
        assert_eq!(opts.summary, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn no_args_means_defaults() {
        assert_eq!(parse_args(Vec::new()).unwrap(), RunOptions::default());
    }

    #[test]
    fn bad_input_is_a_usage_error() {
        for bad in ["--episodes", "--episodes many", "--policy greedy", "--frobnicate"] {
            assert!(
                matches!(parse_args(args(bad)), Err(RunError::Usage(_))),
                "accepted {bad:?}"
            );
        }
    }
}
