mod cache;
mod commands;
mod config;
mod database;
mod error;
mod market_api;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use cache::CachedQueryService;
use commands::{SessionQuery, TrendQuery};
use config::AppConfig;
use database::Database;
use market_api::utils::{parse_date, parse_time};
use market_api::{
    DailyFilter, MoveDirection, MoveFilter, NormalizationMethod, SessionKind, SimilarityRequest, StepPattern,
};
use state::SessionState;

#[derive(Parser)]
#[command(
    name = "atm-trend",
    version,
    about = "Explore TAIEX futures ATM intraday trends",
    propagate_version = true
)]
struct Cli {
    /// JSON config file; env vars and flags override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Trading mode
    #[arg(long, global = true)]
    mode: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import exported ATM records from a JSON file
    Import { file: PathBuf },
    /// List trading dates of the mode
    Dates,
    /// Daily multi-filter table
    Filter(FilterArgs),
    /// Show the last filter table again without querying
    Last,
    /// Forget the last filter table
    Reset,
    /// Multi-day dual-axis trend chart
    Trend(TrendArgs),
    /// One stitched day or night session
    Session(SessionArgs),
    /// Rank days by similarity to a template window
    Similar(SimilarArgs),
}

#[derive(Parser)]
struct FilterArgs {
    #[arg(long, value_parser = parse_date)]
    start: NaiveDate,

    #[arg(long, value_parser = parse_date)]
    end: NaiveDate,

    /// ISO weekday numbers (1 = Monday); default Monday to Saturday
    #[arg(long, value_delimiter = ',')]
    weekdays: Vec<u32>,

    /// Time-of-day band as HH:MM,HH:MM
    #[arg(long, value_parser = parse_time_band)]
    time_band: Option<(NaiveTime, NaiveTime)>,

    /// Price band as MIN,MAX
    #[arg(long, value_parser = parse_band)]
    price_band: Option<(f64, f64)>,

    /// Equilibrium sum band as MIN,MAX
    #[arg(long, value_parser = parse_band)]
    equilibrium_band: Option<(f64, f64)>,

    #[arg(long, value_enum, requires = "price_move_band")]
    price_move: Option<Direction>,

    /// Accepted range of the chosen price move, MIN,MAX
    #[arg(long, value_parser = parse_band)]
    price_move_band: Option<(f64, f64)>,

    #[arg(long, value_enum, requires = "equilibrium_move_band")]
    equilibrium_move: Option<Direction>,

    #[arg(long, value_parser = parse_band)]
    equilibrium_move_band: Option<(f64, f64)>,
}

#[derive(Parser)]
struct TrendArgs {
    /// Defaults to a date picked from the last filter table
    #[arg(long, value_parser = parse_date)]
    start: Option<NaiveDate>,

    /// Row of the last filter table to start from, 0 = newest
    #[arg(long, default_value_t = 0, conflicts_with = "start")]
    pick: usize,

    /// Consecutive calendar days from the start date
    #[arg(long, default_value_t = 5)]
    days: usize,

    /// Settlement price to centre the price band on
    #[arg(long)]
    base_price: Option<f64>,
}

#[derive(Parser)]
struct SessionArgs {
    #[arg(long, value_parser = parse_date)]
    date: NaiveDate,

    #[arg(long, value_enum, default_value_t = Session::Day)]
    session: Session,

    /// Fixed y range as MIN,MAX
    #[arg(long, value_parser = parse_band)]
    y_range: Option<(f64, f64)>,
}

#[derive(Parser)]
struct SimilarArgs {
    /// Template trading date
    #[arg(long, value_parser = parse_date)]
    date: NaiveDate,

    #[arg(long, value_parser = parse_time, default_value = "09:00")]
    start_time: NaiveTime,

    #[arg(long, value_parser = parse_time, default_value = "10:00")]
    end_time: NaiveTime,

    /// relative (magnitude) or shape
    #[arg(long, default_value = "relative")]
    method: NormalizationMethod,

    #[arg(long)]
    top: Option<usize>,

    /// Cancel the scan after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Overrides the configured step pattern
    #[arg(long, value_enum)]
    step: Option<Step>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    Up,
    Down,
}

#[derive(Clone, Copy, ValueEnum)]
enum Session {
    Day,
    Night,
}

#[derive(Clone, Copy, ValueEnum)]
enum Step {
    Symmetric1,
    Symmetric2,
}

fn parse_band(s: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = s.split_once(',').ok_or_else(|| format!("expected MIN,MAX, got {}", s))?;
    let lo: f64 = lo.trim().parse().map_err(|_| format!("invalid number: {}", lo))?;
    let hi: f64 = hi.trim().parse().map_err(|_| format!("invalid number: {}", hi))?;
    if lo > hi {
        return Err(format!("band minimum {} exceeds maximum {}", lo, hi));
    }
    Ok((lo, hi))
}

fn parse_time_band(s: &str) -> Result<(NaiveTime, NaiveTime), String> {
    let (lo, hi) = s.split_once(',').ok_or_else(|| format!("expected HH:MM,HH:MM, got {}", s))?;
    Ok((parse_time(lo.trim())?, parse_time(hi.trim())?))
}

fn move_filter(direction: Option<Direction>, band: Option<(f64, f64)>) -> Option<MoveFilter> {
    let (min, max) = band?;
    let direction = match direction? {
        Direction::Up => MoveDirection::Up,
        Direction::Down => MoveDirection::Down,
    };
    Some(MoveFilter { direction, min, max })
}

fn init_logging() {
    tracing_subscriber::fmt()
        // Filter messages based on the INFO level
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        // stdout carries the JSON output
        .with_writer(std::io::stderr)
        .with_ansi(cfg!(debug_assertions))
        .compact()
        .init()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(mode) = cli.mode {
        config.default_mode = mode;
    }
    let mode = config.default_mode.clone();

    let db = Arc::new(
        Database::open(&config.db_path, config.db_max_connections)
            .with_context(|| format!("Failed to open database {}", config.db_path.display()))?,
    );
    info!(path = %config.db_path.display(), %mode, "database ready");

    let service = CachedQueryService::new(db.clone(), config.rows_cache_ttl(), config.dates_cache_ttl());
    let state = SessionState::load(&config.state_path)
        .with_context(|| format!("Failed to read session state {}", config.state_path.display()))?;

    match cli.command {
        Commands::Import { file } => {
            let summary = commands::import_records_file(&db, &file, &config.columns, &mode)
                .map_err(anyhow::Error::msg)?;
            service.invalidate_all();
            print_json(&summary)
        }
        Commands::Dates => {
            let dates = commands::get_trading_dates(&service, &mode).map_err(anyhow::Error::msg)?;
            print_json(&dates)
        }
        Commands::Filter(args) => {
            let mut filter = DailyFilter::new(args.start, args.end, mode);
            filter.weekdays = args.weekdays;
            filter.time_band = args.time_band;
            filter.price_band = args.price_band;
            filter.equilibrium_band = args.equilibrium_band;
            filter.price_move = move_filter(args.price_move, args.price_move_band);
            filter.equilibrium_move = move_filter(args.equilibrium_move, args.equilibrium_move_band);

            let out = commands::run_daily_filter(&service, &state, filter).map_err(anyhow::Error::msg)?;
            state.save(&config.state_path).context("Failed to save session state")?;
            print_json(&out)
        }
        Commands::Last => {
            let out = commands::last_daily_filter(&state).map_err(anyhow::Error::msg)?;
            print_json(&out)
        }
        Commands::Reset => {
            commands::reset_session(&state);
            state.save(&config.state_path).context("Failed to save session state")?;
            print_json(&serde_json::json!({ "reset": true }))
        }
        Commands::Trend(args) => {
            let query = TrendQuery {
                mode,
                start_date: args.start,
                pick: args.pick,
                day_count: args.days,
                base_price: args.base_price,
            };
            let chart = commands::build_trend_chart(&service, &state, &config, &query).map_err(anyhow::Error::msg)?;
            print_json(&chart)
        }
        Commands::Session(args) => {
            let query = SessionQuery {
                mode,
                date: args.date,
                kind: match args.session {
                    Session::Day => SessionKind::Day,
                    Session::Night => SessionKind::Night,
                },
                y_range: args.y_range,
            };
            let chart = commands::build_session_chart(&service, &config, &query).map_err(anyhow::Error::msg)?;
            print_json(&chart)
        }
        Commands::Similar(args) => {
            let request = SimilarityRequest {
                mode,
                template_date: args.date,
                start_time: args.start_time,
                end_time: args.end_time,
                method: args.method,
                top_n: args.top,
                step_pattern: match args.step {
                    Some(Step::Symmetric1) => StepPattern::Symmetric1,
                    Some(Step::Symmetric2) => StepPattern::Symmetric2,
                    None => config.step_pattern,
                },
            };
            if args.timeout_secs.is_some() {
                config.scan_timeout_secs = args.timeout_secs;
            }
            let out = commands::run_watched_similarity_search(&service, &config, &request)
                .map_err(anyhow::Error::msg)?;
            print_json(&out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_band() {
        assert_eq!(parse_band("10, 50").unwrap(), (10.0, 50.0));
        assert!(parse_band("50,10").is_err());
        assert!(parse_band("10").is_err());
    }

    #[test]
    fn test_move_filter_needs_both_parts() {
        assert!(move_filter(Some(Direction::Up), None).is_none());
        let f = move_filter(Some(Direction::Down), Some((-80.0, -20.0))).unwrap();
        assert_eq!(f.direction, MoveDirection::Down);
    }

    #[test]
    fn test_cli_parses_similar() {
        let cli = Cli::try_parse_from(["atm-trend", "--mode", "night", "similar", "--date", "2024-03-04", "--top", "3"]).unwrap();
        assert_eq!(cli.mode.as_deref(), Some("night"));
        match cli.command {
            Commands::Similar(args) => {
                assert_eq!(args.top, Some(3));
                assert_eq!(args.start_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
                assert_eq!(args.end_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
                assert_eq!(args.method, NormalizationMethod::RelativeMagnitude);
            }
            _ => panic!("expected similar"),
        }

        let cli = Cli::try_parse_from(["atm-trend", "similar", "--date", "2024-03-04", "--method", "pure-shape"]).unwrap();
        match cli.command {
            Commands::Similar(args) => assert_eq!(args.method, NormalizationMethod::PureShape),
            _ => panic!("expected similar"),
        }
    }

    #[test]
    fn test_trend_start_is_optional() {
        let cli = Cli::try_parse_from(["atm-trend", "trend", "--pick", "2"]).unwrap();
        match cli.command {
            Commands::Trend(args) => {
                assert_eq!(args.start, None);
                assert_eq!(args.pick, 2);
            }
            _ => panic!("expected trend"),
        }
        assert!(Cli::try_parse_from(["atm-trend", "trend", "--start", "2024-03-04", "--pick", "1"]).is_err());
    }
}
