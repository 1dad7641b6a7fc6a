//! PivotLab CLI: database setup, data import, level pipeline, and backtests.
//!
//! Commands:
//! - `init-db`: create the SQLite schema
//! - `import`: load OHLCV bars from CSV into `price_data`
//! - `seed`: write synthetic bars (linear ramp or random walk)
//! - `intervals`: list timeframes stored for a symbol
//! - `pipeline`: run the multi-timeframe level pipeline
//! - `levels`: print combined (or one timeframe's filtered) levels
//! - `backtest`: run the SMA crossover strategy for one or more symbols

mod logging;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use pivotlab_core::data::{linear_ramp, random_walk};
use pivotlab_core::domain::Interval;
use pivotlab_core::levels::ObservationSource;
use pivotlab_core::store::{upsert_price_bars, MarketStore, SqliteStore};
use pivotlab_runner::{
    import_csv, run_backtests_parallel, run_level_pipeline, save_artifacts, BacktestConfig, BacktestResult,
    CostModelConfig, PipelineConfig, PipelineReport,
};

use logging::{init_logging, LogFormat};

#[derive(Parser)]
#[command(
    name = "pivotlab",
    version,
    about = "PivotLab CLI: pivot support/resistance levels and SMA crossover backtests"
)]
struct Cli {
    /// SQLite database file.
    #[arg(long, global = true, env = "PIVOTLAB_DB", default_value = "pivotlab.db")]
    db: PathBuf,

    /// Log level filter (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SeedKind {
    Ramp,
    Walk,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema (idempotent).
    InitDb,
    /// Import bars from a CSV file (timestamp,open,high,low,close,volume).
    Import {
        file: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        interval: Interval,
    },
    /// Write synthetic bars into the database.
    Seed {
        #[arg(long)]
        symbol: String,
        /// Timeframes to seed (comma separated).
        #[arg(long, value_delimiter = ',', default_value = "15m,1h,daily,weekly")]
        intervals: Vec<Interval>,
        #[arg(long, value_enum, default_value_t = SeedKind::Walk)]
        kind: SeedKind,
        #[arg(long, default_value_t = 500)]
        bars: usize,
        /// First bar date (YYYY-MM-DD).
        #[arg(long, default_value = "2024-01-01")]
        start: String,
        /// Ramp starting price.
        #[arg(long, default_value_t = 1.2)]
        base: f64,
        /// Ramp increment per bar.
        #[arg(long, default_value_t = 0.0001)]
        step: f64,
    },
    /// List the timeframes stored for a symbol.
    Intervals {
        #[arg(long)]
        symbol: String,
    },
    /// Compute, cluster, filter, and combine levels.
    Pipeline {
        /// TOML config file. Flags below are ignored when given.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long, value_delimiter = ',')]
        timeframes: Vec<Interval>,
        #[arg(long)]
        k: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        /// Cluster pivot S1/R1 values (pivots) or bar highs and lows (high_low).
        #[arg(long)]
        source: Option<ObservationSource>,
        #[arg(long)]
        rsi_window: Option<usize>,
        #[arg(long)]
        rsi_threshold: Option<f64>,
        /// Take RSI and reference price from this timeframe.
        #[arg(long)]
        momentum_interval: Option<Interval>,
        /// Print the full report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print stored levels.
    Levels {
        #[arg(long)]
        symbol: String,
        /// Show one timeframe's filtered levels instead of the combined set.
        #[arg(long)]
        interval: Option<Interval>,
    },
    /// Run the strategy backtest.
    Backtest {
        /// TOML config files, one per run. Flags below are ignored when given.
        #[arg(long)]
        config: Vec<PathBuf>,
        /// Symbols (comma separated); runs in parallel.
        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,
        #[arg(long, default_value = "1h")]
        interval: Interval,
        #[arg(long)]
        sma_short: Option<usize>,
        #[arg(long)]
        sma_long: Option<usize>,
        #[arg(long)]
        stake: Option<f64>,
        #[arg(long)]
        slippage_bps: Option<f64>,
        #[arg(long)]
        commission_bps: Option<f64>,
        /// Write manifest.json, CSVs, and report.md per run here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::InitDb => {
            SqliteStore::open(&cli.db)?;
            println!("Initialized {}", cli.db.display());
            Ok(())
        }
        Commands::Import {
            file,
            symbol,
            interval,
        } => {
            let mut store = SqliteStore::open(&cli.db)?;
            let report = import_csv(&mut store, &file, &symbol, interval)?;
            println!(
                "Imported {} bars for {symbol} {interval} ({} skipped rows, {} failed writes)",
                report.writes.written,
                report.skipped,
                report.writes.failed()
            );
            Ok(())
        }
        Commands::Seed {
            symbol,
            intervals,
            kind,
            bars,
            start,
            base,
            step,
        } => run_seed(&cli.db, &symbol, &intervals, kind, bars, &start, base, step),
        Commands::Intervals { symbol } => {
            let store = SqliteStore::open(&cli.db)?;
            for interval in store.intervals(&symbol)? {
                println!("{interval}");
            }
            Ok(())
        }
        Commands::Pipeline {
            config,
            symbol,
            timeframes,
            k,
            seed,
            source,
            rsi_window,
            rsi_threshold,
            momentum_interval,
            json,
        } => {
            let config = match config {
                Some(path) => PipelineConfig::from_file(&path)?,
                None => {
                    let Some(symbol) = symbol else {
                        bail!("one of --config or --symbol is required");
                    };
                    let mut config = PipelineConfig::new(symbol);
                    if !timeframes.is_empty() {
                        config.timeframes = timeframes;
                    }
                    if let Some(k) = k {
                        config.clustering.k = k;
                    }
                    if let Some(seed) = seed {
                        config.clustering.seed = seed;
                    }
                    if let Some(source) = source {
                        config.clustering.source = source;
                    }
                    if let Some(w) = rsi_window {
                        config.rsi.window = w;
                    }
                    if let Some(t) = rsi_threshold {
                        config.rsi.threshold = t;
                    }
                    config.rsi.momentum_interval = momentum_interval;
                    config.validate()?;
                    config
                }
            };
            let mut store = SqliteStore::open(&cli.db)?;
            let report = run_level_pipeline(&mut store, &config)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_pipeline_report(&report);
            }
            if report.timeframes.is_empty() {
                bail!("every timeframe failed for {}", report.symbol);
            }
            Ok(())
        }
        Commands::Levels { symbol, interval } => {
            let store = SqliteStore::open(&cli.db)?;
            let levels: Vec<f64> = match interval {
                Some(interval) => store.filtered_levels(&symbol, interval)?,
                None => store.combined_levels(&symbol)?.into_iter().map(|c| c.value).collect(),
            };
            if levels.is_empty() {
                println!("No levels stored for {symbol}");
            }
            for level in levels {
                println!("{level:.5}");
            }
            Ok(())
        }
        Commands::Backtest {
            config,
            symbols,
            interval,
            sma_short,
            sma_long,
            stake,
            slippage_bps,
            commission_bps,
            output_dir,
        } => {
            let configs = if !config.is_empty() {
                config
                    .iter()
                    .map(|path| BacktestConfig::from_file(path).with_context(|| format!("loading {}", path.display())))
                    .collect::<Result<Vec<_>>>()?
            } else {
                if symbols.is_empty() {
                    bail!("one of --config or --symbols is required");
                }
                symbols
                    .iter()
                    .map(|symbol| {
                        let mut c = BacktestConfig::new(symbol.as_str(), interval);
                        if let Some(p) = sma_short {
                            c.strategy.sma_short_period = p;
                        }
                        if let Some(p) = sma_long {
                            c.strategy.sma_long_period = p;
                        }
                        if let Some(s) = stake {
                            c.strategy.stake = s;
                        }
                        if slippage_bps.is_some() || commission_bps.is_some() {
                            c.costs = CostModelConfig::Bps {
                                slippage_bps: slippage_bps.unwrap_or(0.0),
                                commission_bps: commission_bps.unwrap_or(0.0),
                            };
                        }
                        c
                    })
                    .collect()
            };
            run_backtest_cmd(&cli.db, &configs, output_dir.as_deref())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_seed(
    db: &Path,
    symbol: &str,
    intervals: &[Interval],
    kind: SeedKind,
    bars: usize,
    start: &str,
    base: f64,
    step: f64,
) -> Result<()> {
    let start: NaiveDateTime = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start '{start}', expected YYYY-MM-DD"))?
        .and_hms_opt(0, 0, 0)
        .context("invalid start time")?;

    let mut store = SqliteStore::open(db)?;
    for &interval in intervals {
        let generated = match kind {
            SeedKind::Ramp => linear_ramp(start, interval, bars, base, step),
            SeedKind::Walk => random_walk(&format!("{symbol}/{interval}"), start, bars, interval),
        };
        let report = upsert_price_bars(&mut store, symbol, interval, &generated);
        println!("Seeded {} {symbol} {interval} bars", report.written);
    }
    Ok(())
}

fn run_backtest_cmd(db: &Path, configs: &[BacktestConfig], output_dir: Option<&Path>) -> Result<()> {
    let store = SqliteStore::open(db)?;
    let outcomes = run_backtests_parallel(&store, configs);

    let mut failed = 0usize;
    for (symbol, outcome) in &outcomes {
        match outcome {
            Ok(result) => {
                print_summary(result);
                if let Some(dir) = output_dir {
                    let run_dir = save_artifacts(result, dir)?;
                    println!("Artifacts saved to: {}", run_dir.display());
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("Backtest failed for {symbol}: {e}");
            }
        }
    }
    if failed == outcomes.len() {
        bail!("all {failed} backtest(s) failed");
    }
    Ok(())
}

fn print_pipeline_report(report: &PipelineReport) {
    println!();
    println!("=== Level Pipeline: {} ===", report.symbol);
    for tf in &report.timeframes {
        println!(
            "{:<7} bars {:>6}  pivots {:>6}  bands {}  RSI {:>6.2} ({:?})  kept {}",
            tf.interval.as_str(),
            tf.prepare.clean.output,
            tf.pivots,
            tf.bands.len(),
            tf.filter.rsi,
            tf.filter.bias,
            tf.filter.levels.len()
        );
        if let Some(range) = tf.range {
            println!("        range support {:.5}  resistance {:.5}", range.support, range.resistance);
        }
    }
    for failure in &report.failures {
        println!("{:<7} FAILED: {}", failure.interval.as_str(), failure.error);
    }
    println!();
    println!("Combined levels ({}):", report.combined.len());
    for level in &report.combined {
        println!("  {level:.5}");
    }
    if report.row_failures() > 0 {
        println!("WARNING: {} row write(s) failed", report.row_failures());
    }
    println!();
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {} ({})", result.symbol, result.interval);
    println!("Period:         {} to {}", result.start, result.end);
    println!("Bars:           {} ({} warmup)", result.bar_count, result.warmup_bars);
    println!("Cost Model:     {}", result.cost_model);
    println!("Trades:         {}", m.trade_count);
    println!();
    println!("--- Performance ---");
    println!("Total Return:   {:.4}%", m.total_return * 100.0);
    println!("Max Drawdown:   {:.4}%", m.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Net PnL:        {:.6}", m.net_pnl);
    println!("Final Equity:   {:.2}", result.final_equity());
    println!("Final State:    {:?}", result.final_state);
    if let Some(order) = &result.unfilled_order {
        println!(
            "Unfilled:       {:?} {:?} submitted on bar {}",
            order.side, order.action, order.submitted_bar
        );
    }
    println!();
}
