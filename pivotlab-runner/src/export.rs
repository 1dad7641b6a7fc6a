//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape, fill tape, and equity curve for external tools
//! - **Markdown**: human-readable single-run report
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pivotlab_core::domain::{Fill, TradeRecord, TIMESTAMP_FORMAT};
use pivotlab_core::engine::EquityPoint;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export a trade list as CSV.
///
/// Columns: side, entry_bar, entry_time, entry_price, exit_bar, exit_time,
/// exit_price, quantity, gross_pnl, costs, net_pnl, bars_held
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "side",
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "quantity",
        "gross_pnl",
        "costs",
        "net_pnl",
        "bars_held",
    ])?;

    for t in trades {
        wtr.write_record([
            &format!("{:?}", t.side),
            &t.entry_bar.to_string(),
            &t.entry_time.format(TIMESTAMP_FORMAT).to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_bar.to_string(),
            &t.exit_time.format(TIMESTAMP_FORMAT).to_string(),
            &format!("{:.6}", t.exit_price),
            &format!("{:.6}", t.quantity),
            &format!("{:.6}", t.gross_pnl),
            &format!("{:.6}", t.costs),
            &format!("{:.6}", t.net_pnl),
            &t.bars_held.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Export the fill tape: one row per executed order.
pub fn export_fills_csv(fills: &[Fill]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "order_id",
        "bar_index",
        "timestamp",
        "side",
        "action",
        "price",
        "quantity",
        "commission",
        "slippage",
    ])?;
    for f in fills {
        wtr.write_record([
            &f.order_id.to_string(),
            &f.bar_index.to_string(),
            &f.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            &format!("{:?}", f.side),
            &format!("{:?}", f.action),
            &format!("{:.6}", f.price),
            &format!("{:.6}", f.quantity),
            &format!("{:.6}", f.commission),
            &format!("{:.6}", f.slippage),
        ])?;
    }
    finish(wtr)
}

/// Export the bar-by-bar equity curve.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "cash", "position", "close", "equity"])?;
    for p in equity_curve {
        wtr.write_record([
            &p.bar_index.to_string(),
            &p.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            &format!("{:.2}", p.cash),
            &format!("{:.6}", p.position),
            &format!("{:.6}", p.close),
            &format!("{:.2}", p.equity),
        ])?;
    }
    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates a directory named `{symbol}_{interval}_{timestamp}/` under
/// `output_dir` containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `trades.csv`, `fills.csv`, `equity.csv`
/// - `report.md`
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}_{}",
        result.symbol,
        result.interval,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let files = [
        ("manifest.json", export_json(result)?),
        ("trades.csv", export_trades_csv(&result.trades)?),
        ("fills.csv", export_fills_csv(&result.fills)?),
        ("equity.csv", export_equity_csv(&result.equity_curve)?),
        ("report.md", generate_report(result)),
    ];
    for (name, contents) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let m = &result.metrics;
    let c = &result.config;
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} ({}) |\n", result.symbol, result.interval));
    md.push_str(&format!("| Period | {} to {} |\n", result.start, result.end));
    md.push_str(&format!("| Initial Cash | {:.2} |\n", c.initial_cash));
    md.push_str(&format!(
        "| Bars | {} ({} warmup) |\n",
        result.bar_count, result.warmup_bars
    ));
    md.push_str(&format!("| Cost Model | {} |\n", result.cost_model));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    md.push_str(&format!("| Config Hash | {} |\n", result.config_hash));
    md.push('\n');

    md.push_str("## Strategy\n\n");
    md.push_str(&format!(
        "- SMA crossover: {} / {}\n- Bollinger exit: period {}, devfactor {}\n- Stake: {}\n\n",
        c.sma_short_period, c.sma_long_period, c.bb_period, c.bb_devfactor, c.stake
    ));

    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Total Return | {:.4}% |\n", m.total_return * 100.0));
    md.push_str(&format!("| Max Drawdown | {:.4}% |\n", m.max_drawdown * 100.0));
    md.push_str(&format!("| Trades | {} |\n", m.trade_count));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
    md.push_str(&format!("| Net PnL | {:.6} |\n", m.net_pnl));
    md.push_str(&format!("| Avg Bars Held | {:.1} |\n", m.avg_bars_held));
    md.push_str(&format!("| Final Equity | {:.2} |\n", result.final_equity()));
    md.push_str(&format!("| Final State | {:?} |\n", result.final_state));
    if let Some(order) = &result.unfilled_order {
        md.push_str(&format!(
            "| Unfilled Order | {:?} {:?} from bar {} |\n",
            order.side, order.action, order.submitted_bar
        ));
    }
    md.push('\n');

    if !result.trades.is_empty() {
        md.push_str("## Trades\n\n");
        md.push_str("| Side | Entry | Exit | Entry Price | Exit Price | Net PnL | Bars |\n");
        md.push_str("| --- | --- | --- | --- | --- | --- | --- |\n");
        for t in &result.trades {
            md.push_str(&format!(
                "| {:?} | {} | {} | {:.5} | {:.5} | {:.6} | {} |\n",
                t.side, t.entry_time, t.exit_time, t.entry_price, t.exit_price, t.net_pnl, t.bars_held
            ));
        }
    }

    md
}
