use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use simbus_compiler::{compile, ModelDef};
use simbus_runtime::{Kernel, SignalTrace, SimConfig};

/// Compile a block-diagram model and run it to completion.
#[derive(Debug, Parser)]
#[command(name = "simbus", version, about)]
struct Cli {
    /// Path to a JSON model description (blocks + connections).
    model: PathBuf,

    /// Optional JSON run configuration (solver/start_time/stop_time/step_size).
    /// Falls back to `SimConfig::default()` when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write every recorded signal trace to this path. The format is chosen
    /// from the extension: `.csv` writes a columnar time series, anything
    /// else writes the traces as a JSON object.
    #[arg(long)]
    out: Option<PathBuf>,
}

/// Writes one row per recorded sample, columns `time,<block:port>,...`.
/// Grounded on `pictorus-internal`'s `CsvLogger::add_samples`/
/// `format_header_csv`/`format_samples_csv`, adapted from "one struct per
/// tick" logging to this crate's "one trace per signal" recording shape:
/// every signal here shares the same report ticks, so the header is written
/// once and each row reuses the first signal's `times` as the row clock.
fn format_csv(traces: &HashMap<String, SignalTrace>) -> String {
    let mut keys: Vec<&String> = traces.keys().collect();
    keys.sort();

    let mut out = String::from("time");
    for key in &keys {
        out.push(',');
        out.push_str(key);
    }
    out.push('\n');

    let rows = keys.first().map_or(0, |k| traces[*k].times.len());
    for row in 0..rows {
        out.push_str(&traces[keys[0]].times[row].to_string());
        for key in &keys {
            out.push(',');
            out.push_str(&traces[*key].values[row].to_string());
        }
        out.push('\n');
    }
    out
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let model_src = fs::read_to_string(&cli.model)
        .with_context(|| format!("reading model file {}", cli.model.display()))?;
    let model: ModelDef =
        serde_json::from_str(&model_src).context("parsing model file as JSON")?;

    let config = match &cli.config {
        Some(path) => {
            let config_src = fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            serde_json::from_str(&config_src).context("parsing config file as JSON")?
        }
        None => SimConfig::default(),
    };

    log::info!(
        "compiling model from {} (solver = {:?})",
        cli.model.display(),
        config.solver
    );
    let compiled = compile(model).context("compiling model")?;
    log::info!("compiled {} blocks", compiled.blocks.len());

    let mut kernel = Kernel::new(compiled, &config);
    kernel.run(|| false).context("running simulation")?;

    println!("final time: {:.6}", kernel.tick.t);
    let mut keys: Vec<&String> = kernel.traces.keys().collect();
    keys.sort();
    for key in keys {
        let trace = &kernel.traces[key];
        if let Some(last) = trace.values.last() {
            println!("{key}: {last:.6}");
        }
    }

    if let Some(out_path) = &cli.out {
        let is_csv = out_path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        let rendered = if is_csv {
            format_csv(&kernel.traces)
        } else {
            serde_json::to_string_pretty(&kernel.traces).context("serializing traces")?
        };
        fs::write(out_path, rendered)
            .with_context(|| format!("writing output file {}", out_path.display()))?;
        log::info!("wrote traces to {}", out_path.display());
    }

    Ok(())
}
