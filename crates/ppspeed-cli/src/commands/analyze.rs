// Command handler for: Analyze
//
// Loads the protocol, builds the stage tree (on a supervised worker thread
// when a wall-clock limit is set), prints the summary or the JSON report and
// optionally exports the tree in DOT format.

use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use miette::IntoDiagnostic;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use ppspeed_engine::result::AnalysisReport;
use ppspeed_engine::stage_tree::AnalysisOptions;
use ppspeed_engine::visualization::stage_tree_dot;
use ppspeed_ir::Protocol;

use super::helpers::{load_protocol, resolve_source};

pub(crate) struct AnalyzeConfig {
    pub(crate) protocol: String,
    pub(crate) args: Option<String>,
    pub(crate) depth: Option<usize>,
    pub(crate) no_witness: bool,
    pub(crate) implication: bool,
    pub(crate) json: bool,
    pub(crate) tree: Option<PathBuf>,
    pub(crate) struct_only: bool,
    pub(crate) timeout_secs: u64,
    pub(crate) solver_timeout_secs: u64,
}

impl AnalyzeConfig {
    pub(crate) fn options(&self) -> AnalysisOptions {
        AnalysisOptions {
            max_depth: self.depth,
            check_termination_witness: !self.no_witness,
            use_t_invariants: !self.implication,
            solver_timeout_secs: self.solver_timeout_secs,
        }
    }
}

/// What the analysis thread hands back.
pub(crate) struct AnalysisOutput {
    pub(crate) report: AnalysisReport,
    pub(crate) dot: Option<String>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a AnalysisReport,
    elapsed: Value,
}

pub(crate) fn run_analysis(
    protocol: &Protocol,
    options: &AnalysisOptions,
    dot: Option<bool>,
) -> miette::Result<AnalysisOutput> {
    let tree = ppspeed_engine::analyze(protocol, options).into_diagnostic()?;
    Ok(AnalysisOutput {
        report: AnalysisReport::from_tree(&tree, protocol),
        dot: dot.map(|struct_only| stage_tree_dot(&tree, protocol, struct_only)),
    })
}

/// Run the analysis, giving up after `timeout_secs` (0 waits forever).
///
/// `Ok(None)` means the limit expired. The worker is left running; the
/// caller is expected to exit.
pub(crate) fn run_supervised(
    protocol: Protocol,
    options: AnalysisOptions,
    dot: Option<bool>,
    timeout_secs: u64,
) -> miette::Result<Option<AnalysisOutput>> {
    if timeout_secs == 0 {
        return run_analysis(&protocol, &options, dot).map(Some);
    }

    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("ppspeed-analysis".into())
        .spawn(move || {
            // The receiver is gone once the supervisor has timed out.
            let _ = tx.send(run_analysis(&protocol, &options, dot));
        })
        .into_diagnostic()?;

    match rx.recv_timeout(Duration::from_secs(timeout_secs)) {
        Ok(result) => result.map(Some),
        Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            miette::bail!("Analysis thread terminated without a result")
        }
    }
}

pub(crate) fn run_analyze_command(config: AnalyzeConfig) -> miette::Result<()> {
    let started = Instant::now();
    let source = resolve_source(&config.protocol, config.args.as_deref())?;
    let protocol = load_protocol(source.as_ref())?;
    let loading = started.elapsed().as_secs_f64();

    let options = config.options();
    let dot = config.tree.as_ref().map(|_| config.struct_only);
    let started = Instant::now();
    let outcome = run_supervised(protocol, options, dot, config.timeout_secs)?;
    let tree_secs = started.elapsed().as_secs_f64();

    let Some(output) = outcome else {
        warn!(timeout = config.timeout_secs, "analysis timed out");
        if config.json {
            let report = json!({"elapsed": {"loading": loading, "tree": "timeout"}});
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        miette::bail!("Analysis timed out");
    };
    info!(seconds = tree_secs, stages = output.report.stages, "analysis finished");

    if let (Some(path), Some(dot)) = (&config.tree, &output.dot) {
        std::fs::write(path, dot).into_diagnostic()?;
        info!(path = %path.display(), "stage tree written");
    }

    if config.json {
        let report = JsonReport {
            report: &output.report,
            elapsed: json!({"loading": loading, "tree": tree_secs}),
        };
        println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
    } else {
        println!("{}", output.report);
        println!("Elapsed: loading {loading:.3}s, tree {tree_secs:.3}s");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppspeed_engine::stage_tree::Speed;
    use ppspeed_ir::generators::broadcast;

    fn config() -> AnalyzeConfig {
        AnalyzeConfig {
            protocol: "broadcast".into(),
            args: None,
            depth: None,
            no_witness: false,
            implication: false,
            json: false,
            tree: None,
            struct_only: false,
            timeout_secs: 0,
            solver_timeout_secs: 0,
        }
    }

    #[test]
    fn flags_map_onto_analysis_options() {
        let mut c = config();
        assert!(c.options().use_t_invariants);
        assert!(c.options().check_termination_witness);
        c.implication = true;
        c.no_witness = true;
        c.depth = Some(3);
        let options = c.options();
        assert!(!options.use_t_invariants);
        assert!(!options.check_termination_witness);
        assert_eq!(options.max_depth, Some(3));
    }

    #[test]
    fn supervised_run_returns_report_and_dot() {
        let protocol = broadcast().expect("generated");
        let output = run_supervised(protocol, AnalysisOptions::default(), Some(true), 60)
            .expect("analysis")
            .expect("within the limit");
        assert_eq!(output.report.speed, Some(Speed::QuadraticLog));
        assert!(output.dot.expect("dot").starts_with("digraph"));
    }

    #[test]
    fn unsupervised_run_skips_dot_when_not_requested() {
        let protocol = broadcast().expect("generated");
        let output = run_supervised(protocol, AnalysisOptions::default(), None, 0)
            .expect("analysis")
            .expect("no limit");
        assert!(output.dot.is_none());
        assert_eq!(output.report.termination, Some(true));
    }
}
