//! Driver for the range analysis.
use crate::cmdline::{Assumption, Opts};
use hls_ir::{Function, Id, Printer};
use hls_opt::analysis::range_analysis::{
    DeclaredTypeOracle, Interval, NodeContainer, PointsToOracle,
    RangeAnalysis, RangeAnalysisConfig, SolveStats,
};
use hls_opt::traversal::describe;
use hls_utils::{Error, HlsResult};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{self, Write},
};

/// A single function or a list of functions.
#[derive(Deserialize)]
#[serde(untagged)]
enum Input {
    One(Function),
    Many(Vec<Function>),
}

#[derive(Serialize)]
struct ValueRange {
    name: String,
    range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    lo: Option<i128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hi: Option<i128>,
}

impl ValueRange {
    fn new(name: Id, range: &Interval) -> Self {
        let bounds = range.bounds();
        Self {
            name: name.to_string(),
            range: range.to_string(),
            lo: bounds.map(|(lo, _)| lo),
            hi: bounds.map(|(_, hi)| hi),
        }
    }
}

#[derive(Serialize)]
struct Report {
    function: String,
    values: Vec<ValueRange>,
    memories: Vec<ValueRange>,
    warnings: Vec<String>,
    evaluations: u64,
    exhausted: bool,
}

/// Run the analysis from the command line.
pub fn run_analysis() -> HlsResult<()> {
    let opts = Opts::get_opts()?;

    // enable tracing
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    if opts.list_opts {
        print!("{}", describe::<RangeAnalysis>());
        return Ok(());
    }

    let funcs = read_input(&opts)?;
    let mut config = RangeAnalysisConfig::from_opts(&opts.extra_opts);
    if opts.dump_graph.is_some() {
        config.dump_graph.clone_from(&opts.dump_graph);
    }

    let mut out = opts.output.get_write()?;
    let mut reports = vec![];
    for func in &funcs {
        if opts.print_ir {
            Printer::write_function(func, &mut out)?;
        }
        let nc = analyze(func, config.clone(), &opts.assumptions)?;
        let report = report(func, &nc);
        if opts.json {
            reports.push(report);
        } else {
            write_table(&report, &mut out)?;
        }
    }
    if opts.json {
        serde_json::to_writer_pretty(&mut out, &reports)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn read_input(opts: &Opts) -> HlsResult<Vec<Function>> {
    let text = match &opts.file {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            Error::invalid_file(format!("{}: {e}", path.display()))
        })?,
        None => io::read_to_string(io::stdin())?,
    };
    Ok(match serde_json::from_str(&text)? {
        Input::One(func) => vec![func],
        Input::Many(funcs) => funcs,
    })
}

fn analyze(
    func: &Function,
    config: RangeAnalysisConfig,
    assumptions: &[Assumption],
) -> HlsResult<NodeContainer> {
    let mut nc = NodeContainer::new(config);
    for a in assumptions {
        let value = Id::new(&a.value);
        let Some(ty) = func.value_type(value).filter(|ty| ty.is_integral())
        else {
            log::debug!("`{}` has no integer value `{value}`", func.name);
            continue;
        };
        let range = Interval::new(ty.sign(), ty.bitwidth(), a.lo, a.hi);
        nc.with_constraint(value, range);
    }
    let in_func = |e: Error| {
        e.with_post_msg(Some(format!("in function `{}`", func.name)))
    };
    nc.build(func, &DeclaredTypeOracle, &PointsToOracle)
        .map_err(|e| in_func(e.into()))?;
    nc.solve().map_err(|e| in_func(e.into()))?;
    Ok(nc)
}

fn report(func: &Function, nc: &NodeContainer) -> Report {
    let memories = func
        .memories
        .iter()
        .filter_map(|m| {
            nc.memory_range_of(m.name)
                .map(|r| ValueRange::new(m.name, &r))
        })
        .collect();
    let SolveStats {
        evaluations,
        exhausted,
        ..
    } = nc.stats();
    Report {
        function: func.name.to_string(),
        values: nc
            .ranges()
            .iter()
            .map(|(id, r)| ValueRange::new(*id, r))
            .collect(),
        memories,
        warnings: nc.warnings().iter().map(|w| w.to_string()).collect(),
        evaluations,
        exhausted,
    }
}

fn write_table<W: Write>(report: &Report, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}:", report.function)?;
    let width = report
        .values
        .iter()
        .chain(&report.memories)
        .map(|v| v.name.len())
        .max()
        .unwrap_or(0);
    for v in &report.values {
        writeln!(out, "  {:width$}  {}", v.name, v.range)?;
    }
    if !report.memories.is_empty() {
        writeln!(
            out,
            "  memory: {}",
            report
                .memories
                .iter()
                .map(|m| format!("{} {}", m.name, m.range))
                .join(", ")
        )?;
    }
    if report.exhausted {
        writeln!(
            out,
            "  (evaluation budget exhausted after {} evaluations)",
            report.evaluations
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hls_ir::{BinOp, FunctionBuilder, Operand, Sign, Type};

    #[test]
    fn table_lists_values_by_name() {
        let u8t = Type::unsigned(8);
        let func = FunctionBuilder::new("mask")
            .param("x", u8t.clone())
            .binary(
                "y",
                u8t.clone(),
                BinOp::And,
                Operand::var("x"),
                Operand::int(15, u8t),
            )
            .build();
        let assume = [Assumption {
            value: "x".to_string(),
            lo: 0,
            hi: 200,
        }];
        let nc =
            analyze(&func, RangeAnalysisConfig::default(), &assume).unwrap();
        let mut out = vec![];
        write_table(&report(&func, &nc), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "mask:");
        assert!(lines[1].starts_with("  x"));
        assert!(lines[1].ends_with(&Interval::new(Sign::Unsigned, 8, 0, 200).to_string()));
        assert!(lines[2].starts_with("  y"));
        assert_eq!(lines.len(), 3);
    }
}
