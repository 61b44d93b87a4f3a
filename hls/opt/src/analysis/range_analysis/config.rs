use super::OpKind;
use crate::traversal::{Named, ParseVal, PassOpt, get_opts};
use bon::Builder;
use hls_utils::OutputFile;

/// Tuning knobs of the range analysis.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct RangeAnalysisConfig {
    /// Number of times a value may grow during widening before its bounds
    /// are pushed to the next jump-set constant.
    #[builder(default = 16)]
    pub widening_threshold: u32,
    /// Run the narrowing phase after widening.
    #[builder(default = true)]
    pub narrowing: bool,
    /// Number of times narrowing may shrink one value.
    #[builder(default = 8)]
    pub narrowing_limit: u32,
    /// Widen to program constants instead of the extremes of the type.
    #[builder(default = true)]
    pub jump_set: bool,
    /// Use static initializers of memory objects for loads.
    #[builder(default = true)]
    pub fold_initializers: bool,
    /// Stop after this many operation evaluations and fall back to the
    /// declared type of every computed value.
    pub max_evaluations: Option<u64>,
    /// Operation kinds whose transfer functions are ignored. Their results
    /// keep their a-priori bound.
    #[builder(default)]
    pub disabled_ops: Vec<OpKind>,
    /// Where to write the solved constraint graph in dot format.
    pub dump_graph: Option<OutputFile>,
}

impl Default for RangeAnalysisConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Names the range analysis options for `-x range-analysis:opt=val`.
pub struct RangeAnalysis;

impl Named for RangeAnalysis {
    fn name() -> &'static str {
        "range-analysis"
    }

    fn description() -> &'static str {
        "infer the range of every integer value"
    }

    fn opts() -> Vec<PassOpt> {
        vec![
            PassOpt::new(
                "widen-threshold",
                "updates of a value before its bounds are widened",
                ParseVal::Num(16),
                PassOpt::parse_num,
            ),
            PassOpt::new(
                "no-narrowing",
                "skip the narrowing phase",
                ParseVal::Bool(false),
                PassOpt::parse_bool,
            ),
            PassOpt::new(
                "narrowing-limit",
                "updates of a value during narrowing",
                ParseVal::Num(8),
                PassOpt::parse_num,
            ),
            PassOpt::new(
                "no-jump-set",
                "widen straight to the bounds of the type",
                ParseVal::Bool(false),
                PassOpt::parse_bool,
            ),
            PassOpt::new(
                "no-init-fold",
                "ignore static initializers of memory objects",
                ParseVal::Bool(false),
                PassOpt::parse_bool,
            ),
            PassOpt::new(
                "max-evals",
                "operation evaluations before giving up (0: no limit)",
                ParseVal::Num(0),
                PassOpt::parse_num,
            ),
            PassOpt::new(
                "no-ops",
                "comma separated operation kinds to ignore",
                ParseVal::List(vec![]),
                PassOpt::parse_str_list,
            ),
            PassOpt::new(
                "dump-graph",
                "write the solved constraint graph in dot format",
                ParseVal::OutStream(OutputFile::Null),
                PassOpt::parse_outstream,
            ),
        ]
    }
}

impl RangeAnalysisConfig {
    /// Configuration from `-x range-analysis:...` command line options.
    pub fn from_opts(extra_opts: &[String]) -> Self {
        let opts = get_opts::<RangeAnalysis>(extra_opts);
        let num = |name: &str, default: u32| {
            opts.get(name)
                .and_then(ParseVal::pos_num)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(default)
        };
        let flag =
            |name: &str| opts.get(name).and_then(ParseVal::bool).unwrap_or(false);

        let disabled_ops = opts
            .get("no-ops")
            .map(ParseVal::str_list)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|w| match w.parse::<OpKind>() {
                Ok(k) => Some(k),
                Err(e) => {
                    log::warn!("Ignoring `range-analysis:no-ops` entry: {e}");
                    None
                }
            })
            .collect();

        Self::builder()
            .widening_threshold(num("widen-threshold", 16))
            .narrowing(!flag("no-narrowing"))
            .narrowing_limit(num("narrowing-limit", 8))
            .jump_set(!flag("no-jump-set"))
            .fold_initializers(!flag("no-init-fold"))
            .maybe_max_evaluations(
                opts.get("max-evals")
                    .and_then(ParseVal::pos_num)
                    .filter(|n| *n > 0),
            )
            .disabled_ops(disabled_ops)
            .maybe_dump_graph(
                opts.get("dump-graph")
                    .and_then(ParseVal::not_null_outstream),
            )
            .build()
    }

    pub fn is_disabled(&self, kind: OpKind) -> bool {
        self.disabled_ops.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(a: &[&str]) -> Vec<String> {
        a.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_match_builder() {
        assert_eq!(RangeAnalysisConfig::from_opts(&[]), RangeAnalysisConfig::default());
        let c = RangeAnalysisConfig::default();
        assert_eq!(c.widening_threshold, 16);
        assert!(c.narrowing && c.jump_set && c.fold_initializers);
        assert_eq!(c.max_evaluations, None);
    }

    #[test]
    fn command_line_options() {
        let c = RangeAnalysisConfig::from_opts(&args(&[
            "range-analysis:widen-threshold=2",
            "range-analysis:no-narrowing",
            "range-analysis:max-evals=100",
            "range-analysis:no-ops=load,bogus,sigma",
            "range-analysis:dump-graph=<err>",
        ]));
        assert_eq!(c.widening_threshold, 2);
        assert!(!c.narrowing);
        assert_eq!(c.max_evaluations, Some(100));
        assert_eq!(c.disabled_ops, vec![OpKind::Load, OpKind::Sigma]);
        assert!(c.is_disabled(OpKind::Sigma));
        assert_eq!(c.dump_graph, Some(OutputFile::Stderr));
    }
}
