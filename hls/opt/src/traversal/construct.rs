use hls_utils::OutputFile;
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;

#[derive(Clone, Debug, PartialEq)]
/// The value returned from parsing an option.
pub enum ParseVal {
    /// A boolean option.
    Bool(bool),
    /// A number option.
    Num(i64),
    /// A bare word.
    Str(String),
    /// A list of values.
    List(Vec<ParseVal>),
    /// An output stream (stdout, stderr, file name)
    OutStream(OutputFile),
}

impl ParseVal {
    pub fn bool(&self) -> Option<bool> {
        match self {
            ParseVal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn num(&self) -> Option<i64> {
        match self {
            ParseVal::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// Non-negative number.
    pub fn pos_num(&self) -> Option<u64> {
        self.num().and_then(|n| u64::try_from(n).ok())
    }

    /// Elements of a list of words. Other elements are skipped.
    pub fn str_list(&self) -> Vec<&str> {
        match self {
            ParseVal::List(l) => l
                .iter()
                .filter_map(|v| match v {
                    ParseVal::Str(s) => Some(s.as_str()),
                    _ => None,
                })
                .collect(),
            _ => vec![],
        }
    }

    /// Returns an output stream if it is not the null stream
    pub fn not_null_outstream(&self) -> Option<OutputFile> {
        match self {
            ParseVal::OutStream(OutputFile::Null) => None,
            ParseVal::OutStream(o) => Some(o.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Display for ParseVal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseVal::Bool(b) => write!(f, "{b}"),
            ParseVal::Num(n) => write!(f, "{n}"),
            ParseVal::Str(s) => write!(f, "{s}"),
            ParseVal::List(l) => write!(f, "[{}]", l.iter().join(", ")),
            ParseVal::OutStream(o) => write!(f, "{o}"),
        }
    }
}

/// Option that can be passed to an analysis.
pub struct PassOpt {
    name: &'static str,
    description: &'static str,
    default: ParseVal,
    parse: fn(&str) -> Option<ParseVal>,
}

impl PassOpt {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        default: ParseVal,
        parse: fn(&str) -> Option<ParseVal>,
    ) -> Self {
        Self {
            name,
            description,
            default,
            parse,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn description(&self) -> &'static str {
        self.description
    }

    pub const fn default(&self) -> &ParseVal {
        &self.default
    }

    fn parse(&self, s: &str) -> Option<ParseVal> {
        (self.parse)(s)
    }

    /// Parse of list using parser for the elements.
    /// Returns `None` if any of the elements fail to parse.
    fn parse_list(
        s: &str,
        parse: fn(&str) -> Option<ParseVal>,
    ) -> Option<ParseVal> {
        s.split(',')
            .map(parse)
            .collect::<Option<Vec<_>>>()
            .map(ParseVal::List)
    }

    pub fn parse_bool(s: &str) -> Option<ParseVal> {
        match s {
            "true" => Some(ParseVal::Bool(true)),
            "false" => Some(ParseVal::Bool(false)),
            _ => None,
        }
    }

    /// Parse a number from a string.
    pub fn parse_num(s: &str) -> Option<ParseVal> {
        s.parse::<i64>().ok().map(ParseVal::Num)
    }

    /// Parse a comma separated list of non-empty words.
    pub fn parse_str_list(s: &str) -> Option<ParseVal> {
        Self::parse_list(s, |w| {
            let w = w.trim();
            (!w.is_empty()).then(|| ParseVal::Str(w.to_string()))
        })
    }

    pub fn parse_outstream(s: &str) -> Option<ParseVal> {
        s.parse::<OutputFile>().ok().map(ParseVal::OutStream)
    }
}

/// Things with a name, a description and a set of options.
pub trait Named {
    /// The name used to address the options on the command line.
    fn name() -> &'static str;
    /// A short description.
    fn description() -> &'static str;
    /// Set of options that can be passed.
    fn opts() -> Vec<PassOpt> {
        vec![]
    }
}

/// Collect the values of the options of `N` from `extra_opts`, filling in
/// the defaults of options without a value.
///
/// The format of an option is either `name:opt` or `name:opt=val`. A bare
/// `name:opt` sets a boolean option.
pub fn get_opts<N: Named>(
    extra_opts: &[String],
) -> LinkedHashMap<&'static str, ParseVal> {
    let opts = N::opts();
    let n = N::name();
    let mut values: LinkedHashMap<&'static str, ParseVal> = extra_opts
        .iter()
        .filter_map(|opt| {
            let (pass, rest) = opt.split_once(':')?;
            if pass != n {
                return None;
            }
            let mut splits = rest.splitn(2, '=');
            let name = splits.next()?;
            let Some(opt) = opts.iter().find(|o| o.name == name) else {
                log::warn!("Ignoring unknown option for `{n}`: {name}");
                return None;
            };
            let val = if let Some(v) = splits.next() {
                let Some(v) = opt.parse(v) else {
                    log::warn!(
                        "Ignoring invalid value for option `{n}:{}`: {v}",
                        opt.name(),
                    );
                    return None;
                };
                v
            } else {
                ParseVal::Bool(true)
            };
            Some((opt.name(), val))
        })
        .collect();

    if log::log_enabled!(log::Level::Debug) {
        log::debug!(
            "Extra options for {}: {}",
            n,
            values.iter().map(|(o, v)| format!("{o}->{v}")).join(", ")
        );
    }

    // For all options that were not provided with values, fill in the defaults.
    for opt in opts {
        if !values.contains_key(opt.name()) {
            values.insert(opt.name(), opt.default.clone());
        }
    }

    values
}

/// Usage text listing the options of `N`.
pub fn describe<N: Named>() -> String {
    let mut out = format!("{}: {}\n", N::name(), N::description());
    for opt in N::opts() {
        out.push_str(&format!(
            "  {}:{} (default: {})\n    {}\n",
            N::name(),
            opt.name(),
            opt.default(),
            opt.description()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Demo;

    impl Named for Demo {
        fn name() -> &'static str {
            "demo"
        }

        fn description() -> &'static str {
            "options for testing"
        }

        fn opts() -> Vec<PassOpt> {
            vec![
                PassOpt::new(
                    "flag",
                    "a flag",
                    ParseVal::Bool(false),
                    PassOpt::parse_bool,
                ),
                PassOpt::new("n", "a number", ParseVal::Num(3), PassOpt::parse_num),
                PassOpt::new(
                    "words",
                    "some words",
                    ParseVal::List(vec![]),
                    PassOpt::parse_str_list,
                ),
            ]
        }
    }

    fn opts(args: &[&str]) -> LinkedHashMap<&'static str, ParseVal> {
        let args = args.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        get_opts::<Demo>(&args)
    }

    #[test]
    fn defaults_and_overrides() {
        let v = opts(&["demo:flag", "demo:n=7", "other:n=1", "demo:bogus=1"]);
        assert_eq!(v["flag"].bool(), Some(true));
        assert_eq!(v["n"].num(), Some(7));
        assert!(v["words"].str_list().is_empty());
    }

    #[test]
    fn invalid_values_keep_default() {
        let v = opts(&["demo:n=seven", "demo:words=a,,b"]);
        assert_eq!(v["n"].num(), Some(3));
        assert_eq!(v["words"], ParseVal::List(vec![]));
        let v = opts(&["demo:words=load, store"]);
        assert_eq!(v["words"].str_list(), vec!["load", "store"]);
    }

    #[test]
    fn description_lists_options() {
        let d = describe::<Demo>();
        assert!(d.starts_with("demo: options for testing"));
        assert!(d.contains("demo:n (default: 3)"));
    }
}
