//! The parse session.
//!
//! A [`CliParser`] walks the token list once, left to right:
//! - `--name` / `-name` tokens are options, resolved with the following token
//!   as a candidate value (`--name=value` carries its value inline)
//! - anything else fills the next positional parameter
//!
//! Nothing aborts the pass. Unknown names, overflow positionals, values that
//! fail to coerce and required parameters never seen are all collected into
//! the [`ParseReport`].

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, error, trace};

use super::report::{ParseOutcome, ParseReport};
use crate::error::{CoerceError, SpecError};
use crate::spec::{CliSpec, Param};

/// Mutable state of one parse pass over a token list.
pub struct CliParser<'s, T> {
    spec: &'s CliSpec<T>,
    target: T,
    missing_params: Vec<String>,
    args: Vec<String>,
    arg_index: usize,
    param_index: usize,
    extra_args: Vec<String>,
    error_messages: BTreeMap<String, String>,
}

impl<'s, T> CliParser<'s, T> {
    /// Session over `args[arg_index..]` with a target from the spec's factory.
    pub fn new<I, S>(spec: &'s CliSpec<T>, args: I, arg_index: usize) -> Result<Self, SpecError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target = spec.create_default_instance()?;
        Ok(Self::with_target(spec, args, arg_index, target))
    }

    /// Session over `args[arg_index..]` that fills in an existing target.
    pub fn with_target<I, S>(spec: &'s CliSpec<T>, args: I, arg_index: usize, target: T) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            spec,
            target,
            missing_params: spec.required_params().to_vec(),
            args: args.into_iter().map(Into::into).collect(),
            arg_index,
            param_index: 0,
            extra_args: Vec::new(),
            error_messages: BTreeMap::new(),
        }
    }

    /// Consume every remaining token and finish the session.
    pub fn parse(mut self) -> ParseOutcome<T> {
        let args = std::mem::take(&mut self.args);
        while self.arg_index < args.len() {
            let next = args.get(self.arg_index + 1).map(String::as_str);
            let step = if self.parse_token(&args[self.arg_index], next) { 2 } else { 1 };
            self.arg_index += step;
        }
        debug!(
            missing = self.missing_params.len(),
            extra = self.extra_args.len(),
            failed = self.error_messages.len(),
            "finished parsing arguments"
        );
        self.finish()
    }

    /// Returns true when `next` was used as this token's value.
    fn parse_token(&mut self, arg: &str, next: Option<&str>) -> bool {
        if let Some(option) = arg.strip_prefix("--") {
            trace!(option, "long option");
            return self.parse_option(option, next);
        }
        if let Some(option) = arg.strip_prefix('-') {
            trace!(option, "short option");
            return self.parse_option(option, next);
        }
        trace!(arg, "positional argument");
        self.parse_arg(arg);
        false
    }

    fn parse_option(&mut self, option: &str, next: Option<&str>) -> bool {
        match option.split_once('=') {
            Some((name, value)) => {
                self.parse_name_value(name, Some(value), true);
                false
            }
            None => self.parse_name_value(option, next, false),
        }
    }

    fn parse_name_value(&mut self, name: &str, value: Option<&str>, inline: bool) -> bool {
        let spec = self.spec;
        let Some(param) = spec.option_param_by_name(name) else {
            debug!(name, "unrecognized option");
            self.extra_args.push(name.to_string());
            return false;
        };

        self.mark_seen(param.name());

        if param.is_boolean_type() {
            // Only the exact literals are taken as the flag's value.
            if let Some(literal @ ("true" | "false")) = value {
                self.assign(param, Value::Bool(literal == "true"));
                return !inline;
            }
            self.assign(param, Value::Bool(true));
            return false;
        }

        match value {
            Some(text) => {
                self.coerce_and_assign(param, text);
                !inline
            }
            None => {
                self.record_failure(param, CoerceError::MissingValue);
                false
            }
        }
    }

    fn parse_arg(&mut self, arg: &str) {
        let spec = self.spec;
        let Some(param) = spec.indexed_params().get(self.param_index) else {
            debug!(arg, "no positional parameter left");
            self.extra_args.push(arg.to_string());
            return;
        };

        self.param_index += 1;
        self.mark_seen(param.name());
        self.coerce_and_assign(param, arg);
    }

    fn coerce_and_assign(&mut self, param: &Param<T>, text: &str) {
        let result = self
            .spec
            .coercer()
            .coerce(text, param.value_type())
            .and_then(|value| param.accessor().set(&mut self.target, value));
        if let Err(err) = result {
            self.record_failure(param, err);
        }
    }

    fn assign(&mut self, param: &Param<T>, value: Value) {
        if let Err(err) = param.accessor().set(&mut self.target, value) {
            self.record_failure(param, err);
        }
    }

    fn mark_seen(&mut self, name: &str) {
        if let Some(pos) = self.missing_params.iter().position(|missing| missing == name) {
            self.missing_params.remove(pos);
        }
    }

    fn record_failure(&mut self, param: &Param<T>, err: CoerceError) {
        error!(parameter = param.name(), error = %err, "Error parsing parameter");
        self.error_messages.insert(param.name().to_string(), err.to_string());
    }

    fn finish(self) -> ParseOutcome<T> {
        let report = ParseReport {
            missing_params: self.missing_params,
            extra_args: self.extra_args,
            error_messages: self.error_messages,
            positionals_bound: self.param_index,
        };
        ParseOutcome::new(self.target, report)
    }
}

/// Parse the current process arguments, skipping the program name.
pub fn parse_env<T>(spec: &CliSpec<T>) -> crate::Result<ParseOutcome<T>> {
    Ok(CliParser::new(spec, std::env::args(), 1)?.parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property;
    use crate::property::ValueType;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Opts {
        name: String,
        count: i64,
        verbose: bool,
        ratio: f64,
        files: Vec<String>,
    }

    fn spec() -> CliSpec<Opts> {
        CliSpec::builder()
            .positional(Param::new("count", property!(Opts, count)))
            .option(Param::new("name", property!(Opts, name)).required())
            .option(Param::new("verbose", property!(Opts, verbose)))
            .option(Param::new("ratio", property!(Opts, ratio)))
            .option(Param::new("files", property!(Opts, files)))
            .with_default_factory()
            .build()
            .unwrap()
    }

    fn parse(args: &[&str]) -> ParseOutcome<Opts> {
        let spec = spec();
        CliParser::new(&spec, args.iter().copied(), 0).unwrap().parse()
    }

    #[test]
    fn test_long_and_short_options() {
        let outcome = parse(&["--name", "Bob", "-ratio", "0.5"]);
        assert!(!outcome.has_error());
        assert_eq!(outcome.target().name, "Bob");
        assert_eq!(outcome.target().ratio, 0.5);
    }

    #[test]
    fn test_inline_value_does_not_consume_next() {
        let outcome = parse(&["--name=Bob", "7"]);
        assert!(!outcome.has_error());
        assert_eq!(outcome.target().name, "Bob");
        assert_eq!(outcome.target().count, 7);
    }

    #[test]
    fn test_inline_splits_at_first_equals() {
        let outcome = parse(&["--name=a=b"]);
        assert_eq!(outcome.target().name, "a=b");
    }

    #[test]
    fn test_boolean_literal_is_consumed() {
        let outcome = parse(&["--name", "x", "--verbose", "false", "3"]);
        assert!(!outcome.has_error());
        assert!(!outcome.target().verbose);
        assert_eq!(outcome.target().count, 3);
    }

    #[test]
    fn test_boolean_non_literal_is_left_alone() {
        let outcome = parse(&["--name", "x", "--verbose", "True"]);
        assert!(outcome.target().verbose);
        assert_eq!(outcome.report().positionals_bound(), 1);
        assert!(outcome.report().error_messages().contains_key("count"));
    }

    #[test]
    fn test_inline_boolean() {
        let outcome = parse(&["--name", "x", "--verbose=false", "4"]);
        assert!(!outcome.target().verbose);
        assert_eq!(outcome.target().count, 4);
    }

    #[test]
    fn test_boolean_at_end() {
        let outcome = parse(&["--name", "x", "-verbose"]);
        assert!(outcome.target().verbose);
        assert!(!outcome.has_error());
    }

    #[test]
    fn test_option_without_value() {
        let outcome = parse(&["--name"]);
        assert!(outcome.report().missing_params().is_empty());
        assert_eq!(outcome.report().error_messages()["name"], "Missing value");
    }

    #[test]
    fn test_unknown_option_leaves_value_for_next_step() {
        let outcome = parse(&["--name", "x", "--color", "5"]);
        assert_eq!(outcome.report().extra_args(), ["color".to_string()]);
        assert_eq!(outcome.target().count, 5);
    }

    #[test]
    fn test_sequence_option() {
        let outcome = parse(&["--name", "x", "--files", "a.txt,b.txt"]);
        assert_eq!(outcome.target().files, vec!["a.txt", "b.txt"]);

        let outcome = parse(&["--name", "x", "--files=[\"c\"]"]);
        assert_eq!(outcome.target().files, vec!["c"]);
    }

    #[test]
    fn test_start_offset_skips_leading_tokens() {
        let spec = spec();
        let outcome = CliParser::new(&spec, ["prog", "sub", "--name", "x"], 2)
            .unwrap()
            .parse();
        assert!(!outcome.has_error());
        assert_eq!(outcome.target().name, "x");
    }

    #[test]
    fn test_offset_past_end() {
        let spec = spec();
        let outcome = CliParser::new(&spec, ["a"], 5).unwrap().parse();
        assert_eq!(outcome.report().missing_params(), ["name".to_string()]);
        assert!(outcome.report().extra_args().is_empty());
    }

    #[test]
    fn test_with_target_keeps_existing_values() {
        let spec = spec();
        let target = Opts {
            ratio: 2.0,
            ..Default::default()
        };
        let outcome = CliParser::with_target(&spec, ["--name", "y"], 0, target).parse();
        assert_eq!(outcome.target().ratio, 2.0);
        assert_eq!(outcome.target().name, "y");
    }

    #[test]
    fn test_missing_factory_is_a_hard_failure() {
        let spec: CliSpec<Opts> = CliSpec::builder()
            .option(Param::new("name", property!(Opts, name)))
            .build()
            .unwrap();
        let err = CliParser::new(&spec, ["--name", "x"], 0).err().unwrap();
        assert!(matches!(err, SpecError::NoFactory(_)));

        let err = parse_env(&spec).err().unwrap();
        assert!(matches!(err, crate::CliArgError::Spec(SpecError::NoFactory(_))));
    }

    #[test]
    fn test_assignment_failure_is_recorded() {
        #[derive(Debug, Default)]
        struct Small {
            port: u16,
        }
        let spec = CliSpec::builder()
            .option(Param::new("port", property!(Small, port as ValueType::Integer)))
            .with_default_factory()
            .build()
            .unwrap();

        let outcome = CliParser::new(&spec, ["--port", "-1"], 0).unwrap().parse();
        assert_eq!(outcome.target().port, 0);
        assert!(outcome.report().error_messages()["port"].starts_with("Value does not fit field"));
    }
}
