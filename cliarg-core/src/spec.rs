//! Declarative specification of a command line.
//!
//! A [`CliSpec`] lists the named option parameters and the ordered positional
//! parameters of a target type `T`, together with the factory used to build a
//! fresh target and the coercion chain used to turn text into values.

use std::any::type_name;
use std::collections::{HashMap, HashSet};
use std::fmt;

use serde_json::{Map, Value};

use crate::coerce::Coercer;
use crate::error::{CoerceError, SpecError};
use crate::property::{FieldAccessor, ValueType};

/// One parameter of a specification.
pub struct Param<T> {
    name: String,
    accessor: Box<dyn FieldAccessor<T>>,
    required: bool,
    description: Option<String>,
}

impl<T> Param<T> {
    pub fn new<A>(name: impl Into<String>, accessor: A) -> Self
    where
        A: FieldAccessor<T> + 'static,
    {
        Self {
            name: name.into(),
            accessor: Box::new(accessor),
            required: false,
            description: None,
        }
    }

    /// Mark the parameter as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Boolean parameters act as presence switches when given as options.
    pub fn is_boolean_type(&self) -> bool {
        self.accessor.value_type().is_bool()
    }

    pub fn value_type(&self) -> &ValueType {
        self.accessor.value_type()
    }

    pub fn describe(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn accessor(&self) -> &dyn FieldAccessor<T> {
        self.accessor.as_ref()
    }
}

impl<T> fmt::Debug for Param<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("value_type", self.accessor.value_type())
            .field("required", &self.required)
            .finish()
    }
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Immutable description of the options and positionals of `T`.
pub struct CliSpec<T> {
    options: Vec<Param<T>>,
    option_index: HashMap<String, usize>,
    indexed: Vec<Param<T>>,
    required: Vec<String>,
    factory: Option<Factory<T>>,
    coercer: Coercer,
}

impl<T> CliSpec<T> {
    pub fn builder() -> CliSpecBuilder<T> {
        CliSpecBuilder::new()
    }

    /// Find an option parameter by the name used after `--` or `-`.
    pub fn option_param_by_name(&self, name: &str) -> Option<&Param<T>> {
        self.option_index.get(name).map(|&i| &self.options[i])
    }

    pub fn option_params(&self) -> &[Param<T>] {
        &self.options
    }

    /// Positional parameters in the order they are filled
    pub fn indexed_params(&self) -> &[Param<T>] {
        &self.indexed
    }

    /// Names of the required parameters, in declaration order
    pub fn required_params(&self) -> &[String] {
        &self.required
    }

    pub fn coercer(&self) -> &Coercer {
        &self.coercer
    }

    /// Build a fresh target from the registered factory.
    pub fn create_default_instance(&self) -> Result<T, SpecError> {
        self.factory
            .as_ref()
            .map(|factory| factory())
            .ok_or(SpecError::NoFactory(type_name::<T>()))
    }

    /// Current values of every parameter's field, keyed by parameter name.
    pub fn snapshot(&self, target: &T) -> Result<Map<String, Value>, CoerceError> {
        let mut values = Map::new();
        for param in self.indexed.iter().chain(self.options.iter()) {
            values.insert(param.name.clone(), param.accessor.get(target)?);
        }
        Ok(values)
    }
}

impl<T> fmt::Debug for CliSpec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CliSpec")
            .field("options", &self.options)
            .field("indexed", &self.indexed)
            .field("required", &self.required)
            .field("has_factory", &self.factory.is_some())
            .field("coercer", &self.coercer)
            .finish()
    }
}

/// Builder for [`CliSpec`].
pub struct CliSpecBuilder<T> {
    options: Vec<Param<T>>,
    indexed: Vec<Param<T>>,
    factory: Option<Factory<T>>,
    coercer: Coercer,
}

impl<T> CliSpecBuilder<T> {
    pub fn new() -> Self {
        Self {
            options: Vec::new(),
            indexed: Vec::new(),
            factory: None,
            coercer: Coercer::new(),
        }
    }

    /// Add a named option parameter (`--name` / `-name`)
    pub fn option(mut self, param: Param<T>) -> Self {
        self.options.push(param);
        self
    }

    /// Add the next positional parameter
    pub fn positional(mut self, param: Param<T>) -> Self {
        self.indexed.push(param);
        self
    }

    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn with_default_factory(self) -> Self
    where
        T: Default + 'static,
    {
        self.factory(T::default)
    }

    pub fn coercer(mut self, coercer: Coercer) -> Self {
        self.coercer = coercer;
        self
    }

    /// Validate names and freeze the specification.
    pub fn build(self) -> Result<CliSpec<T>, SpecError> {
        let mut seen = HashSet::new();
        for param in self.indexed.iter().chain(self.options.iter()) {
            if param.name.is_empty() {
                return Err(SpecError::EmptyName);
            }
            if !seen.insert(param.name.as_str()) {
                return Err(SpecError::DuplicateName(param.name.clone()));
            }
        }

        let option_index = self
            .options
            .iter()
            .enumerate()
            .map(|(i, param)| (param.name.clone(), i))
            .collect();
        let required = self
            .indexed
            .iter()
            .chain(self.options.iter())
            .filter(|param| param.required)
            .map(|param| param.name.clone())
            .collect();

        Ok(CliSpec {
            options: self.options,
            option_index,
            indexed: self.indexed,
            required,
            factory: self.factory,
            coercer: self.coercer,
        })
    }
}

impl<T> Default for CliSpecBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property;
    use serde_json::json;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Target {
        input: String,
        level: i32,
        quiet: bool,
    }

    fn param_set() -> CliSpecBuilder<Target> {
        CliSpec::builder()
            .positional(Param::new("input", property!(Target, input)).required())
            .option(Param::new("level", property!(Target, level)).description("verbosity level"))
            .option(Param::new("quiet", property!(Target, quiet)))
    }

    #[test]
    fn test_build_indexes_options_and_required() {
        let spec = param_set().with_default_factory().build().unwrap();

        assert_eq!(spec.required_params(), ["input".to_string()]);
        assert_eq!(spec.indexed_params().len(), 1);
        assert_eq!(spec.option_params().len(), 2);
        assert!(spec.option_param_by_name("quiet").unwrap().is_boolean_type());
        assert_eq!(
            spec.option_param_by_name("level").unwrap().describe(),
            Some("verbosity level")
        );
        assert!(spec.option_param_by_name("input").is_none());
    }

    #[test]
    fn test_duplicate_and_empty_names_rejected() {
        let err = param_set()
            .option(Param::new("input", property!(Target, input)))
            .build()
            .unwrap_err();
        assert_eq!(err, SpecError::DuplicateName("input".to_string()));

        let err = CliSpec::builder()
            .option(Param::new("", property!(Target, level)))
            .build()
            .unwrap_err();
        assert_eq!(err, SpecError::EmptyName);
    }

    #[test]
    fn test_factory() {
        let spec = param_set().build().unwrap();
        assert!(matches!(spec.create_default_instance(), Err(SpecError::NoFactory(_))));

        let spec = param_set()
            .factory(|| Target {
                level: 3,
                ..Default::default()
            })
            .build()
            .unwrap();
        assert_eq!(spec.create_default_instance().unwrap().level, 3);
    }

    #[test]
    fn test_snapshot() {
        let spec = param_set().build().unwrap();
        let target = Target {
            input: "a.txt".to_string(),
            level: 2,
            quiet: true,
        };

        let values = spec.snapshot(&target).unwrap();
        assert_eq!(values["input"], json!("a.txt"));
        assert_eq!(values["level"], json!(2));
        assert_eq!(values["quiet"], json!(true));
    }
}
