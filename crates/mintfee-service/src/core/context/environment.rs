use std::collections::{hash_map, HashMap};
use std::env;
use std::ops::Deref;
use std::str::FromStr;

use lazy_static::lazy_static;
use serde_json::{Number, Value};

use crate::core::Error;

/// Every configuration field that can be set through an environment variable or an argument.
static CONFIGURATION_SPECIFICATION: &str = include_str!("../../../resources/specification/configuration.json");

const ENVIRONMENT_PREFIX: &str = "MINTFEE_";

lazy_static! {
    static ref IS_ARGUMENT: regex::Regex = regex::Regex::new(r"^--[^=]+=.+$").expect("invalid regex");
    static ref IS_STRING: regex::Regex = regex::Regex::new(r"^'[^']*'$").expect("invalid regex");
    static ref IS_NUMBER: regex::Regex = regex::Regex::new(r"^-?[0-9]+(\.[0-9]+)?$").expect("invalid regex");
    static ref IS_ARRAY: regex::Regex = regex::Regex::new(r"^\[.*\]$").expect("invalid regex");
}

/// Path of a field in the configuration, `fees.gas_fee_margin` for instance.
#[derive(PartialEq, Eq, Hash, Clone, Debug)]
pub struct JSONPath(Vec<String>);

impl Deref for JSONPath {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl JSONPath {
    pub fn from_str(s: &str) -> Self {
        JSONPath(s.split('.').map(str::to_lowercase).collect())
    }

    /// Name of the variable setting this field, `fees_gas_fee_margin` for instance.
    pub fn variable_name(&self) -> String {
        self.0.join("_")
    }
}

/// Maps variable names to the configuration field they set.
#[derive(Debug)]
pub struct VariablesResolver(HashMap<String, JSONPath>);

impl VariablesResolver {
    pub fn initialize() -> Result<Self, Error> {
        let specification: Value =
            serde_json::from_str(CONFIGURATION_SPECIFICATION).map_err(|e| Error::Configuration(format!("invalid specification {}", e)))?;

        Ok(Self::from_specification(&specification))
    }

    fn from_specification(specification: &Value) -> Self {
        fn collect_fields(path: &mut Vec<String>, value: &Value, fields: &mut HashMap<String, JSONPath>) {
            let Value::Object(object) = value else {
                let field = JSONPath(path.clone());
                fields.insert(field.variable_name(), field);
                return;
            };

            for (name, value) in object {
                path.push(name.to_lowercase());
                collect_fields(path, value, fields);
                path.pop();
            }
        }

        let mut fields = HashMap::from([("profile".to_string(), JSONPath::from_str("profile"))]);
        collect_fields(&mut vec![], specification, &mut fields);

        Self(fields)
    }

    pub fn resolve_environment(&self) -> Result<Variables, Error> {
        let variables = envy::prefixed(ENVIRONMENT_PREFIX)
            .from_env::<HashMap<String, String>>()
            .map_err(|e| Error::Configuration(e.to_string()))?;

        self.resolve_variables(variables)
    }

    pub fn resolve_arguments(&self) -> Result<Variables, Error> {
        self.resolve_raw_arguments(env::args().skip(1))
    }

    /// Arguments are expected as `--name=value`.
    fn resolve_raw_arguments(&self, raw_arguments: impl IntoIterator<Item = String>) -> Result<Variables, Error> {
        let mut arguments = HashMap::new();
        for raw_argument in raw_arguments {
            if !IS_ARGUMENT.is_match(&raw_argument) {
                return Err(Error::Configuration(format!("invalid argument {}, must be of the form '--xxx=yyy'", raw_argument)));
            }

            let Some((raw_name, raw_value)) = raw_argument.split_once('=') else { continue };

            arguments.insert(raw_name.trim().trim_start_matches("--").to_lowercase(), raw_value.to_string());
        }

        self.resolve_variables(arguments)
    }

    /// Variables that do not match a configuration field are skipped.
    fn resolve_variables(&self, variables: HashMap<String, String>) -> Result<Variables, Error> {
        let mut resolved_variables = HashMap::new();
        for (name, value) in variables {
            if let Some(path) = self.0.get(&name) {
                resolved_variables.insert(path.clone(), Self::decode_value(&value)?);
            }
        }

        Ok(Variables(resolved_variables))
    }

    fn decode_value(value: &str) -> Result<Value, Error> {
        let value = value.trim();

        Ok(match value {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),

            value if IS_STRING.is_match(value) => Value::String(value[1..value.len() - 1].to_string()),
            value if IS_NUMBER.is_match(value) => Number::from_str(value)
                .map(Value::Number)
                .map_err(|e| Error::Configuration(e.to_string()))?,
            value if IS_ARRAY.is_match(value) => {
                let inner = value[1..value.len() - 1].trim();
                if inner.is_empty() {
                    return Ok(Value::Array(vec![]));
                }

                inner.split(',').map(Self::decode_value).collect::<Result<Vec<_>, _>>().map(Value::Array)?
            },

            value => Value::String(value.to_string()),
        })
    }
}

/// Decoded values indexed by the configuration field they set.
pub struct Variables(HashMap<JSONPath, Value>);

impl Variables {
    pub fn get(&self, s: &str) -> Option<&Value> {
        self.0.get(&JSONPath::from_str(s))
    }
}

impl IntoIterator for Variables {
    type Item = (JSONPath, Value);
    type IntoIter = hash_map::IntoIter<JSONPath, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::{json, Number, Value};

    use super::{JSONPath, VariablesResolver};

    #[test]
    fn path_is_case_insensitive() {
        assert_eq!(JSONPath::from_str("Fees.Gas_Fee_Margin").0, vec!["fees".to_string(), "gas_fee_margin".to_string()]);
        assert_eq!(JSONPath::from_str("VERBOSITY").variable_name(), "verbosity");
        assert_eq!(JSONPath::from_str("prices.endpoint").variable_name(), "prices_endpoint");
    }

    #[test]
    fn specification_exposes_every_field() {
        let resolver = VariablesResolver::initialize().unwrap();

        assert_eq!(resolver.0.get("profile"), Some(&JSONPath::from_str("profile")));
        assert_eq!(resolver.0.get("fees_gas_fee_margin"), Some(&JSONPath::from_str("fees.gas_fee_margin")));
        assert_eq!(resolver.0.get("prices_provider"), Some(&JSONPath::from_str("prices.provider")));
        assert_eq!(resolver.0.get("prometheus_endpoint"), Some(&JSONPath::from_str("prometheus.endpoint")));
        assert_eq!(resolver.0.get("monitoring_interval"), Some(&JSONPath::from_str("monitoring.interval")));
    }

    #[test]
    fn nested_specification_is_flattened() {
        let resolver = VariablesResolver::from_specification(&json!({ "a": { "b": { "c": 1 } }, "d": "" }));

        assert_eq!(resolver.0.get("a_b_c"), Some(&JSONPath::from_str("a.b.c")));
        assert_eq!(resolver.0.get("d"), Some(&JSONPath::from_str("d")));
        assert!(resolver.0.get("a_b").is_none());
    }

    #[test]
    fn unknown_variables_are_ignored() {
        let resolver = VariablesResolver::initialize().unwrap();

        let variables = resolver
            .resolve_variables(HashMap::from([
                ("fees_platform_fee_usd".to_string(), "0.02".to_string()),
                ("home".to_string(), "/root".to_string()),
            ]))
            .unwrap();

        assert_eq!(variables.get("fees.platform_fee_usd"), Some(&Value::Number(Number::from_f64(0.02).unwrap())));
        assert!(variables.get("home").is_none());
    }

    #[test]
    fn arguments_are_resolved() {
        let resolver = VariablesResolver::initialize().unwrap();

        let variables = resolver
            .resolve_raw_arguments(vec!["--profile=/etc/mintfee.json".to_string(), "--prices_provider=redis".to_string()])
            .unwrap();

        assert_eq!(variables.get("profile"), Some(&Value::String("/etc/mintfee.json".to_string())));
        assert_eq!(variables.get("prices.provider"), Some(&Value::String("redis".to_string())));
    }

    #[test]
    fn malformed_argument_is_rejected() {
        let resolver = VariablesResolver::initialize().unwrap();

        assert!(resolver.resolve_raw_arguments(vec!["--verbosity".to_string()]).is_err());
    }

    #[test]
    fn values_are_decoded() {
        let cases = vec![
            ("0", Value::Number(Number::from(0))),
            ("94", Value::Number(Number::from(94))),
            ("-1", Value::Number(Number::from(-1))),
            ("0.0001", Value::Number(Number::from_f64(0.0001).unwrap())),
            ("true", Value::Bool(true)),
            ("false", Value::Bool(false)),
            ("''", Value::String("".to_string())),
            ("'42'", Value::String("42".to_string())),
            ("[]", Value::Array(vec![])),
            ("[1,2]", Value::Array(vec![Value::Number(Number::from(1)), Value::Number(Number::from(2))])),
            ("['a','b']", Value::Array(vec![Value::String("a".to_string()), Value::String("b".to_string())])),
            ("mongodb://localhost:27017", Value::String("mongodb://localhost:27017".to_string())),
        ];

        for (value, expected) in cases {
            assert_eq!(VariablesResolver::decode_value(value).unwrap(), expected, "decoding {}", value);
        }
    }
}
