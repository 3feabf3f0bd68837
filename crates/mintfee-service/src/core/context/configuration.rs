use std::fs;
use std::str::FromStr;

use mintfee_common::service::monitoring::Configuration as MonitoringConfiguration;
use mintfee_estimator::FeeConfiguration;
use mintfee_prices::Configuration as PriceConfiguration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::context::environment::{JSONPath, Variables, VariablesResolver};
use crate::core::Error;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerbosityConfiguration {
    Debug,
    Info,
}

impl FromStr for VerbosityConfiguration {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(VerbosityConfiguration::Debug),
            "info" => Ok(VerbosityConfiguration::Info),
            _ => Ok(VerbosityConfiguration::Debug),
        }
    }
}

fn default_interval() -> u64 {
    30
}

/// Periodic computation of the fee of every operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeeMonitoringConfiguration {
    /// Seconds between two rounds.
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Batch size used for batch operations.
    #[serde(default)]
    pub batch_size: Option<u32>,
}

impl Default for FeeMonitoringConfiguration {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            batch_size: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Configuration {
    pub verbosity: VerbosityConfiguration,
    pub prometheus: Option<MonitoringConfiguration>,

    pub fees: FeeConfiguration,
    pub prices: PriceConfiguration,

    #[serde(default)]
    pub monitoring: FeeMonitoringConfiguration,
}

impl Configuration {
    /// Builds the configuration from, by increasing priority, the profile file given by
    /// `--profile` or `MINTFEE_PROFILE`, the `MINTFEE_` environment variables and the
    /// command line arguments.
    pub fn load() -> Result<Self, Error> {
        let mut complete_profile = Profile::empty();

        let resolver = VariablesResolver::initialize()?;
        let environment = resolver.resolve_environment()?;
        let arguments = resolver.resolve_arguments()?;

        let profile_path = arguments
            .get("profile")
            .or_else(|| environment.get("profile"))
            .and_then(|x| x.as_str())
            .filter(|x| !x.is_empty());

        if profile_path.is_none() {
            println!(
                "No profile file specified.
Please provide a configuration profile using the `--profile` argument or the `MINTFEE_PROFILE` environment variable, \
unless all variables are set via command line or environment variables."
            );
        }

        let profile = profile_path.map(Profile::from_file).unwrap_or(Ok(Profile::empty()))?;

        complete_profile.merge(&profile);
        complete_profile.insert_variables(environment)?;
        complete_profile.insert_variables(arguments)?;

        Self::from_profile(&complete_profile)
    }

    pub fn from_profile(profile: &Profile) -> Result<Self, Error> {
        serde_json::from_value(Value::Object(profile.0.clone())).map_err(|e| Error::Configuration(e.to_string()))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Profile(Map<String, Value>);

impl Profile {
    pub fn empty() -> Self {
        Self(Map::new())
    }

    pub fn from_file(path: &str) -> Result<Self, Error> {
        let data = fs::read(path).map_err(|e| Error::Configuration(e.to_string()))?;
        let variables: Map<String, Value> = serde_json::from_slice(&data).map_err(|e| Error::Configuration(e.to_string()))?;

        Ok(Self(variables))
    }

    pub fn merge(&mut self, profile: &Profile) {
        #[rustfmt::skip]
        fn merge_rec(profile: &mut Map<String, Value>, other: &Map<String, Value>) {
            for (k, v) in other {
                match (profile.get_mut(k), v) {
                    (Some(Value::Object(a_obj)), Value::Object(b_obj)) => { merge_rec(a_obj, b_obj); },
                    _ => { profile.insert(k.clone(), v.clone()); },
                }
            }
        }

        merge_rec(&mut self.0, &profile.0)
    }

    pub fn insert_variables(&mut self, variables: Variables) -> Result<(), Error> {
        for (key, value) in variables.into_iter() {
            self.insert_variable(key, value)?
        }

        Ok(())
    }

    pub fn insert_variable(&mut self, path: JSONPath, value: Value) -> Result<(), Error> {
        fn insert_rec(object: &mut Map<String, Value>, path: &[String], value: Value) -> Result<(), Error> {
            if path.len() == 1 {
                object.insert(path[0].to_string(), value);
                return Ok(());
            }

            let inner = object
                .entry(path[0].to_string())
                .or_insert(Value::Object(Map::new()))
                .as_object_mut()
                .ok_or(Error::Configuration(format!("could not merge variable {} in configuration", path[0])))?;

            insert_rec(inner, &path[1..], value)
        }

        insert_rec(&mut self.0, &path, value)
    }
}
