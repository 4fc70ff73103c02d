// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! YAML description of an experiment archive.
//!
//! ```yaml
//! name: my_experiment
//! cases:
//!   emis:
//!     long_name: Emissions Scenario
//!     vals: [policy, no_policy, weak_policy]
//!   model_config:
//!     long_name: Model configuration
//!     vals: [no_clouds, no_sun, no_sun_no_clouds]
//! timeseries: true
//! data_dir: /path/to/my/data
//! case_path: '{emis}/{model_config}'
//! output_prefix: 'experiment_{emis}_{model_config}.data.'
//! output_suffix: '.tape.nc'
//! validate_data: true
//! ```
//!
//! The order of `cases` is the factor order of the experiment.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use crate::archive::Archive;
use crate::common::Result;
use crate::experiment::{Experiment, Factor};
use crate::layout::{CasePath, Layout, Naming};
use crate::value::FactorValue;
use crate::{config_err, io_err};

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CaseConfig {
    pub long_name: String,
    pub vals: Vec<FactorValue>,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub name: String,
    #[serde(serialize_with = "ser_cases", deserialize_with = "de_cases")]
    pub cases: Vec<(String, CaseConfig)>,
    #[serde(default = "default_true")]
    pub timeseries: bool,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub case_path: Option<String>,
    #[serde(default)]
    pub output_prefix: String,
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,
    #[serde(default = "default_true")]
    pub validate_data: bool,
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./")
}

fn default_output_suffix() -> String {
    ".nc".to_owned()
}

fn ser_cases<S>(cases: &[(String, CaseConfig)], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(cases.iter().map(|(name, case)| (name, case)))
}

fn de_cases<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, CaseConfig)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct CasesVisitor;

    impl<'de> Visitor<'de> for CasesVisitor {
        type Value = Vec<(String, CaseConfig)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of factor names to {long_name, vals}")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut cases = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, case)) = map.next_entry::<String, CaseConfig>()? {
                cases.push((name, case));
            }
            Ok(cases)
        }
    }

    deserializer.deserialize_map(CasesVisitor)
}

impl ExperimentConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        match serde_yml::from_str(yaml) {
            Ok(config) => Ok(config),
            Err(err) => io_err!(YamlDecode, err.to_string()),
        }
    }

    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "reading experiment configuration");
        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        match serde_yml::to_string(self) {
            Ok(yaml) => Ok(yaml),
            Err(err) => io_err!(YamlEncode, err.to_string()),
        }
    }

    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml_string()?;
        fs::write(path, yaml)?;
        Ok(())
    }

    pub fn experiment(&self) -> Result<Experiment> {
        let factors = self
            .cases
            .iter()
            .map(|(name, case)| Factor::new(name, &case.long_name, case.vals.iter().cloned()))
            .collect();
        Experiment::new(&self.name, factors)
    }

    pub fn layout(&self) -> Result<Layout> {
        let case_path = match self.case_path.as_deref() {
            None => CasePath::Nested,
            Some("") => CasePath::Root,
            Some(template) => CasePath::Named(Naming::template(template)?),
        };
        Ok(Layout::new(&self.data_dir)
            .with_case_path(case_path)
            .with_prefix(Naming::template(&self.output_prefix)?)
            .with_suffix(Naming::template(&self.output_suffix)?))
    }

    /// Build the archive this configuration describes, checking the case
    /// directories exist if `validate_data` is set.
    pub fn into_archive(self) -> Result<Archive> {
        let archive = Archive::new(self.experiment()?, self.layout()?)
            .with_timeseries(self.timeseries);
        if self.validate_data {
            archive.validate()?;
        }
        Ok(archive)
    }
}

fn naming_source<'a>(naming: &'a Naming, what: &str) -> Result<&'a str> {
    match naming.source() {
        Some(source) => Ok(source),
        None => config_err!(
            NotSerializable,
            format!("{what} is a function and can't be written out")
        ),
    }
}

impl Archive {
    pub fn to_config(&self) -> Result<ExperimentConfig> {
        let case_path = match &self.layout.case_path {
            CasePath::Nested => None,
            CasePath::Root => Some(String::new()),
            CasePath::Named(naming) => Some(naming_source(naming, "case path")?.to_owned()),
        };

        Ok(ExperimentConfig {
            name: self.experiment.name.clone(),
            cases: self
                .experiment
                .factors()
                .iter()
                .map(|factor| {
                    let case = CaseConfig {
                        long_name: factor.display_name.clone(),
                        vals: factor.values.clone(),
                    };
                    (factor.short_name.clone(), case)
                })
                .collect(),
            timeseries: self.timeseries,
            data_dir: self.layout.data_dir.clone(),
            case_path,
            output_prefix: naming_source(&self.layout.output_prefix, "output prefix")?.to_owned(),
            output_suffix: naming_source(&self.layout.output_suffix, "output suffix")?.to_owned(),
            validate_data: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::experiment::CaseKws;

    const SAMPLE: &str = r#"
name: my_experiment
cases:
  emis:
    long_name: Emissions Scenario
    vals: [policy, no_policy, weak_policy]
  model_config:
    long_name: Model configuration
    vals: [no_clouds, no_sun, no_sun_no_clouds]
timeseries: true
data_dir: /path/to/my/data
case_path: '{emis}/{model_config}'
output_prefix: 'experiment_{emis}_{model_config}.data.'
output_suffix: '.tape.nc'
validate_data: false
"#;

    #[test]
    fn parses_sample() {
        let config = ExperimentConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!("my_experiment", config.name);
        assert_eq!(
            vec!["emis", "model_config"],
            config.cases.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(Some("{emis}/{model_config}"), config.case_path.as_deref());

        let archive = config.into_archive().unwrap();
        let exp = &archive.experiment;
        assert_eq!(vec![3, 3], exp.shape());
        assert_eq!(
            "Emissions Scenario",
            exp.factor("emis").unwrap().display_name
        );

        let mut kws = CaseKws::new();
        kws.insert("emis".to_owned(), "policy".into());
        kws.insert("model_config".to_owned(), "no_sun".into());
        assert_eq!(
            PathBuf::from(
                "/path/to/my/data/policy/no_sun/experiment_policy_no_sun.data.TS.tape.nc"
            ),
            archive.files_for_case("TS", &kws).unwrap()
        );
    }

    #[test]
    fn defaults() {
        let config = ExperimentConfig::from_yaml_str(
            "name: ens\ncases:\n  member:\n    long_name: Ensemble member\n    vals: [1, 2, 3]\n",
        )
        .unwrap();
        assert!(config.timeseries);
        assert!(config.validate_data);
        assert_eq!(PathBuf::from("./"), config.data_dir);
        assert_eq!(None, config.case_path);
        assert_eq!("", config.output_prefix);
        assert_eq!(".nc", config.output_suffix);
        assert_eq!(
            vec![FactorValue::Int(1), FactorValue::Int(2), FactorValue::Int(3)],
            config.cases[0].1.vals
        );
    }

    #[test]
    fn case_order_follows_document() {
        let yaml = "name: x\ncases:\n  zeta:\n    long_name: Z\n    vals: [a]\n  alpha:\n    long_name: A\n    vals: [b]\nvalidate_data: false\n";
        let archive = ExperimentConfig::from_yaml_str(yaml)
            .unwrap()
            .into_archive()
            .unwrap();
        assert_eq!(vec!["zeta", "alpha"], archive.experiment.factor_names());
    }

    #[test]
    fn round_trips_through_archive() {
        let config = ExperimentConfig::from_yaml_str(SAMPLE).unwrap();
        let archive = config.clone().into_archive().unwrap();
        let mut back = archive.to_config().unwrap();
        // validation is a load-time choice, not part of the archive
        back.validate_data = false;
        assert_eq!(config, back);

        let yaml = back.to_yaml_string().unwrap();
        assert_eq!(back, ExperimentConfig::from_yaml_str(&yaml).unwrap());
    }

    #[test]
    fn writes_and_reads_files() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = ExperimentConfig::from_yaml_str(SAMPLE).unwrap();
        config.data_dir = tmp.path().to_path_buf();
        config.case_path = None;
        config.validate_data = true;

        let path = tmp.path().join("experiment.yaml");
        config.to_yaml(&path).unwrap();
        let read = ExperimentConfig::from_yaml(&path).unwrap();
        assert_eq!(config, read);

        let err = read.clone().into_archive().unwrap_err();
        assert_eq!(ErrorCode::MissingCaseDirectory, err.code);

        for emis in ["policy", "no_policy", "weak_policy"] {
            for cfg in ["no_clouds", "no_sun", "no_sun_no_clouds"] {
                fs::create_dir_all(tmp.path().join(emis).join(cfg)).unwrap();
            }
        }
        read.into_archive().unwrap();
    }

    #[test]
    fn function_naming_is_not_serializable() {
        let archive = Archive::new(
            Experiment::single_case("control"),
            Layout::new("/runs").with_suffix(Naming::func(|_| ".nc".to_owned())),
        );
        let err = archive.to_config().unwrap_err();
        assert_eq!(ErrorCode::NotSerializable, err.code);

        let root = Archive::single_case("control", "/runs").to_config().unwrap();
        assert_eq!(Some(String::new()), root.case_path);
    }

    #[test]
    fn decode_errors() {
        let err = ExperimentConfig::from_yaml_str("name: [unclosed").unwrap_err();
        assert_eq!(ErrorCode::YamlDecode, err.code);

        let err = ExperimentConfig::from_yaml_str("cases: {}\n").unwrap_err();
        assert_eq!(ErrorCode::YamlDecode, err.code);

        let err = ExperimentConfig::from_yaml("/nonexistent/experiment.yaml").unwrap_err();
        assert_eq!(ErrorCode::Io, err.code);

        let err = ExperimentConfig::from_yaml_str("name: x\ncases: {}\nvalidate_data: false\n")
            .unwrap()
            .into_archive()
            .unwrap_err();
        assert_eq!(ErrorCode::NoFactors, err.code);
    }
}
