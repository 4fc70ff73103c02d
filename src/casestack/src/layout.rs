// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Mapping from factor combinations to locations in an output archive.
//!
//! Archives are usually laid out as nested directories, one level per
//! factor, with files named `{prefix}{field}{suffix}`.  Directory, prefix
//! and suffix are either `{name}` templates over the factor short names or
//! arbitrary functions of the combination.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::common::Result;
use crate::experiment::{CaseKws, Experiment};
use crate::{config_err, design_err};

#[derive(Clone, PartialEq, Eq, Debug)]
enum Segment {
    Literal(String),
    Field(String),
}

/// A format string with named `{factor}` directives.  `{{` and `}}` stand
/// for literal braces.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        lazy_static! {
            static ref DIRECTIVE_RE: Regex =
                Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last = 0;
        for caps in DIRECTIVE_RE.captures_iter(source) {
            let Some(m) = caps.get(0) else {
                continue;
            };
            let between = &source[last..m.start()];
            if between.contains('{') || between.contains('}') {
                return config_err!(BadTemplate, format!("unbalanced brace in '{source}'"));
            }
            literal.push_str(between);
            match caps.get(1) {
                Some(name) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(name.as_str().to_owned()));
                }
                None => literal.push_str(&m.as_str()[..1]),
            }
            last = m.end();
        }

        let rest = &source[last..];
        if rest.contains('{') || rest.contains('}') {
            return config_err!(BadTemplate, format!("unbalanced brace in '{source}'"));
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Template {
            source: source.to_owned(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of the factors referenced by this template, in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|seg| match seg {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn render(&self, kws: &CaseKws) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        for seg in self.segments.iter() {
            match seg {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => match kws.get(name) {
                    Some(value) => out.push_str(&value.to_string()),
                    None => {
                        return config_err!(
                            BadTemplate,
                            format!("'{}' names unknown factor '{name}'", self.source)
                        );
                    }
                },
            }
        }
        Ok(out)
    }
}

pub type NamingFn = Arc<dyn Fn(&CaseKws) -> String + Send + Sync>;

/// How one piece of a location is derived from a combination.
#[derive(Clone)]
pub enum Naming {
    Template(Template),
    Func(NamingFn),
}

impl Naming {
    pub fn template(source: &str) -> Result<Self> {
        Ok(Naming::Template(Template::parse(source)?))
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&CaseKws) -> String + Send + Sync + 'static,
    {
        Naming::Func(Arc::new(f))
    }

    pub fn render(&self, kws: &CaseKws) -> Result<String> {
        match self {
            Naming::Template(template) => template.render(kws),
            Naming::Func(f) => Ok(f(kws)),
        }
    }

    /// The template source, or `None` for function-based naming.
    pub fn source(&self) -> Option<&str> {
        match self {
            Naming::Template(template) => Some(template.as_str()),
            Naming::Func(_) => None,
        }
    }
}

impl fmt::Debug for Naming {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Naming::Template(template) => write!(f, "Template({:?})", template.as_str()),
            Naming::Func(_) => write!(f, "Func(..)"),
        }
    }
}

/// Where a combination's files live relative to the data directory.
#[derive(Clone, Debug)]
pub enum CasePath {
    /// One directory level per factor, in factor order.
    Nested,
    /// The data directory itself.
    Root,
    Named(Naming),
}

#[derive(Clone, Debug)]
pub struct Layout {
    pub data_dir: PathBuf,
    pub case_path: CasePath,
    pub output_prefix: Naming,
    pub output_suffix: Naming,
}

impl Layout {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Layout {
            data_dir: data_dir.as_ref().to_path_buf(),
            case_path: CasePath::Nested,
            output_prefix: Naming::Template(Template {
                source: String::new(),
                segments: vec![],
            }),
            output_suffix: Naming::Template(Template {
                source: ".nc".to_owned(),
                segments: vec![Segment::Literal(".nc".to_owned())],
            }),
        }
    }

    pub fn with_case_path(mut self, case_path: CasePath) -> Self {
        self.case_path = case_path;
        self
    }

    pub fn with_prefix(mut self, prefix: Naming) -> Self {
        self.output_prefix = prefix;
        self
    }

    pub fn with_suffix(mut self, suffix: Naming) -> Self {
        self.output_suffix = suffix;
        self
    }

    /// The directory of one combination, relative to `data_dir`.
    pub fn case_path(&self, exp: &Experiment, kws: &CaseKws) -> Result<PathBuf> {
        match &self.case_path {
            CasePath::Nested => {
                let mut path = PathBuf::new();
                for name in exp.factor_names() {
                    match kws.get(name) {
                        Some(value) => path.push(value.to_string()),
                        None => return design_err!(UnknownFactor, name.to_owned()),
                    }
                }
                Ok(path)
            }
            CasePath::Root => Ok(PathBuf::new()),
            CasePath::Named(naming) => Ok(PathBuf::from(naming.render(kws)?)),
        }
    }

    pub fn case_dir(&self, exp: &Experiment, kws: &CaseKws) -> Result<PathBuf> {
        Ok(self.data_dir.join(self.case_path(exp, kws)?))
    }

    pub fn file_name(&self, field: &str, kws: &CaseKws) -> Result<String> {
        let prefix = self.output_prefix.render(kws)?;
        let suffix = self.output_suffix.render(kws)?;
        Ok(format!("{prefix}{field}{suffix}"))
    }

    pub fn file_path(&self, exp: &Experiment, field: &str, kws: &CaseKws) -> Result<PathBuf> {
        Ok(self.case_dir(exp, kws)?.join(self.file_name(field, kws)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::experiment::Factor;
    use crate::value::FactorValue;

    fn kws(pairs: &[(&str, &str)]) -> CaseKws {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FactorValue::from(*v)))
            .collect()
    }

    fn experiment() -> Experiment {
        Experiment::new(
            "my_experiment",
            vec![
                Factor::new("emis", "Emissions Scenario", ["policy", "no_policy"]),
                Factor::new("model_config", "Model configuration", ["no_sun"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn template_render() {
        let t = Template::parse("experiment_{emis}_{model_config}.data.").unwrap();
        assert_eq!(vec!["emis", "model_config"], t.fields().collect::<Vec<_>>());
        let out = t
            .render(&kws(&[("emis", "policy"), ("model_config", "no_sun")]))
            .unwrap();
        assert_eq!("experiment_policy_no_sun.data.", out);
    }

    #[test]
    fn template_escaped_braces() {
        let t = Template::parse("{{literal}}_{emis}").unwrap();
        assert_eq!("{literal}_policy", t.render(&kws(&[("emis", "policy")])).unwrap());
    }

    #[test]
    fn template_errors() {
        assert_eq!(
            ErrorCode::BadTemplate,
            Template::parse("{emis").unwrap_err().code
        );
        assert_eq!(
            ErrorCode::BadTemplate,
            Template::parse("{emis}}").unwrap_err().code
        );
        let t = Template::parse("{resolution}").unwrap();
        assert_eq!(
            ErrorCode::BadTemplate,
            t.render(&kws(&[("emis", "policy")])).unwrap_err().code
        );
    }

    #[test]
    fn nested_layout() {
        let exp = experiment();
        let layout = Layout::new("/data");
        let case = kws(&[("emis", "no_policy"), ("model_config", "no_sun")]);
        assert_eq!(
            PathBuf::from("/data/no_policy/no_sun/tas.nc"),
            layout.file_path(&exp, "tas", &case).unwrap()
        );
    }

    #[test]
    fn templated_layout() {
        let exp = experiment();
        let layout = Layout::new("/path/to/my/data")
            .with_case_path(CasePath::Named(
                Naming::template("{model_config}/{emis}").unwrap(),
            ))
            .with_prefix(Naming::template("experiment_{emis}_{model_config}.data.").unwrap())
            .with_suffix(Naming::template(".tape.nc").unwrap());
        let case = kws(&[("emis", "policy"), ("model_config", "no_sun")]);
        assert_eq!(
            PathBuf::from("/path/to/my/data/no_sun/policy/experiment_policy_no_sun.data.TS.tape.nc"),
            layout.file_path(&exp, "TS", &case).unwrap()
        );
    }

    #[test]
    fn function_naming() {
        let exp = experiment();
        let layout = Layout::new("/data")
            .with_case_path(CasePath::Named(Naming::func(|kws| {
                kws.values()
                    .map(|v| v.to_string().to_uppercase())
                    .collect::<Vec<_>>()
                    .join("-")
            })))
            .with_suffix(Naming::func(|_| ".h0.nc".to_owned()));
        let case = kws(&[("emis", "policy"), ("model_config", "no_sun")]);
        assert_eq!(
            PathBuf::from("/data/POLICY-NO_SUN/pr.h0.nc"),
            layout.file_path(&exp, "pr", &case).unwrap()
        );
        assert_eq!(None, layout.output_suffix.source());
    }

    #[test]
    fn root_layout() {
        let exp = Experiment::single_case("control");
        let layout = Layout::new("/runs/control").with_case_path(CasePath::Root);
        let case = kws(&[("control", "control")]);
        assert_eq!(
            PathBuf::from("/runs/control/tas.nc"),
            layout.file_path(&exp, "tas", &case).unwrap()
        );
    }

    #[test]
    fn integral_float_values_keep_decimal_point() {
        let exp = Experiment::new("scaling", vec![Factor::new("scale", "Scale", [1.0, 2.5])])
            .unwrap();
        let mut case = CaseKws::new();
        case.insert("scale".to_owned(), FactorValue::from(1.0));
        assert_eq!(
            PathBuf::from("/data/1.0/TS.nc"),
            Layout::new("/data").file_path(&exp, "TS", &case).unwrap()
        );

        let t = Template::parse("run_x{scale}.").unwrap();
        assert_eq!("run_x1.0.", t.render(&case).unwrap());
        assert!(exp.to_string().ends_with("[1.0, 2.5]"));
    }

    #[test]
    fn nested_layout_needs_every_factor() {
        let exp = experiment();
        let err = Layout::new("/data")
            .case_path(&exp, &kws(&[("emis", "policy")]))
            .unwrap_err();
        assert_eq!(ErrorCode::UnknownFactor, err.code);
    }
}
