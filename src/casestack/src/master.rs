// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Master dataset assembly.
//!
//! A master dataset folds the per-combination datasets of an experiment
//! into one structure with a leading dimension per factor.  Single arrays
//! must cover every combination.  Tables tolerate per-field gaps: a field
//! missing from a combination (or a combination that failed to load) is
//! filled with a NaN placeholder shaped like the first combination that
//! does have the field.  Which slices were filled is not recorded.

use std::collections::{HashMap, HashSet};
use std::error;
use std::fmt;
use std::path::PathBuf;

use ndarray::ArrayD;
use tracing::{debug, debug_span, info};

use crate::assembly_err;
use crate::attrs::propagate;
use crate::common::Result;
use crate::dataset::{Coordinate, DataArray, Dataset, Table, Variable};
use crate::experiment::{Combination, Experiment};
use crate::stack::{Gaps, display_combination, stack_combinations};
use crate::value::{Attrs, FactorValue};

/// Why a single combination produced no dataset.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LoadError {
    pub field: String,
    pub path: PathBuf,
    pub reason: String,
}

impl LoadError {
    pub fn new(field: &str, path: PathBuf, reason: String) -> Self {
        LoadError {
            field: field.to_owned(),
            path,
            reason,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "couldn't load '{}' from {}: {}",
            self.field,
            self.path.display(),
            self.reason
        )
    }
}

impl error::Error for LoadError {}

pub type CaseOutcome = std::result::Result<Dataset, LoadError>;

/// Per-combination datasets of one experiment, including the combinations
/// that failed to load.
#[derive(Clone, Debug, Default)]
pub struct CaseData {
    cases: HashMap<Combination, CaseOutcome>,
}

impl CaseData {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn insert(&mut self, combination: Combination, dataset: Dataset) -> Option<CaseOutcome> {
        self.cases.insert(combination, Ok(dataset))
    }

    pub fn insert_failure(
        &mut self,
        combination: Combination,
        err: LoadError,
    ) -> Option<CaseOutcome> {
        self.cases.insert(combination, Err(err))
    }

    pub fn insert_outcome(
        &mut self,
        combination: Combination,
        outcome: CaseOutcome,
    ) -> Option<CaseOutcome> {
        self.cases.insert(combination, outcome)
    }

    pub fn get(&self, combination: &[FactorValue]) -> Option<&CaseOutcome> {
        self.cases.get(combination)
    }

    /// The dataset for `combination`, if it was loaded successfully.
    pub fn dataset(&self, combination: &[FactorValue]) -> Option<&Dataset> {
        self.cases.get(combination).and_then(|outcome| outcome.as_ref().ok())
    }

    pub fn contains(&self, combination: &[FactorValue]) -> bool {
        self.cases.contains_key(combination)
    }

    pub fn remove(&mut self, combination: &[FactorValue]) -> Option<CaseOutcome> {
        self.cases.remove(combination)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Combination, &CaseOutcome)> {
        self.cases.iter()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Combination, &LoadError)> {
        self.cases
            .iter()
            .filter_map(|(combination, outcome)| outcome.as_ref().err().map(|e| (combination, e)))
    }

    /// Apply `f` to every loaded dataset; failed combinations are kept as
    /// they are.
    pub fn map<F>(self, mut f: F) -> CaseData
    where
        F: FnMut(&Combination, Dataset) -> Dataset,
    {
        let cases = self
            .cases
            .into_iter()
            .map(|(combination, outcome)| {
                let outcome = outcome.map(|ds| f(&combination, ds));
                (combination, outcome)
            })
            .collect();
        CaseData { cases }
    }
}

impl CaseData {
    /// Replace every loaded dataset with its variable `name` as a single
    /// array, so the cases assemble in array mode.  Fails if any loaded
    /// case lacks the variable.
    pub fn select(self, name: &str) -> Result<CaseData> {
        let mut cases = HashMap::with_capacity(self.cases.len());
        for (combination, outcome) in self.cases {
            let outcome = match outcome {
                Ok(ds) => Ok(Dataset::Array(ds.select(name)?)),
                Err(err) => Err(err),
            };
            cases.insert(combination, outcome);
        }
        Ok(CaseData { cases })
    }
}

impl FromIterator<(Combination, Dataset)> for CaseData {
    fn from_iter<I: IntoIterator<Item = (Combination, Dataset)>>(iter: I) -> Self {
        CaseData {
            cases: iter.into_iter().map(|(c, ds)| (c, Ok(ds))).collect(),
        }
    }
}

/// Combine the per-combination datasets in `data` into a master dataset
/// with one leading dimension per factor of `exp`.
///
/// For tables, `fields` selects the variables to stack; other variables of
/// the prototype are carried over unstacked.  An empty `fields` stacks
/// every variable.  `fields` is ignored for single arrays.
pub fn assemble(exp: &Experiment, data: &CaseData, fields: &[&str]) -> Result<Dataset> {
    let missing: Vec<String> = exp
        .all_combinations()
        .filter(|combination| !data.contains(combination))
        .map(|combination| display_combination(&combination))
        .collect();
    if !missing.is_empty() {
        return assembly_err!(
            IncompleteDesign,
            format!("no entry for [{}]", missing.join("], ["))
        );
    }

    let proto = match exp
        .all_combinations()
        .find_map(|combination| data.dataset(&combination))
    {
        Some(proto) => proto,
        None => {
            return assembly_err!(NoData, format!("no case of '{}' loaded", exp.name));
        }
    };

    for (combination, outcome) in data.iter() {
        if let Ok(ds) = outcome {
            if ds.kind() != proto.kind() {
                return assembly_err!(
                    MixedShapes,
                    format!(
                        "[{}] is a {} but the prototype is a {}",
                        display_combination(combination),
                        ds.kind(),
                        proto.kind()
                    )
                );
            }
        }
    }
    check_dimension_conflicts(exp, proto)?;

    info!(
        experiment = %exp.name,
        kind = %proto.kind(),
        cases = data.len(),
        "assembling master dataset"
    );

    let mut master = match proto {
        Dataset::Array(proto) => Dataset::Array(assemble_array(exp, data, proto)?),
        Dataset::Table(proto) => Dataset::Table(assemble_table(exp, data, proto, fields)?),
    };

    for factor in exp.factors() {
        let coord = Coordinate::labels(&factor.short_name, factor.values.clone())
            .with_attr("long_name", factor.display_name.as_str());
        master.coords_mut().insert(factor.short_name.clone(), coord);
    }

    propagate(proto, &mut master);

    Ok(master)
}

fn check_dimension_conflicts(exp: &Experiment, proto: &Dataset) -> Result<()> {
    let mut taken: HashSet<&str> = proto.coords().keys().map(|k| k.as_str()).collect();
    match proto {
        Dataset::Array(da) => taken.extend(da.dims().iter().map(|d| d.as_str())),
        Dataset::Table(table) => {
            for var in table.variables.values() {
                taken.extend(var.dims.iter().map(|d| d.as_str()));
            }
        }
    }

    for name in exp.factor_names() {
        if taken.contains(name) {
            return assembly_err!(
                DimensionConflict,
                format!("factor '{name}' is already a dimension of the case data")
            );
        }
    }

    Ok(())
}

fn leading_dims(exp: &Experiment, dims: &[String]) -> Vec<String> {
    exp.factor_names()
        .into_iter()
        .map(|name| name.to_owned())
        .chain(dims.iter().cloned())
        .collect()
}

fn assemble_array(exp: &Experiment, data: &CaseData, proto: &DataArray) -> Result<DataArray> {
    let values = stack_combinations(exp.factors(), Gaps::Strict, |combination| {
        data.dataset(combination)
            .and_then(|ds| ds.as_array())
            .map(|da| da.values().view())
    })?;

    Ok(DataArray {
        name: proto.name.clone(),
        variable: Variable {
            dims: leading_dims(exp, proto.dims()),
            values,
            attrs: Attrs::new(),
        },
        coords: proto.coords.clone(),
    })
}

fn assemble_table(
    exp: &Experiment,
    data: &CaseData,
    proto: &Table,
    fields: &[&str],
) -> Result<Table> {
    if exp.n_combinations() <= 1 {
        return assembly_err!(
            TooFewCombinations,
            format!("{} case(s) of '{}' to align", exp.n_combinations(), exp.name)
        );
    }
    if proto.variables.is_empty() {
        return assembly_err!(
            UnsupportedShape,
            "prototype table has no data variables".to_owned()
        );
    }

    let mut names: Vec<&str> = proto.variables.keys().map(|k| k.as_str()).collect();
    for field in fields.iter() {
        if !names.contains(field) {
            names.push(*field);
        }
    }

    let mut master = Table {
        variables: Default::default(),
        coords: proto.coords.clone(),
        attrs: Attrs::new(),
    };

    for name in names {
        if !fields.is_empty() && !fields.contains(&name) {
            if let Some(var) = proto.variables.get(name) {
                master.variables.insert(name.to_owned(), var.clone());
            }
            continue;
        }

        let reference = exp.all_combinations().find_map(|combination| {
            data.dataset(&combination)
                .and_then(|ds| ds.variable(name))
        });
        let reference = match reference {
            Some(reference) => reference,
            None => {
                debug!(field = name, "field not present in any case, skipping");
                continue;
            }
        };

        let _span = debug_span!("stack", field = name).entered();
        let placeholder = ArrayD::from_elem(reference.values.raw_dim(), f64::NAN);
        let values = stack_combinations(exp.factors(), Gaps::Fill(&placeholder), |combination| {
            data.dataset(combination)
                .and_then(|ds| ds.variable(name))
                .map(|var| var.values.view())
        })?;

        master.variables.insert(
            name.to_owned(),
            Variable {
                dims: leading_dims(exp, &reference.dims),
                values,
                attrs: reference.attrs.clone(),
            },
        );
    }

    Ok(master)
}

/// Split a master dataset back into one dataset per combination, the
/// inverse of [`assemble`].
pub fn decompose(exp: &Experiment, master: &Dataset) -> Result<CaseData> {
    let dims = exp.factor_names();
    let mut cases = CaseData::new();
    for combination in exp.all_combinations() {
        let positions = match exp.position_of(&combination) {
            Some(positions) => positions,
            None => {
                return assembly_err!(
                    MismatchedDimensions,
                    display_combination(&combination)
                );
            }
        };
        let ds = master.select_leading(&dims, &positions)?;
        cases.insert(combination, ds);
    }
    Ok(cases)
}
