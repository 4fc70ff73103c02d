// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The factor registry of an experiment.
//!
//! An experiment is a full factorial design: an ordered list of factors,
//! each with an ordered list of discrete values.  Every element of the
//! Cartesian product of those values (a "combination") identifies one
//! simulation run.  Factor order is significant: it is the dimension order
//! of every assembled master structure and the default directory nesting
//! order of the archive.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use smallvec::SmallVec;

use crate::common::Result;
use crate::design_err;
use crate::value::FactorValue;

/// One value per factor, positionally aligned with the factor order.
pub type Combination = SmallVec<[FactorValue; 4]>;

/// A combination keyed by factor short name.
pub type CaseKws = BTreeMap<String, FactorValue>;

#[derive(Clone, PartialEq, Debug)]
pub struct Factor {
    pub short_name: String,
    pub display_name: String,
    pub values: Vec<FactorValue>,
}

impl Factor {
    pub fn new<V, I>(short_name: &str, display_name: &str, values: I) -> Self
    where
        V: Into<FactorValue>,
        I: IntoIterator<Item = V>,
    {
        Factor {
            short_name: short_name.to_owned(),
            display_name: display_name.to_owned(),
            values: values.into_iter().map(|v| v.into()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn position(&self, value: &FactorValue) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Experiment {
    pub name: String,
    factors: Vec<Factor>,
    offsets: HashMap<String, usize>,
}

impl Experiment {
    pub fn new(name: &str, factors: Vec<Factor>) -> Result<Self> {
        let mut exp = Experiment {
            name: name.to_owned(),
            factors: Vec::with_capacity(factors.len()),
            offsets: HashMap::new(),
        };
        exp.add_factors(factors)?;
        if exp.factors.is_empty() {
            return design_err!(NoFactors, format!("experiment '{name}' has no factors"));
        }
        Ok(exp)
    }

    /// An experiment holding a single model run: one factor named after the
    /// run, with the run name as its only value.
    pub fn single_case(name: &str) -> Self {
        let factor = Factor::new(name, name, [name]);
        let mut offsets = HashMap::new();
        offsets.insert(name.to_owned(), 0);
        Experiment {
            name: name.to_owned(),
            factors: vec![factor],
            offsets,
        }
    }

    /// Append factors to the design.  Either every factor is added or, on
    /// error, none are.
    pub fn add_factors(&mut self, factors: Vec<Factor>) -> Result<()> {
        let mut seen: HashSet<&str> = self.offsets.keys().map(|k| k.as_str()).collect();
        for factor in factors.iter() {
            if !seen.insert(factor.short_name.as_str()) {
                return design_err!(DuplicateFactor, factor.short_name.clone());
            }
            if factor.is_empty() {
                return design_err!(EmptyValues, factor.short_name.clone());
            }
        }

        for factor in factors {
            self.offsets
                .insert(factor.short_name.clone(), self.factors.len());
            self.factors.push(factor);
        }

        Ok(())
    }

    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn factor(&self, short_name: &str) -> Option<&Factor> {
        self.offsets.get(short_name).map(|off| &self.factors[*off])
    }

    pub fn factor_names(&self) -> Vec<&str> {
        self.factors.iter().map(|f| f.short_name.as_str()).collect()
    }

    pub fn get_factor_values(&self, short_name: &str) -> Result<&[FactorValue]> {
        match self.factor(short_name) {
            Some(factor) => Ok(&factor.values),
            None => design_err!(UnknownFactor, short_name.to_owned()),
        }
    }

    /// Number of values per factor, in factor order.
    pub fn shape(&self) -> Vec<usize> {
        self.factors.iter().map(|f| f.len()).collect()
    }

    pub fn n_combinations(&self) -> usize {
        self.factors.iter().map(|f| f.len()).product()
    }

    /// Every combination of factor values, first-declared factor varying
    /// slowest.  Each call returns a fresh iterator.
    pub fn all_combinations(&self) -> Combinations<'_> {
        Combinations::new(&self.factors)
    }

    pub fn combination_to_kwargs(&self, combination: &[FactorValue]) -> Result<CaseKws> {
        if combination.len() != self.factors.len() {
            return design_err!(
                ArityMismatch,
                format!(
                    "expected {} factor values, got {}",
                    self.factors.len(),
                    combination.len()
                )
            );
        }

        Ok(self
            .factors
            .iter()
            .zip(combination.iter())
            .map(|(factor, value)| (factor.short_name.clone(), value.clone()))
            .collect())
    }

    pub fn kwargs_to_combination(&self, kws: &CaseKws) -> Result<Combination> {
        let mut combination = Combination::with_capacity(self.factors.len());
        for factor in self.factors.iter() {
            match kws.get(&factor.short_name) {
                Some(value) => combination.push(value.clone()),
                None => return design_err!(UnknownFactor, factor.short_name.clone()),
            }
        }
        if kws.len() != self.factors.len() {
            let extra: Vec<&str> = kws
                .keys()
                .filter(|k| !self.offsets.contains_key(k.as_str()))
                .map(|k| k.as_str())
                .collect();
            return design_err!(ArityMismatch, format!("unknown factors: {}", extra.join(", ")));
        }
        Ok(combination)
    }

    /// Per-factor index of each value in `combination`, or `None` if any value
    /// isn't part of the design.
    pub fn position_of(&self, combination: &[FactorValue]) -> Option<Vec<usize>> {
        if combination.len() != self.factors.len() {
            return None;
        }
        self.factors
            .iter()
            .zip(combination.iter())
            .map(|(factor, value)| factor.position(value))
            .collect()
    }
}

impl fmt::Display for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} -", self.name)?;
        for factor in self.factors.iter() {
            let vals: Vec<String> = factor.values.iter().map(|v| v.to_string()).collect();
            write!(
                f,
                "\n   * {} ({}):  [{}]",
                factor.short_name,
                factor.display_name,
                vals.join(", ")
            )?;
        }
        Ok(())
    }
}

/// Row-major walk over the Cartesian product of factor values.
#[derive(Clone, Debug)]
pub struct Combinations<'a> {
    factors: &'a [Factor],
    // odometer; the last factor spins fastest
    indices: Vec<usize>,
    remaining: usize,
}

impl<'a> Combinations<'a> {
    fn new(factors: &'a [Factor]) -> Self {
        Combinations {
            factors,
            indices: vec![0; factors.len()],
            remaining: factors.iter().map(|f| f.len()).product(),
        }
    }
}

impl Iterator for Combinations<'_> {
    type Item = Combination;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let combination: Combination = self
            .factors
            .iter()
            .zip(self.indices.iter())
            .map(|(factor, i)| factor.values[*i].clone())
            .collect();

        self.remaining -= 1;
        for (i, factor) in self.factors.iter().enumerate().rev() {
            self.indices[i] += 1;
            if self.indices[i] < factor.len() {
                break;
            }
            self.indices[i] = 0;
        }

        Some(combination)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Combinations<'_> {}
