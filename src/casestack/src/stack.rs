// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Recursive stacking of per-combination arrays into one array with a
//! leading axis per factor.

use ndarray::{ArrayD, ArrayViewD, Axis};
use tracing::{debug, warn};

use crate::assembly_err;
use crate::common::Result;
use crate::experiment::{Combination, Factor};
use crate::value::FactorValue;

/// What to do when a fully bound combination has no array.
#[derive(Copy, Clone, Debug)]
pub enum Gaps<'a> {
    /// Every combination must be present.
    Strict,
    /// Substitute this array for absent combinations.
    Fill(&'a ArrayD<f64>),
}

/// Stack the arrays returned by `lookup` into a single array whose leading
/// `factors.len()` axes are the factors, outermost first, each ordered by
/// the factor's declared values.
///
/// `lookup` is called once per combination with the bound factor values in
/// factor order.
pub fn stack_combinations<'d, F>(
    factors: &[Factor],
    gaps: Gaps,
    mut lookup: F,
) -> Result<ArrayD<f64>>
where
    F: FnMut(&[FactorValue]) -> Option<ArrayViewD<'d, f64>>,
{
    let mut bound = Combination::with_capacity(factors.len());
    stack_level(factors, gaps, &mut lookup, &mut bound)
}

fn stack_level<'d, F>(
    factors: &[Factor],
    gaps: Gaps,
    lookup: &mut F,
    bound: &mut Combination,
) -> Result<ArrayD<f64>>
where
    F: FnMut(&[FactorValue]) -> Option<ArrayViewD<'d, f64>>,
{
    let depth = bound.len();
    if depth == factors.len() {
        debug!(case = %display_combination(&bound[..]), "stacking");
        return match (lookup(&bound[..]), gaps) {
            (Some(values), _) => Ok(values.to_owned()),
            (None, Gaps::Fill(placeholder)) => {
                warn!(case = %display_combination(&bound[..]), "substituting placeholder");
                Ok(placeholder.clone())
            }
            (None, Gaps::Strict) => {
                assembly_err!(MissingCombination, display_combination(&bound[..]))
            }
        };
    }

    let factor = &factors[depth];
    let mut children: Vec<ArrayD<f64>> = Vec::with_capacity(factor.len());
    for value in factor.values.iter() {
        bound.push(value.clone());
        let child = stack_level(factors, gaps, lookup, bound);
        bound.pop();
        children.push(child?);
    }

    // each child already carries the axes of the factors after this one, so
    // the new axis 0 here lands at position `depth` of the final array
    let views: Vec<ArrayViewD<f64>> = children.iter().map(|child| child.view()).collect();
    match ndarray::stack(Axis(0), &views) {
        Ok(stacked) => Ok(stacked),
        Err(err) => assembly_err!(
            MismatchedShapes,
            format!(
                "can't stack along '{}' at [{}]: {err}",
                factor.short_name,
                display_combination(&bound[..])
            )
        ),
    }
}

pub(crate) fn display_combination(combination: &[FactorValue]) -> String {
    let parts: Vec<String> = combination.iter().map(|v| v.to_string()).collect();
    parts.join(", ")
}
