// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Property-based tests for master assembly.
//!
//! These tests verify that:
//! 1. The master structure has one leading dimension per factor, sized by
//!    the number of factor values, followed by the per-case dimensions
//! 2. Selecting a combination back out of the master gives the original
//!    per-case data
//! 3. Reordering factors permutes the leading axes of the master

use ndarray::{ArrayD, IxDyn};
use proptest::prelude::*;

use casestack::{CaseData, DataArray, Dataset, Experiment, Factor, assemble, decompose};

fn design_strategy() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    (
        prop::collection::vec(1usize..4, 1..4),
        prop::collection::vec(1usize..4, 0..3),
    )
}

fn experiment(levels: &[usize]) -> Experiment {
    let factors = levels
        .iter()
        .enumerate()
        .map(|(i, n)| Factor::new(&format!("f{i}"), &format!("Factor {i}"), 0..*n as i64))
        .collect();
    Experiment::new("prop", factors).unwrap()
}

fn case_array(k: usize, trailing: &[usize]) -> DataArray {
    let len: usize = trailing.iter().product();
    let values: Vec<f64> = (0..len).map(|j| (k * 100 + j) as f64).collect();
    let dims: Vec<String> = (0..trailing.len()).map(|i| format!("d{i}")).collect();
    let dims: Vec<&str> = dims.iter().map(|d| d.as_str()).collect();
    DataArray::new(
        "v",
        &dims,
        ArrayD::from_shape_vec(IxDyn(trailing), values).unwrap(),
    )
    .unwrap()
}

fn case_data(exp: &Experiment, trailing: &[usize]) -> CaseData {
    exp.all_combinations()
        .enumerate()
        .map(|(k, combination)| (combination, Dataset::from(case_array(k, trailing))))
        .collect()
}

proptest! {
    #[test]
    fn master_has_leading_factor_dims((levels, trailing) in design_strategy()) {
        let exp = experiment(&levels);
        let master = assemble(&exp, &case_data(&exp, &trailing), &[]).unwrap();
        let da = master.as_array().unwrap();

        let expected: Vec<usize> = levels.iter().chain(trailing.iter()).cloned().collect();
        prop_assert_eq!(&expected[..], da.values().shape());
        prop_assert_eq!(levels.len() + trailing.len(), da.dims().len());
        for (i, name) in exp.factor_names().into_iter().enumerate() {
            prop_assert_eq!(name, da.dims()[i].as_str());
            prop_assert!(da.coords.contains_key(name));
        }
    }

    #[test]
    fn decompose_inverts_assemble((levels, trailing) in design_strategy()) {
        let exp = experiment(&levels);
        let data = case_data(&exp, &trailing);
        let master = assemble(&exp, &data, &[]).unwrap();
        let cases = decompose(&exp, &master).unwrap();

        prop_assert_eq!(exp.n_combinations(), cases.len());
        for combination in exp.all_combinations() {
            let original = data.dataset(&combination).unwrap().as_array().unwrap();
            let recovered = cases.dataset(&combination).unwrap().as_array().unwrap();
            prop_assert_eq!(original.values(), recovered.values());
            prop_assert_eq!(original.dims(), recovered.dims());
        }
    }

    #[test]
    fn factor_order_permutes_axes(first in 1usize..4, second in 1usize..4) {
        let forward = experiment(&[first, second]);
        let data = case_data(&forward, &[]);

        let backward = Experiment::new(
            "prop",
            vec![
                forward.factors()[1].clone(),
                forward.factors()[0].clone(),
            ],
        )
        .unwrap();
        let swapped: CaseData = forward
            .all_combinations()
            .map(|combination| {
                let ds = data.dataset(&combination).unwrap().clone();
                (combination.into_iter().rev().collect(), ds)
            })
            .collect();

        let a = assemble(&forward, &data, &[]).unwrap();
        let b = assemble(&backward, &swapped, &[]).unwrap();
        let a = a.as_array().unwrap().values();
        let b = b.as_array().unwrap().values();
        prop_assert_eq!(a.t(), b.view());
    }
}
