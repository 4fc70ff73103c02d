// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Organize the output of a multi-run (factorial) simulation experiment
//! and fold the per-run results into master datasets with one leading
//! dimension per experimental factor.

#![forbid(unsafe_code)]

pub mod archive;
mod attrs;
pub mod common;
pub mod config;
pub mod dataset;
pub mod experiment;
pub mod layout;
pub mod master;
mod stack;
pub mod value;
pub mod var;

pub use self::archive::{Archive, CaseLocation, Loader, Preprocess};
pub use self::attrs::propagate;
pub use self::common::{Error, ErrorCode, ErrorKind, Result};
pub use self::config::{CaseConfig, ExperimentConfig};
pub use self::dataset::{
    CoordValues, Coordinate, DataArray, Dataset, ShapeKind, Table, Variable,
};
pub use self::experiment::{CaseKws, Combination, Combinations, Experiment, Factor};
pub use self::layout::{CasePath, Layout, Naming, Template};
pub use self::master::{CaseData, CaseOutcome, LoadError, assemble, decompose};
pub use self::stack::{Gaps, stack_combinations};
pub use self::value::{AttrValue, Attrs, FactorValue};
pub use self::var::VarSpec;
