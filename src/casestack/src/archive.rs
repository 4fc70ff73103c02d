// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! An experiment together with the on-disk layout of its output.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::common::Result;
use crate::dataset::Dataset;
use crate::experiment::{CaseKws, Combination, Experiment};
use crate::layout::{CasePath, Layout};
use crate::master::{CaseData, LoadError, assemble};
use crate::var::VarSpec;
use crate::{config_err, io_err};

/// Reads one field of one combination from the archive.  Decoding the file
/// format is up to the implementation.
pub trait Loader {
    fn load(&self, field: &str, path: &Path) -> std::result::Result<Dataset, LoadError>;
}

impl<F> Loader for F
where
    F: Fn(&str, &Path) -> std::result::Result<Dataset, LoadError>,
{
    fn load(&self, field: &str, path: &Path) -> std::result::Result<Dataset, LoadError> {
        self(field, path)
    }
}

/// Applied to every dataset right after it is loaded.
pub type Preprocess<'a> = &'a dyn Fn(Dataset, &CaseKws) -> Dataset;

#[derive(Clone, PartialEq, Debug)]
pub struct CaseLocation {
    pub combination: Combination,
    pub kws: CaseKws,
    pub dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct Archive {
    pub experiment: Experiment,
    pub layout: Layout,
    /// One file per field holding every timestep.  The alternative, one
    /// file per timestep holding every field, can't be loaded.
    pub timeseries: bool,
}

impl Archive {
    pub fn new(experiment: Experiment, layout: Layout) -> Self {
        Archive {
            experiment,
            layout,
            timeseries: true,
        }
    }

    /// An archive holding the output of a single model run directly in
    /// `data_dir`.
    pub fn single_case<P: AsRef<Path>>(name: &str, data_dir: P) -> Self {
        Archive::new(
            Experiment::single_case(name),
            Layout::new(data_dir).with_case_path(CasePath::Root),
        )
    }

    pub fn with_timeseries(mut self, timeseries: bool) -> Self {
        self.timeseries = timeseries;
        self
    }

    pub fn walk_cases(&self) -> Result<Vec<CaseLocation>> {
        self.experiment
            .all_combinations()
            .map(|combination| {
                let kws = self.experiment.combination_to_kwargs(&combination)?;
                let dir = self.layout.case_dir(&self.experiment, &kws)?;
                Ok(CaseLocation {
                    combination,
                    kws,
                    dir,
                })
            })
            .collect()
    }

    /// The file holding `field` for every combination, in combination order.
    pub fn walk_files(&self, field: &str) -> Result<Vec<(CaseKws, PathBuf)>> {
        self.experiment
            .all_combinations()
            .map(|combination| {
                let kws = self.experiment.combination_to_kwargs(&combination)?;
                let path = self.layout.file_path(&self.experiment, field, &kws)?;
                Ok((kws, path))
            })
            .collect()
    }

    pub fn files_for_case(&self, field: &str, kws: &CaseKws) -> Result<PathBuf> {
        // reject combinations outside the design before building a path
        self.experiment.kwargs_to_combination(kws)?;
        self.layout.file_path(&self.experiment, field, kws)
    }

    /// Check that the data directory has a directory for every combination.
    pub fn validate(&self) -> Result<()> {
        debug!(data_dir = %self.layout.data_dir.display(), "validating archive");
        if !self.layout.data_dir.is_dir() {
            return io_err!(
                MissingCaseDirectory,
                format!("{}", self.layout.data_dir.display())
            );
        }
        for case in self.walk_cases()? {
            debug!(path = %case.dir.display(), "checking case directory");
            if !case.dir.is_dir() {
                return io_err!(MissingCaseDirectory, format!("{}", case.dir.display()));
            }
        }
        Ok(())
    }

    fn check_loadable(&self) -> Result<()> {
        if !self.timeseries {
            return config_err!(
                Unsupported,
                format!(
                    "'{}' is stored as time slices; only time series can be loaded",
                    self.experiment.name
                )
            );
        }
        Ok(())
    }

    /// Load `field` for the single combination `kws`.
    pub fn load_case(
        &self,
        field: &str,
        kws: &CaseKws,
        loader: &dyn Loader,
        preprocess: Option<Preprocess>,
    ) -> Result<Dataset> {
        self.check_loadable()?;
        let path = self.files_for_case(field, kws)?;
        debug!(experiment = %self.experiment.name, field, path = %path.display(), "loading case");
        let ds = match loader.load(field, &path) {
            Ok(ds) => ds,
            Err(err) => return io_err!(Io, err.to_string()),
        };
        Ok(match preprocess {
            Some(f) => f(ds, kws),
            None => ds,
        })
    }

    /// Load `field` for every combination.  Combinations that fail to load
    /// are recorded in the result rather than aborting the walk.
    pub fn load_all(
        &self,
        field: &str,
        loader: &dyn Loader,
        preprocess: Option<Preprocess>,
    ) -> Result<CaseData> {
        self.check_loadable()?;
        info!(experiment = %self.experiment.name, field, "loading all cases");

        let mut data = CaseData::new();
        for (kws, path) in self.walk_files(field)? {
            let combination = self.experiment.kwargs_to_combination(&kws)?;
            debug!(field, path = %path.display(), "loading");
            match loader.load(field, &path) {
                Ok(ds) => {
                    let ds = match preprocess {
                        Some(f) => f(ds, &kws),
                        None => ds,
                    };
                    data.insert(combination, ds);
                }
                Err(err) => {
                    warn!(case = ?kws, error = %err, "could not load case");
                    data.insert_failure(combination, err);
                }
            }
        }

        Ok(data)
    }

    /// Load `field` for every combination and assemble the master dataset.
    pub fn load_master(
        &self,
        field: &str,
        loader: &dyn Loader,
        preprocess: Option<Preprocess>,
        fields: &[&str],
    ) -> Result<Dataset> {
        let data = self.load_all(field, loader, preprocess)?;
        assemble(&self.experiment, &data, fields)
    }

    /// Load the master dataset for `var`: the file named after the variable
    /// is read for every combination, the variable and the fields it is
    /// derived from are stacked, and the variable's descriptive attributes
    /// are attached to it.
    pub fn load_master_var(
        &self,
        var: &VarSpec,
        loader: &dyn Loader,
        preprocess: Option<Preprocess>,
    ) -> Result<Dataset> {
        let mut master = self.load_master(&var.varname, loader, preprocess, &var.fields())?;
        if let Some(variable) = master.variable_mut(&var.varname) {
            variable.attrs.extend(var.attrs());
        }
        Ok(master)
    }
}
