// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! In-memory datasets: a single labeled array or a table of variables
//! sharing coordinates.

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayD, Axis};

use crate::assembly_err;
use crate::common::Result;
use crate::value::{AttrValue, Attrs, FactorValue};

#[derive(Clone, PartialEq, Debug)]
pub struct Variable {
    pub dims: Vec<String>,
    pub values: ArrayD<f64>,
    pub attrs: Attrs,
}

impl Variable {
    pub fn new(dims: &[&str], values: ArrayD<f64>) -> Result<Self> {
        if dims.len() != values.ndim() {
            return assembly_err!(
                MismatchedDimensions,
                format!(
                    "{} dimension names for a {}-dimensional array",
                    dims.len(),
                    values.ndim()
                )
            );
        }
        Ok(Variable {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            values,
            attrs: Attrs::new(),
        })
    }

    pub fn with_attr<V: Into<AttrValue>>(mut self, key: &str, value: V) -> Self {
        self.attrs.insert(key.to_owned(), value.into());
        self
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    /// Index the leading axes by position, dropping them.
    fn select_leading(&self, positions: &[usize]) -> Variable {
        let mut view = self.values.view();
        for pos in positions.iter() {
            view = view.index_axis_move(Axis(0), *pos);
        }
        Variable {
            dims: self.dims[positions.len()..].to_vec(),
            values: view.to_owned(),
            attrs: self.attrs.clone(),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum CoordValues {
    Numeric(ArrayD<f64>),
    Labels(Vec<FactorValue>),
}

#[derive(Clone, PartialEq, Debug)]
pub struct Coordinate {
    pub dims: Vec<String>,
    pub values: CoordValues,
    pub attrs: Attrs,
}

impl Coordinate {
    /// A 1-d numeric coordinate along the dimension of the same name.
    pub fn numeric(dim: &str, values: Vec<f64>) -> Self {
        Coordinate {
            dims: vec![dim.to_owned()],
            values: CoordValues::Numeric(Array1::from(values).into_dyn()),
            attrs: Attrs::new(),
        }
    }

    pub fn labels(dim: &str, values: Vec<FactorValue>) -> Self {
        Coordinate {
            dims: vec![dim.to_owned()],
            values: CoordValues::Labels(values),
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr<V: Into<AttrValue>>(mut self, key: &str, value: V) -> Self {
        self.attrs.insert(key.to_owned(), value.into());
        self
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct DataArray {
    pub name: String,
    pub variable: Variable,
    pub coords: BTreeMap<String, Coordinate>,
}

impl DataArray {
    pub fn new(name: &str, dims: &[&str], values: ArrayD<f64>) -> Result<Self> {
        Ok(DataArray {
            name: name.to_owned(),
            variable: Variable::new(dims, values)?,
            coords: BTreeMap::new(),
        })
    }

    pub fn with_attr<V: Into<AttrValue>>(mut self, key: &str, value: V) -> Self {
        self.variable.attrs.insert(key.to_owned(), value.into());
        self
    }

    pub fn with_coord(mut self, name: &str, coord: Coordinate) -> Self {
        self.coords.insert(name.to_owned(), coord);
        self
    }

    pub fn dims(&self) -> &[String] {
        &self.variable.dims
    }

    pub fn values(&self) -> &ArrayD<f64> {
        &self.variable.values
    }

    pub fn attrs(&self) -> &Attrs {
        &self.variable.attrs
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Table {
    pub variables: BTreeMap<String, Variable>,
    pub coords: BTreeMap<String, Coordinate>,
    pub attrs: Attrs,
}

impl Table {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_variable(mut self, name: &str, var: Variable) -> Self {
        self.variables.insert(name.to_owned(), var);
        self
    }

    pub fn with_coord(mut self, name: &str, coord: Coordinate) -> Self {
        self.coords.insert(name.to_owned(), coord);
        self
    }

    pub fn with_attr<V: Into<AttrValue>>(mut self, key: &str, value: V) -> Self {
        self.attrs.insert(key.to_owned(), value.into());
        self
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Pull one variable out as a single array, along with the coordinates
    /// that lie on its dimensions.
    pub fn to_array(&self, name: &str) -> Result<DataArray> {
        let var = match self.variables.get(name) {
            Some(var) => var,
            None => return assembly_err!(NoData, format!("no variable '{name}' in table")),
        };
        let coords = self
            .coords
            .iter()
            .filter(|(_, coord)| coord.dims.iter().all(|d| var.dims.contains(d)))
            .map(|(k, coord)| (k.clone(), coord.clone()))
            .collect();
        Ok(DataArray {
            name: name.to_owned(),
            variable: var.clone(),
            coords,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ShapeKind {
    Array,
    Table,
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ShapeKind::Array => write!(f, "array"),
            ShapeKind::Table => write!(f, "table"),
        }
    }
}

/// A per-combination dataset, or a master structure assembled from them.
#[derive(Clone, PartialEq, Debug)]
pub enum Dataset {
    Array(DataArray),
    Table(Table),
}

impl Dataset {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Dataset::Array(_) => ShapeKind::Array,
            Dataset::Table(_) => ShapeKind::Table,
        }
    }

    pub fn as_array(&self) -> Option<&DataArray> {
        match self {
            Dataset::Array(da) => Some(da),
            Dataset::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Dataset::Table(table) => Some(table),
            Dataset::Array(_) => None,
        }
    }

    pub fn coords(&self) -> &BTreeMap<String, Coordinate> {
        match self {
            Dataset::Array(da) => &da.coords,
            Dataset::Table(table) => &table.coords,
        }
    }

    pub fn coords_mut(&mut self) -> &mut BTreeMap<String, Coordinate> {
        match self {
            Dataset::Array(da) => &mut da.coords,
            Dataset::Table(table) => &mut table.coords,
        }
    }

    /// Dataset-level attributes.  For a single array these are the array's
    /// own attributes.
    pub fn global_attrs(&self) -> &Attrs {
        match self {
            Dataset::Array(da) => &da.variable.attrs,
            Dataset::Table(table) => &table.attrs,
        }
    }

    pub fn global_attrs_mut(&mut self) -> &mut Attrs {
        match self {
            Dataset::Array(da) => &mut da.variable.attrs,
            Dataset::Table(table) => &mut table.attrs,
        }
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        match self {
            Dataset::Array(da) if da.name == name => Some(&da.variable),
            Dataset::Array(_) => None,
            Dataset::Table(table) => table.variables.get(name),
        }
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        match self {
            Dataset::Array(da) if da.name == name => Some(&mut da.variable),
            Dataset::Array(_) => None,
            Dataset::Table(table) => table.variables.get_mut(name),
        }
    }

    /// The variable `name` as a single array.
    pub fn select(&self, name: &str) -> Result<DataArray> {
        match self {
            Dataset::Array(da) if da.name == name => Ok(da.clone()),
            Dataset::Array(da) => assembly_err!(
                NoData,
                format!("array is '{}', not '{name}'", da.name)
            ),
            Dataset::Table(table) => table.to_array(name),
        }
    }

    pub fn variable_names(&self) -> Vec<&str> {
        match self {
            Dataset::Array(da) => vec![da.name.as_str()],
            Dataset::Table(table) => table.variables.keys().map(|k| k.as_str()).collect(),
        }
    }

    /// Pick one position along each of the leading dimensions `dims`,
    /// dropping those dimensions along with their coordinates.  Table
    /// variables that don't lead with `dims` are returned unchanged.
    pub fn select_leading(&self, dims: &[&str], positions: &[usize]) -> Result<Dataset> {
        if dims.len() != positions.len() {
            return assembly_err!(
                MismatchedDimensions,
                format!("{} dimensions but {} positions", dims.len(), positions.len())
            );
        }

        let leads_with = |var: &Variable| -> bool {
            var.dims.len() >= dims.len() && var.dims.iter().zip(dims.iter()).all(|(a, b)| a == b)
        };
        let check_bounds = |var: &Variable| -> Result<()> {
            for (i, pos) in positions.iter().enumerate() {
                if *pos >= var.shape()[i] {
                    return assembly_err!(
                        MismatchedShapes,
                        format!("position {pos} out of bounds along '{}'", dims[i])
                    );
                }
            }
            Ok(())
        };
        let coords = |coords: &BTreeMap<String, Coordinate>| -> BTreeMap<String, Coordinate> {
            coords
                .iter()
                .filter(|(name, _)| !dims.contains(&name.as_str()))
                .map(|(name, coord)| (name.clone(), coord.clone()))
                .collect()
        };

        match self {
            Dataset::Array(da) => {
                if !leads_with(&da.variable) {
                    return assembly_err!(
                        MismatchedDimensions,
                        format!("'{}' does not lead with [{}]", da.name, dims.join(", "))
                    );
                }
                check_bounds(&da.variable)?;
                Ok(Dataset::Array(DataArray {
                    name: da.name.clone(),
                    variable: da.variable.select_leading(positions),
                    coords: coords(&da.coords),
                }))
            }
            Dataset::Table(table) => {
                let mut variables = BTreeMap::new();
                for (name, var) in table.variables.iter() {
                    let var = if leads_with(var) {
                        check_bounds(var)?;
                        var.select_leading(positions)
                    } else {
                        var.clone()
                    };
                    variables.insert(name.clone(), var);
                }
                Ok(Dataset::Table(Table {
                    variables,
                    coords: coords(&table.coords),
                    attrs: table.attrs.clone(),
                }))
            }
        }
    }
}

impl From<DataArray> for Dataset {
    fn from(da: DataArray) -> Self {
        Dataset::Array(da)
    }
}

impl From<Table> for Dataset {
    fn from(table: Table) -> Self {
        Dataset::Table(table)
    }
}
