// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::common::Result;
use crate::io_err;
use crate::master::CaseData;
use crate::value::{AttrValue, Attrs};

// Helper functions for serde skip_serializing_if

fn is_empty_string(val: &str) -> bool {
    val.is_empty()
}

fn is_empty_vec<T>(val: &[T]) -> bool {
    val.is_empty()
}

fn is_unit_scale(val: &f64) -> bool {
    *val == 1.0
}

fn default_scale_factor() -> f64 {
    1.0
}

// `oldvar` is written either as a single field name or a list of them
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.is_empty() => vec![],
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Describes an output variable to extract from an experiment: the name it
/// is known by in the analysis, the archive fields it is built from, and
/// the descriptive metadata to attach to it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct VarSpec {
    pub varname: String,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "is_empty_vec"
    )]
    pub oldvar: Vec<String>,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub long_name: String,
    #[serde(default, skip_serializing_if = "is_empty_string")]
    pub units: String,
    #[serde(
        default = "default_scale_factor",
        skip_serializing_if = "is_unit_scale"
    )]
    pub scale_factor: f64,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attributes: Attrs,
}

impl VarSpec {
    pub fn new(varname: &str) -> Self {
        VarSpec {
            varname: varname.to_owned(),
            oldvar: vec![],
            long_name: String::new(),
            units: String::new(),
            scale_factor: 1.0,
            attributes: Attrs::new(),
        }
    }

    pub fn with_oldvar(mut self, fields: &[&str]) -> Self {
        self.oldvar = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_long_name(mut self, long_name: &str) -> Self {
        self.long_name = long_name.to_owned();
        self
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = units.to_owned();
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_attribute<V: Into<AttrValue>>(mut self, key: &str, value: V) -> Self {
        self.attributes.insert(key.to_owned(), value.into());
        self
    }

    /// Whether the variable is derived from fields with other names.
    pub fn is_renamed(&self) -> bool {
        self.oldvar.iter().any(|f| *f != self.varname)
    }

    /// The fields to stack when building a master dataset: the variable
    /// itself followed by the fields it is derived from.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = vec![self.varname.as_str()];
        for field in self.oldvar.iter() {
            if !fields.contains(&field.as_str()) {
                fields.push(field.as_str());
            }
        }
        fields
    }

    /// Descriptive attributes for the extracted variable.  Units default to
    /// "1" (dimensionless), and `scale_factor` is only present when it
    /// actually rescales.
    pub fn attrs(&self) -> Attrs {
        let mut attrs = self.attributes.clone();
        if !self.long_name.is_empty() {
            attrs.insert("long_name".to_owned(), self.long_name.as_str().into());
        }
        let units = if self.units.is_empty() {
            "1"
        } else {
            self.units.as_str()
        };
        attrs.insert("units".to_owned(), units.into());
        if !is_unit_scale(&self.scale_factor) {
            attrs.insert("scale_factor".to_owned(), self.scale_factor.into());
        }
        attrs
    }

    /// Pull this variable out of every loaded case as a single array
    /// carrying the variable's descriptive attributes.
    pub fn to_arrays(&self, data: CaseData) -> Result<CaseData> {
        let attrs = self.attrs();
        Ok(data.select(&self.varname)?.map(|_, mut ds| {
            ds.global_attrs_mut().extend(attrs.clone());
            ds
        }))
    }

    pub fn to_json(&self) -> Result<String> {
        match serde_json::to_string_pretty(self) {
            Ok(json) => Ok(json),
            Err(err) => io_err!(JsonEncode, err.to_string()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        match serde_json::from_str(json) {
            Ok(var) => Ok(var),
            Err(err) => io_err!(JsonDecode, err.to_string()),
        }
    }
}

impl fmt::Display for VarSpec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let units = if self.units.is_empty() {
            "1"
        } else {
            self.units.as_str()
        };
        write!(f, "{} ({}) [{}]", self.varname, self.long_name, units)?;
        if self.is_renamed() {
            write!(f, "\n    from fields {}", self.oldvar.join(","))?;
        }
        Ok(())
    }
}
