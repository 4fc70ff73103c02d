// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeMap;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// A single discrete level of a factor.
///
/// Factor values end up as map keys (they identify a combination) and as
/// coordinate labels, so floats are wrapped in `OrderedFloat` to get total
/// equality and hashing.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactorValue {
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
}

impl FactorValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FactorValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for FactorValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FactorValue::Int(n) => write!(f, "{n}"),
            // integral floats print as `1.0`, not `1`
            FactorValue::Float(n) if n.0.is_finite() && n.0.fract() == 0.0 && n.0.abs() < 1e16 => {
                write!(f, "{:.1}", n.0)
            }
            FactorValue::Float(n) => write!(f, "{}", n.0),
            FactorValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for FactorValue {
    fn from(s: &str) -> Self {
        FactorValue::Str(s.to_owned())
    }
}

impl From<String> for FactorValue {
    fn from(s: String) -> Self {
        FactorValue::Str(s)
    }
}

impl From<i64> for FactorValue {
    fn from(n: i64) -> Self {
        FactorValue::Int(n)
    }
}

impl From<i32> for FactorValue {
    fn from(n: i32) -> Self {
        FactorValue::Int(n as i64)
    }
}

impl From<f64> for FactorValue {
    fn from(n: f64) -> Self {
        FactorValue::Float(OrderedFloat(n))
    }
}

/// A descriptive attribute value attached to a variable, coordinate or
/// dataset (`units`, `long_name`, `scale_factor`, ...).
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
    FloatList(Vec<f64>),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AttrValue::Int(n) => write!(f, "{n}"),
            AttrValue::Float(n) => write!(f, "{n}"),
            AttrValue::Str(s) => write!(f, "{s}"),
            AttrValue::FloatList(list) => {
                let parts: Vec<String> = list.iter().map(|n| n.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Int(n)
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Float(n)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(list: Vec<f64>) -> Self {
        AttrValue::FloatList(list)
    }
}

pub type Attrs = BTreeMap<String, AttrValue>;
