// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::{error, fmt, result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError, // will never be produced
    // design construction and decoding
    NoFactors,
    DuplicateFactor,
    EmptyValues,
    ArityMismatch,
    UnknownFactor,
    // master assembly
    IncompleteDesign,
    MissingCombination,
    UnsupportedShape,
    TooFewCombinations,
    MixedShapes,
    MismatchedShapes,
    MismatchedDimensions,
    DimensionConflict,
    NoData,
    // archive access and configuration
    BadTemplate,
    MissingCaseDirectory,
    Io,
    YamlDecode,
    YamlEncode,
    JsonDecode,
    JsonEncode,
    NotSerializable,
    Unsupported,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            NoFactors => "no_factors",
            DuplicateFactor => "duplicate_factor",
            EmptyValues => "empty_values",
            ArityMismatch => "arity_mismatch",
            UnknownFactor => "unknown_factor",
            IncompleteDesign => "incomplete_design",
            MissingCombination => "missing_combination",
            UnsupportedShape => "unsupported_shape",
            TooFewCombinations => "too_few_combinations",
            MixedShapes => "mixed_shapes",
            MismatchedShapes => "mismatched_shapes",
            MismatchedDimensions => "mismatched_dimensions",
            DimensionConflict => "dimension_conflict",
            NoData => "no_data",
            BadTemplate => "bad_template",
            MissingCaseDirectory => "missing_case_directory",
            Io => "io",
            YamlDecode => "yaml_decode",
            YamlEncode => "yaml_encode",
            JsonDecode => "json_decode",
            JsonEncode => "json_encode",
            NotSerializable => "not_serializable",
            Unsupported => "unsupported",
        };

        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Design,
    Assembly,
    Io,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Design => "DesignError",
            ErrorKind::Assembly => "AssemblyError",
            ErrorKind::Io => "IoError",
            ErrorKind::Config => "ConfigError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, ErrorCode::Io, Some(err.to_string()))
    }
}

pub type Result<T> = result::Result<T, Error>;

#[macro_export]
macro_rules! design_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Design, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Design, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! assembly_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Assembly, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Assembly, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! io_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Io, ErrorCode::$code, Some($str)))
    }};
}

#[macro_export]
macro_rules! config_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Config, ErrorCode::$code, Some($str)))
    }};
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Design,
        ErrorCode::DuplicateFactor,
        Some("emis".to_owned()),
    );
    assert_eq!("DesignError{duplicate_factor: emis}", format!("{err}"));

    let err = Error::new(ErrorKind::Assembly, ErrorCode::TooFewCombinations, None);
    assert_eq!("AssemblyError{too_few_combinations}", format!("{err}"));
}

#[test]
fn test_error_macros() {
    let r: Result<()> = assembly_err!(MissingCombination, "policy, no_sun".to_owned());
    let err = r.unwrap_err();
    assert_eq!(ErrorKind::Assembly, err.kind);
    assert_eq!(ErrorCode::MissingCombination, err.code);
    assert_eq!(Some("policy, no_sun".to_owned()), err.get_details());

    let r: Result<()> = design_err!(NoFactors);
    assert_eq!(None, r.unwrap_err().details);
}
