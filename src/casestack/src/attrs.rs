// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::dataset::Dataset;
use crate::value::Attrs;

fn copy_attrs(src: &Attrs, dst: &mut Attrs) {
    for (key, value) in src.iter() {
        dst.insert(key.clone(), value.clone());
    }
}

/// Copy descriptive metadata from `source` onto `dest` in place.
///
/// Attributes of every variable and coordinate present in both datasets,
/// and the dataset-level attributes, are copied over, replacing any
/// attribute with the same key.  Anything only present in `source` is
/// skipped.
pub fn propagate<'a>(source: &Dataset, dest: &'a mut Dataset) -> &'a mut Dataset {
    for name in source.variable_names() {
        if let (Some(src), Some(dst)) = (source.variable(name), dest.variable_mut(name)) {
            copy_attrs(&src.attrs, &mut dst.attrs);
        }
    }

    let dest_coords = dest.coords_mut();
    for (name, coord) in source.coords().iter() {
        if let Some(dst) = dest_coords.get_mut(name) {
            copy_attrs(&coord.attrs, &mut dst.attrs);
        }
    }

    copy_attrs(source.global_attrs(), dest.global_attrs_mut());

    dest
}
