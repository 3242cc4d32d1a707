//! Synthetic Exodus II files for the integration tests
//!
//! `HexMesh` builds a structured block of `HEX8` elements with nodal and
//! element variables defined by closures and writes it through the netCDF
//! library in any of the formats Exodus files are stored in. `read_mat` reads
//! the MAT files the crate writes back with the `matfile` crate.

#![allow(dead_code)]

use std::path::Path;

use exodus_resample::mat::{MatArray, MatData, MatFile};
use netcdf::types::NcVariableType;

/// width of the name variables, `len_name` in Exodus files
pub const LEN_NAME: usize = 33;

/// on-disk layout of a written mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Format {
    /// CDF-1
    Classic,
    /// CDF-2
    Offset64,
    /// HDF5 based
    Netcdf4,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Classic, Format::Offset64, Format::Netcdf4];

    fn options(self) -> netcdf::Options {
        match self {
            Self::Classic => netcdf::Options::empty(),
            Self::Offset64 => netcdf::Options::_64BIT_OFFSET,
            Self::Netcdf4 => netcdf::Options::NETCDF4,
        }
    }
}

/// fixed width, nul padded rows of a character variable
pub fn char_rows(names: &[&str], width: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(names.len() * width);
    for name in names {
        let mut row = name.as_bytes().to_vec();
        row.resize(width, 0);
        out.extend(row);
    }
    out
}

type Variable = (String, Box<dyn Fn([f64; 3], f64) -> f64>);

/// A structured block of `HEX8` elements with time dependent nodal variables
pub struct HexMesh {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub zs: Vec<f64>,
    pub times: Vec<f64>,
    pub nodal: Vec<Variable>,
    /// element variables, one value per element and timestep from the element centroid
    pub element: Vec<Variable>,
}

impl HexMesh {
    pub fn new(xs: Vec<f64>, ys: Vec<f64>, zs: Vec<f64>, times: Vec<f64>) -> Self {
        Self {
            xs,
            ys,
            zs,
            times,
            nodal: Vec::new(),
            element: Vec::new(),
        }
    }

    pub fn nodal(mut self, name: &str, f: impl Fn([f64; 3], f64) -> f64 + 'static) -> Self {
        self.nodal.push((name.to_string(), Box::new(f)));
        self
    }

    pub fn element(mut self, name: &str, f: impl Fn([f64; 3], f64) -> f64 + 'static) -> Self {
        self.element.push((name.to_string(), Box::new(f)));
        self
    }

    /// node coordinates, x fastest
    pub fn points(&self) -> Vec<[f64; 3]> {
        let mut points = Vec::new();
        for z in &self.zs {
            for y in &self.ys {
                for x in &self.xs {
                    points.push([*x, *y, *z]);
                }
            }
        }
        points
    }

    fn node(&self, i: usize, j: usize, k: usize) -> i32 {
        (i + self.xs.len() * (j + self.ys.len() * k)) as i32 + 1
    }

    /// 1 based connectivity and centroid of every element
    pub fn elements(&self) -> (Vec<i32>, Vec<[f64; 3]>) {
        let mut connectivity = Vec::new();
        let mut centroids = Vec::new();

        for k in 0..self.zs.len() - 1 {
            for j in 0..self.ys.len() - 1 {
                for i in 0..self.xs.len() - 1 {
                    connectivity.extend([
                        self.node(i, j, k),
                        self.node(i + 1, j, k),
                        self.node(i + 1, j + 1, k),
                        self.node(i, j + 1, k),
                        self.node(i, j, k + 1),
                        self.node(i + 1, j, k + 1),
                        self.node(i + 1, j + 1, k + 1),
                        self.node(i, j + 1, k + 1),
                    ]);
                    centroids.push([
                        (self.xs[i] + self.xs[i + 1]) / 2.,
                        (self.ys[j] + self.ys[j + 1]) / 2.,
                        (self.zs[k] + self.zs[k + 1]) / 2.,
                    ]);
                }
            }
        }

        (connectivity, centroids)
    }

    /// write a classic (CDF-1) file, the format most Exodus writers default to
    pub fn write(&self, path: &Path) {
        self.write_as(path, Format::Classic);
    }

    pub fn write_as(&self, path: &Path, format: Format) {
        let points = self.points();
        let (connectivity, centroids) = self.elements();

        let mut file = netcdf::create_with(path, format.options()).unwrap();

        // classic files need every definition in place before data is written
        file.add_unlimited_dimension("time_step").unwrap();
        file.add_dimension("len_name", LEN_NAME).unwrap();
        file.add_dimension("num_dim", 3).unwrap();
        file.add_dimension("num_nodes", points.len()).unwrap();
        file.add_dimension("num_elem", centroids.len()).unwrap();
        file.add_dimension("num_el_blk", 1).unwrap();
        file.add_dimension("num_el_in_blk1", centroids.len()).unwrap();
        file.add_dimension("num_nod_per_el1", 8).unwrap();

        file.add_variable::<f64>("time_whole", &["time_step"]).unwrap();
        for name in ["coordx", "coordy", "coordz"] {
            file.add_variable::<f64>(name, &["num_nodes"]).unwrap();
        }

        file.add_variable::<i32>("connect1", &["num_el_in_blk1", "num_nod_per_el1"])
            .unwrap()
            .put_attribute("elem_type", "HEX8")
            .unwrap();

        if !self.nodal.is_empty() {
            file.add_dimension("num_nod_var", self.nodal.len()).unwrap();
            file.add_variable_with_type("name_nod_var", &["num_nod_var", "len_name"], &NcVariableType::Char)
                .unwrap();
            for index in 1..=self.nodal.len() {
                file.add_variable::<f64>(&format!("vals_nod_var{}", index), &["time_step", "num_nodes"])
                    .unwrap();
            }
        }

        if !self.element.is_empty() {
            file.add_dimension("num_elem_var", self.element.len()).unwrap();
            file.add_variable_with_type("name_elem_var", &["num_elem_var", "len_name"], &NcVariableType::Char)
                .unwrap();
            for index in 1..=self.element.len() {
                file.add_variable::<f64>(
                    &format!("vals_elem_var{}eb1", index),
                    &["time_step", "num_el_in_blk1"],
                )
                .unwrap();
            }
        }

        for (step, t) in self.times.iter().enumerate() {
            file.variable_mut("time_whole").unwrap().put_value(*t, step).unwrap();
        }

        for (axis, name) in ["coordx", "coordy", "coordz"].iter().enumerate() {
            let values: Vec<f64> = points.iter().map(|p| p[axis]).collect();
            file.variable_mut(name).unwrap().put_values(&values, ..).unwrap();
        }

        file.variable_mut("connect1")
            .unwrap()
            .put_values(&connectivity, ..)
            .unwrap();

        if !self.nodal.is_empty() {
            let names: Vec<&str> = self.nodal.iter().map(|(name, _)| name.as_str()).collect();
            file.variable_mut("name_nod_var")
                .unwrap()
                .put_raw_values(&char_rows(&names, LEN_NAME), ..)
                .unwrap();

            for (index, (_, f)) in self.nodal.iter().enumerate() {
                let mut var = file.variable_mut(&format!("vals_nod_var{}", index + 1)).unwrap();
                for (step, t) in self.times.iter().enumerate() {
                    let values: Vec<f64> = points.iter().map(|p| f(*p, *t)).collect();
                    var.put_values(&values, (step, ..)).unwrap();
                }
            }
        }

        if !self.element.is_empty() {
            let names: Vec<&str> = self.element.iter().map(|(name, _)| name.as_str()).collect();
            file.variable_mut("name_elem_var")
                .unwrap()
                .put_raw_values(&char_rows(&names, LEN_NAME), ..)
                .unwrap();

            for (index, (_, f)) in self.element.iter().enumerate() {
                let mut var = file.variable_mut(&format!("vals_elem_var{}eb1", index + 1)).unwrap();
                for (step, t) in self.times.iter().enumerate() {
                    let values: Vec<f64> = centroids.iter().map(|c| f(*c, *t)).collect();
                    var.put_values(&values, (step, ..)).unwrap();
                }
            }
        }
    }
}

/// Read a MAT file with the `matfile` crate. Double arrays stay double and
/// `uint8` arrays are taken as logical masks.
pub fn read_mat(path: &Path) -> MatFile {
    let file = std::fs::File::open(path).unwrap();
    let parsed = matfile::MatFile::parse(file).unwrap();

    let mut mat = MatFile::new();
    for array in parsed.arrays() {
        let data = match array.data() {
            matfile::NumericData::Double { real, .. } => MatData::Double(real.clone()),
            matfile::NumericData::UInt8 { real, .. } => {
                MatData::Logical(real.iter().map(|v| *v != 0).collect())
            }
            _ => panic!("`{}` is neither double nor logical", array.name()),
        };

        let dims = array.size().to_vec();
        mat.insert(array.name(), MatArray { dims, data }).unwrap();
    }
    mat
}
