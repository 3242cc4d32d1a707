//! Exodus II meshes and their nodal / element variables
//!
//! Exodus II is a set of conventions on top of NetCDF (classic, 64-bit offset
//! or netCDF-4), read through the netCDF library. The pieces read
//! here are:
//!
//! * node coordinates: `coordx`, `coordy`, `coordz` or the combined `coord`
//! * element blocks: `connect<i>` with an `elem_type` attribute, 1 based node ids
//! * nodal variables: names in `name_nod_var`, values in `vals_nod_var<j>` or the
//!   combined `vals_nod_var(time_step, num_nod_var, num_nodes)`
//! * element variables: names in `name_elem_var`, values in
//!   `vals_elem_var<j>eb<i>`, with the optional truth table `elem_var_tab`
//! * the timestep values in `time_whole`
//!
//! Variables that only differ by an `_x`, `_y`, `_z` suffix are additionally
//! offered as one vector field with three components (`disp` for `disp_x`,
//! `disp_y` and `disp_z`).

use std::path::{Path, PathBuf};

use netcdf::AttributeValue;

use crate::grid::{Bounds, FieldGrid, UniformGrid};
use crate::locate::{Cell, CellLocator, ElementKind, Stencil};
use crate::traits::{Association, DataSource, FieldInfo};
use crate::Error;

const VECTOR_SUFFIXES: [[&str; 3]; 2] = [["_x", "_y", "_z"], ["_X", "_Y", "_Z"]];

#[derive(Debug, thiserror::Error)]
pub enum ExodusError {
    #[error("could not read the underlying netcdf file: {0}")]
    Netcdf(#[from] netcdf::Error),
    #[error("variable `{0}` does not exist in the file")]
    MissingVariable(String),
    #[error("the file has no node coordinates (`coordx` or `coord`)")]
    MissingCoordinates,
    #[error("coordinate arrays have inconsistent lengths")]
    InconsistentCoordinates,
    #[error("connectivity of element block {block} references node {node}, but the mesh has {nodes} nodes")]
    BadConnectivity { block: usize, node: i64, nodes: usize },
    #[error("`{name}` holds {found} values per timestep, expected {expected}")]
    WrongLength {
        name: String,
        found: usize,
        expected: usize,
    },
}

/// where the values of one component of a field are stored
#[derive(Debug, Clone, Copy, PartialEq)]
enum Component {
    /// zero based index into `name_nod_var`
    Nodal(usize),
    /// zero based index into `name_elem_var`
    Element(usize),
}

#[derive(Debug, Clone)]
struct Field {
    info: FieldInfo,
    components: Vec<Component>,
}

#[derive(Debug, Clone)]
struct Block {
    /// 1 based block number used in variable names
    number: usize,
    /// global index of the first element of the block
    first_element: usize,
    len: usize,
    nodes_per_element: usize,
    elem_type: String,
}

/// An opened Exodus II file
pub struct ExodusFile {
    path: PathBuf,
    file: netcdf::File,
    points: Vec<[f64; 3]>,
    bounds: Bounds,
    blocks: Vec<Block>,
    times: Vec<f64>,
    fields: Vec<FieldInfo>,
    sources: Vec<Field>,
    element_count: usize,
    /// `elem_var_tab`, one row per block
    truth_table: Option<Vec<i64>>,
    locator: Option<CellLocator>,
    stencil: Option<Stencil>,
}

impl ExodusFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn node_count(&self) -> usize {
        self.points.len()
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// parse the mesh description and variable names of an Exodus file
    pub fn read(path: &Path) -> Result<Self, ExodusError> {
        let file = netcdf::open(path)?;

        let points = read_coordinates(&file)?;
        let bounds = Bounds::from_points(points.iter());

        let mut blocks = Vec::new();
        let mut first_element = 0;
        let block_count = dimension_len(&file, "num_el_blk");

        for number in 1..=block_count {
            let len = dimension_len(&file, &format!("num_el_in_blk{}", number));
            let connect = file.variable(&format!("connect{}", number));

            let nodes_per_element = connect
                .as_ref()
                .and_then(|var| var.dimensions().get(1).map(|dim| dim.len()))
                .unwrap_or(0);

            let elem_type = connect
                .as_ref()
                .and_then(|var| var.attribute("elem_type"))
                .and_then(|att| att.value().ok())
                .and_then(|value| match value {
                    AttributeValue::Str(text) => Some(text),
                    _ => None,
                })
                .unwrap_or_default();

            blocks.push(Block {
                number,
                first_element,
                len,
                nodes_per_element,
                elem_type,
            });
            first_element += len;
        }

        let times = read_times(&file)?;

        let nodal_names = read_names(&file, "name_nod_var")?;
        let element_names = read_names(&file, "name_elem_var")?;
        let sources = collect_fields(&nodal_names, &element_names);

        let truth_table = match file.variable("elem_var_tab") {
            Some(var) => Some(var.get_values::<i64, _>(..)?),
            None => None,
        };

        log::debug!(
            "{}: {} nodes, {} element blocks, {} timesteps, {} nodal and {} element variables",
            path.display(),
            points.len(),
            blocks.len(),
            times.len(),
            nodal_names.len(),
            element_names.len()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            points,
            bounds,
            blocks,
            times,
            fields: sources.iter().map(|field| field.info.clone()).collect(),
            sources,
            element_count: first_element,
            truth_table,
            locator: None,
            stencil: None,
        })
    }

    /// The values of `time_whole`, without reading the mesh. A file without
    /// timesteps gives an empty list.
    pub fn read_times(path: &Path) -> Result<Vec<f64>, ExodusError> {
        let file = netcdf::open(path)?;
        let times = read_times(&file)?;

        if file.variable("time_whole").is_none() {
            log::warn!("{} has no `time_whole` variable", path.display());
        }

        Ok(times)
    }

    /// the cells of every block with a supported element type
    fn read_cells(&self) -> Result<Vec<Cell>, ExodusError> {
        let mut cells = Vec::new();

        for block in &self.blocks {
            if block.len == 0 {
                continue;
            }

            let kind = match ElementKind::from_exodus_name(&block.elem_type, block.nodes_per_element) {
                Some(kind) => kind,
                None => {
                    log::warn!(
                        "element block {} has unsupported element type `{}` and is skipped when sampling",
                        block.number,
                        block.elem_type
                    );
                    continue;
                }
            };

            let name = format!("connect{}", block.number);
            let connectivity = require_variable(&self.file, &name)?.get_values::<i64, _>(..)?;
            let corners = kind.corner_count();

            for (local, element) in connectivity.chunks(block.nodes_per_element).enumerate() {
                let mut nodes = Vec::with_capacity(corners);

                for id in &element[..corners] {
                    if *id < 1 || *id as usize > self.points.len() {
                        return Err(ExodusError::BadConnectivity {
                            block: block.number,
                            node: *id,
                            nodes: self.points.len(),
                        });
                    }
                    nodes.push(*id as usize - 1);
                }

                cells.push(Cell {
                    kind,
                    nodes,
                    element: block.first_element + local,
                });
            }
        }

        Ok(cells)
    }

    fn locator(&mut self) -> Result<&CellLocator, ExodusError> {
        let locator = match self.locator.take() {
            Some(locator) => locator,
            None => CellLocator::new(self.points.clone(), self.read_cells()?),
        };

        Ok(self.locator.insert(locator))
    }

    /// index of `time` in the file, the nearest timestep if there is no exact match
    fn time_index(&self, time: f64) -> Option<usize> {
        if let Some(index) = self.times.iter().position(|t| *t == time) {
            return Some(index);
        }

        let mut nearest: Option<usize> = None;
        for (index, t) in self.times.iter().enumerate() {
            match nearest {
                Some(best) if (t - time).abs() >= (self.times[best] - time).abs() => {}
                _ => nearest = Some(index),
            }
        }
        nearest
    }

    /// values of a nodal variable at one timestep
    pub fn nodal_values(&self, variable: usize, step: usize) -> Result<Vec<f64>, ExodusError> {
        let nodes = self.points.len();
        let name = format!("vals_nod_var{}", variable + 1);

        let values = match self.file.variable(&name) {
            Some(var) => var.get_values::<f64, _>((step, ..))?,
            // older files keep every nodal variable in one array
            None => require_variable(&self.file, "vals_nod_var")?.get_values::<f64, _>((step, variable, ..))?,
        };

        if values.len() != nodes {
            return Err(ExodusError::WrongLength {
                name,
                found: values.len(),
                expected: nodes,
            });
        }

        Ok(values)
    }

    /// Values of an element variable at one timestep, one entry per element.
    /// Blocks that do not store the variable give `None`.
    pub fn element_values(&self, variable: usize, step: usize) -> Result<Vec<Option<f64>>, ExodusError> {
        let mut values = vec![None; self.element_count];
        let width = dimension_len(&self.file, "num_elem_var");

        for (block_index, block) in self.blocks.iter().enumerate() {
            if let Some(table) = &self.truth_table {
                if table.get(block_index * width + variable) == Some(&0) {
                    continue;
                }
            }

            let name = format!("vals_elem_var{}eb{}", variable + 1, block.number);
            let var = match self.file.variable(&name) {
                Some(var) => var,
                None => continue,
            };

            let block_values = var.get_values::<f64, _>((step, ..))?;
            if block_values.len() != block.len {
                return Err(ExodusError::WrongLength {
                    name,
                    found: block_values.len(),
                    expected: block.len,
                });
            }

            for (slot, value) in values[block.first_element..block.first_element + block.len]
                .iter_mut()
                .zip(block_values)
            {
                *slot = Some(value);
            }
        }

        Ok(values)
    }

    /// sample a field, locating the grid points first unless the previous call used the same grid
    fn sample(
        &mut self,
        field: &Field,
        step: usize,
        grid: &UniformGrid,
    ) -> Result<FieldGrid, ExodusError> {
        let stencil = match self.stencil.take() {
            Some(stencil) if stencil.grid() == grid => stencil,
            _ => self.locator()?.stencil(grid),
        };

        let sampled = self.sample_located(&stencil, field, step);
        self.stencil = Some(stencil);
        sampled
    }

    fn sample_located(&self, stencil: &Stencil, field: &Field, step: usize) -> Result<FieldGrid, ExodusError> {
        let grid = stencil.grid();
        let points = grid.len();
        let count = field.components.len();

        let mut values = vec![0.; points * count];
        let mut mask = stencil.mask();

        for (c, component) in field.components.iter().enumerate() {
            let sampled = match component {
                Component::Nodal(variable) => {
                    let nodal = self.nodal_values(*variable, step)?;
                    stencil.sample_nodal(&nodal)
                }
                Component::Element(variable) => {
                    let cells = self.element_values(*variable, step)?;
                    let (sampled, inside) = stencil.sample_cells(&cells);
                    for (m, inside) in mask.iter_mut().zip(inside) {
                        *m &= inside;
                    }
                    sampled
                }
            };

            for (p, value) in sampled.into_iter().enumerate() {
                values[p * count + c] = value;
            }
        }

        FieldGrid::from_point_values(grid, count, values, mask).map_err(|_| ExodusError::WrongLength {
            name: field.info.name.clone(),
            found: points * count,
            expected: grid.len() * count,
        })
    }
}

impl DataSource for ExodusFile {
    fn open(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Err(Error::InputNotFound(path.to_path_buf()));
        }

        Ok(Self::read(path)?)
    }

    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    fn times(&self) -> &[f64] {
        &self.times
    }

    fn resample(&mut self, field: &str, time: f64, grid: &UniformGrid) -> Result<FieldGrid, Error> {
        let not_found = |available: Vec<String>| Error::FieldNotFound {
            field: field.to_string(),
            time,
            available,
        };

        let source = match self.sources.iter().find(|source| source.info.name == field) {
            Some(source) => source.clone(),
            None => return Err(not_found(self.field_names())),
        };

        let step = match self.time_index(time) {
            Some(step) => step,
            None => return Err(not_found(self.field_names())),
        };

        match self.sample(&source, step, grid) {
            Ok(grid) => Ok(grid),
            // a variable listed in the header without stored values
            Err(ExodusError::MissingVariable(_)) => Err(not_found(self.field_names())),
            Err(other) => Err(other.into()),
        }
    }
}

fn require_variable<'f>(file: &'f netcdf::File, name: &str) -> Result<netcdf::Variable<'f>, ExodusError> {
    file.variable(name)
        .ok_or_else(|| ExodusError::MissingVariable(name.to_string()))
}

/// length of a dimension, zero when the file does not define it
fn dimension_len(file: &netcdf::File, name: &str) -> usize {
    file.dimension(name).map(|dim| dim.len()).unwrap_or(0)
}

fn read_times(file: &netcdf::File) -> Result<Vec<f64>, ExodusError> {
    match file.variable("time_whole") {
        Some(var) => Ok(var.get_values::<f64, _>(..)?),
        None => Ok(Vec::new()),
    }
}

fn read_coordinates(file: &netcdf::File) -> Result<Vec<[f64; 3]>, ExodusError> {
    let mut axes: Vec<Vec<f64>> = Vec::new();

    if file.variable("coordx").is_some() {
        for name in ["coordx", "coordy", "coordz"] {
            if let Some(var) = file.variable(name) {
                axes.push(var.get_values::<f64, _>(..)?);
            }
        }
    } else if let Some(var) = file.variable("coord") {
        let dims = dimension_len(file, "num_dim").max(1);
        let all = var.get_values::<f64, _>(..)?;
        let nodes = all.len() / dims;
        axes.extend(all.chunks(nodes.max(1)).map(<[f64]>::to_vec));
    } else {
        return Err(ExodusError::MissingCoordinates);
    }

    let nodes = axes.first().map(Vec::len).unwrap_or(0);
    if axes.iter().any(|axis| axis.len() != nodes) {
        return Err(ExodusError::InconsistentCoordinates);
    }

    Ok((0..nodes)
        .map(|node| {
            let mut point = [0.; 3];
            for (axis, values) in axes.iter().enumerate().take(3) {
                point[axis] = values[node];
            }
            point
        })
        .collect())
}

/// one string per row of a `(count, len_name)` character variable
fn read_names(file: &netcdf::File, name: &str) -> Result<Vec<String>, ExodusError> {
    let var = match file.variable(name) {
        Some(var) => var,
        None => return Ok(Vec::new()),
    };

    let width = var.dimensions().last().map(|dim| dim.len()).unwrap_or(1).max(1);
    let bytes = var.get_raw_values(..)?;

    Ok(bytes.chunks(width).map(trim_name).collect())
}

/// text up to the first nul, without surrounding whitespace
fn trim_name(row: &[u8]) -> String {
    let end = row.iter().position(|b| *b == 0).unwrap_or(row.len());
    String::from_utf8_lossy(&row[..end]).trim().to_string()
}

/// scalar fields for every variable, followed by the grouped vector fields
fn collect_fields(nodal: &[String], element: &[String]) -> Vec<Field> {
    let mut fields = Vec::new();

    for (names, association) in [(nodal, Association::Point), (element, Association::Cell)] {
        let component = |index: usize| match association {
            Association::Point => Component::Nodal(index),
            Association::Cell => Component::Element(index),
        };

        for (index, name) in names.iter().enumerate() {
            fields.push(Field {
                info: FieldInfo {
                    name: name.clone(),
                    components: 1,
                    association,
                },
                components: vec![component(index)],
            });
        }

        for (base, indices) in vector_groups(names) {
            if fields.iter().any(|field| field.info.name == base) {
                continue;
            }

            fields.push(Field {
                info: FieldInfo {
                    name: base,
                    components: indices.len(),
                    association,
                },
                components: indices.into_iter().map(component).collect(),
            });
        }
    }

    fields
}

/// Variables named `<base>_x`, `<base>_y` (and optionally `<base>_z`), in order
/// of first appearance
fn vector_groups(names: &[String]) -> Vec<(String, Vec<usize>)> {
    let mut groups = Vec::new();

    for (index, name) in names.iter().enumerate() {
        for suffixes in VECTOR_SUFFIXES {
            let base = match name.strip_suffix(suffixes[0]) {
                Some(base) if !base.is_empty() => base,
                _ => continue,
            };

            let find = |suffix: &str| names.iter().position(|n| *n == format!("{}{}", base, suffix));

            if let Some(y) = find(suffixes[1]) {
                let mut indices = vec![index, y];
                if let Some(z) = find(suffixes[2]) {
                    indices.push(z);
                }
                groups.push((base.to_string(), indices));
            }
        }
    }

    groups
}
