use std::fmt;

use crate::grid::UniformGrid;

/// Describes the area of the computational
/// domain that a grid file covers, in (1 based) point indices.
///
/// Most often you want to use the [`Spans3D::new`] constructor
/// since every grid file written here describes a whole domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spans3D {
    pub x_start: usize,
    pub x_end: usize,
    pub y_start: usize,
    pub y_end: usize,
    pub z_start: usize,
    pub z_end: usize,
}

impl Spans3D {
    /// create a simple span geometry from some known point lengths
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            x_start: 1,
            x_end: nx,
            y_start: 1,
            y_end: ny,
            z_start: 1,
            z_end: nz,
        }
    }

    /// parse the `"x_start x_end y_start y_end z_start z_end"` form
    /// found in `WholeExtent` and `Extent` attributes
    ///
    /// # Example
    /// ```
    /// let spans = exodus_resample::vtr::Spans3D::from_span_string("1 10 1 20 1 1").unwrap();
    /// assert_eq!(spans.x_len(), 10);
    /// ```
    pub fn from_span_string(span_string: &str) -> Option<Self> {
        let mut split = span_string.split_ascii_whitespace().map(str::parse::<usize>);
        let mut next = || split.next().and_then(Result::ok);

        let spans = Spans3D {
            x_start: next()?,
            x_end: next()?,
            y_start: next()?,
            y_end: next()?,
            z_start: next()?,
            z_end: next()?,
        };

        if next().is_some() {
            return None;
        }

        Some(spans)
    }

    pub fn x_len(&self) -> usize {
        (self.x_end + 1).saturating_sub(self.x_start)
    }

    pub fn y_len(&self) -> usize {
        (self.y_end + 1).saturating_sub(self.y_start)
    }

    pub fn z_len(&self) -> usize {
        (self.z_end + 1).saturating_sub(self.z_start)
    }

    /// total number of points in the span
    pub fn num_points(&self) -> usize {
        self.x_len() * self.y_len() * self.z_len()
    }
}

impl fmt::Display for Spans3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.x_start, self.x_end, self.y_start, self.y_end, self.z_start, self.z_end
        )
    }
}

/// Point locations of a 3D rectilinear grid along each axis
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh3D {
    pub x_locations: Vec<f64>,
    pub y_locations: Vec<f64>,
    pub z_locations: Vec<f64>,
}

impl Mesh3D {
    pub fn new(x_locations: Vec<f64>, y_locations: Vec<f64>, z_locations: Vec<f64>) -> Self {
        Self {
            x_locations,
            y_locations,
            z_locations,
        }
    }

    /// spans covering every point of the mesh
    pub fn spans(&self) -> Spans3D {
        Spans3D::new(
            self.x_locations.len(),
            self.y_locations.len(),
            self.z_locations.len(),
        )
    }
}

impl From<&UniformGrid> for Mesh3D {
    fn from(grid: &UniformGrid) -> Self {
        Self::new(
            grid.x.coordinates().to_vec(),
            grid.y.coordinates().to_vec(),
            grid.z.coordinates().to_vec(),
        )
    }
}
