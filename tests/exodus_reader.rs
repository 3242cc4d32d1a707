mod common;

use approx::assert_abs_diff_eq;
use common::{Format, HexMesh};

use exodus_resample::prelude::*;
use exodus_resample::exodus::ExodusError;
use exodus_resample::Association;

fn linear(p: [f64; 3], t: f64) -> f64 {
    1. + 10. * p[0] + 100. * p[2] + 1000. * t
}

fn mesh() -> HexMesh {
    HexMesh::new(
        vec![0., 1., 2.],
        vec![0., 0.5],
        vec![0., 1., 2., 3.],
        vec![0., 0.5, 1.5],
    )
    .nodal("disp_x", |p, _| p[0])
    .nodal("disp_y", |p, _| p[1])
    .nodal("disp_z", linear)
    .element("stress", |c, t| c[2] + t)
}

#[test]
fn reads_the_mesh_description() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("box.e");
    mesh().write(&path);

    let file = ExodusFile::open(&path).unwrap();

    assert_eq!(file.node_count(), 3 * 2 * 4);
    assert_eq!(file.element_count(), 2 * 1 * 3);
    assert_eq!(file.times(), &[0., 0.5, 1.5]);

    let bounds = file.bounds();
    assert_eq!(bounds.min, [0., 0., 0.]);
    assert_eq!(bounds.max, [2., 0.5, 3.]);

    let disp = file.field("disp").unwrap();
    assert_eq!(disp.components, 3);
    assert_eq!(disp.association, Association::Point);

    let stress = file.field("stress").unwrap();
    assert_eq!(stress.association, Association::Cell);

    let names = file.field_names();
    for name in ["disp_x", "disp_y", "disp_z", "disp", "stress"] {
        assert!(names.iter().any(|n| n == name), "{} missing from {:?}", name, names);
    }
}

#[test]
fn missing_file_is_reported() {
    let err = ExodusFile::open(std::path::Path::new("/nonexistent/run.e")).err().unwrap();
    assert!(matches!(err, Error::InputNotFound(_)));
}

#[test]
fn nodal_fields_interpolate_linear_data_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("box.e");
    mesh().write(&path);

    let mut file = ExodusFile::open(&path).unwrap();

    // points between the nodes, plus one outside the mesh along x
    let grid = UniformGrid::new(
        AxisSample::new(0.25, 2.5, 4),
        AxisSample::single(0.25),
        AxisSample::new(0.5, 2.5, 3),
    );

    let sampled = file.resample("disp_z", 0.5, &grid).unwrap();
    assert_eq!(sampled.components(), 1);

    for (i, x) in grid.x.coordinates().iter().enumerate() {
        for (k, z) in grid.z.coordinates().iter().enumerate() {
            let inside = *x <= 2.;
            assert_eq!(sampled.mask()[[i, 0, k]], inside);

            let expected = if inside { linear([*x, 0.25, *z], 0.5) } else { 0. };
            assert_abs_diff_eq!(sampled.values()[[i, 0, k, 0]], expected, epsilon = 1e-9);
        }
    }
}

#[test]
fn vector_fields_and_cell_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("box.e");
    mesh().write(&path);

    let mut file = ExodusFile::open(&path).unwrap();
    let grid = UniformGrid::new(
        AxisSample::single(0.5),
        AxisSample::single(0.25),
        AxisSample::new(0.5, 2.5, 3),
    );

    let disp = file.resample("disp", 1.5, &grid).unwrap();
    assert_eq!(disp.components(), 3);
    assert_abs_diff_eq!(disp.values()[[0, 0, 2, 0]], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(disp.values()[[0, 0, 2, 1]], 0.25, epsilon = 1e-12);
    assert_abs_diff_eq!(disp.values()[[0, 0, 2, 2]], linear([0.5, 0.25, 2.5], 1.5), epsilon = 1e-9);

    // piecewise constant, the element centroids sit at z = 0.5, 1.5, 2.5
    let stress = file.resample("stress", 1.5, &grid).unwrap();
    for (k, z) in [0.5, 1.5, 2.5].iter().enumerate() {
        assert_abs_diff_eq!(stress.values()[[0, 0, k, 0]], z + 1.5, epsilon = 1e-12);
    }
}

#[test]
fn unknown_field_lists_the_alternatives() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("box.e");
    mesh().write(&path);

    let mut file = ExodusFile::open(&path).unwrap();
    let grid = UniformGrid::new(
        AxisSample::single(0.5),
        AxisSample::single(0.25),
        AxisSample::single(0.5),
    );

    match file.resample("vel", 0., &grid) {
        Err(Error::FieldNotFound { field, available, .. }) => {
            assert_eq!(field, "vel");
            assert!(available.contains(&"disp_z".to_string()));
        }
        other => panic!("expected a missing field, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn times_without_loading_the_mesh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("box.e");
    mesh().write(&path);

    let summary = exodus_resample::pipeline::exodus_times(&path).unwrap();
    assert_eq!(summary.times, vec![0., 0.5, 1.5]);
    assert_eq!(
        summary.to_string(),
        "Number of timesteps: 3\nFirst time: 0\nFinal time: 1.5"
    );
}

#[test]
fn every_netcdf_format_reads_the_same() {
    let dir = tempfile::tempdir().unwrap();
    let grid = UniformGrid::new(
        AxisSample::new(0.25, 1.75, 3),
        AxisSample::single(0.25),
        AxisSample::new(0.5, 2.5, 3),
    );

    for format in Format::ALL {
        let path = dir.path().join(format!("{:?}.e", format));
        mesh().write_as(&path, format);

        let mut file = ExodusFile::open(&path).unwrap();
        assert_eq!(file.node_count(), 24, "{:?}", format);
        assert_eq!(file.times(), &[0., 0.5, 1.5], "{:?}", format);
        assert_eq!(file.field("disp").unwrap().components, 3, "{:?}", format);

        let sampled = file.resample("disp_z", 1.5, &grid).unwrap();
        assert!(sampled.mask().iter().all(|inside| *inside));
        for (i, x) in grid.x.coordinates().iter().enumerate() {
            for (k, z) in grid.z.coordinates().iter().enumerate() {
                assert_abs_diff_eq!(
                    sampled.values()[[i, 0, k, 0]],
                    linear([*x, 0.25, *z], 1.5),
                    epsilon = 1e-9
                );
            }
        }

        let stress = file.resample("stress", 0.5, &grid).unwrap();
        assert_abs_diff_eq!(stress.values()[[0, 0, 2, 0]], 3., epsilon = 1e-12);

        let summary = exodus_resample::pipeline::exodus_times(&path).unwrap();
        assert_eq!(summary.times, vec![0., 0.5, 1.5]);
    }
}

#[test]
fn files_that_are_not_netcdf_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.e");
    std::fs::write(&path, b"this is not a netcdf file").unwrap();

    let err = ExodusFile::open(&path).err().unwrap();
    assert!(matches!(err, Error::Exodus(ExodusError::Netcdf(_))), "{:?}", err);
}
