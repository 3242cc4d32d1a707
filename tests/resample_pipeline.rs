mod common;

use approx::assert_abs_diff_eq;
use common::HexMesh;

use exodus_resample::pipeline;
use exodus_resample::prelude::*;

fn disp_z(p: [f64; 3], t: f64) -> f64 {
    2. + 50. * p[0] - 30. * p[2] + 400. * t
}

/// a box thin along y with three timesteps
fn example_mesh() -> HexMesh {
    HexMesh::new(
        vec![-0.02, -0.01, 0., 0.01, 0.02],
        vec![0., 0.01],
        vec![0.015, 0.025, 0.035],
        vec![0., 0.002, 0.006],
    )
    .nodal("disp_x", |p, _| p[0])
    .nodal("disp_y", |p, _| p[1])
    .nodal("disp_z", disp_z)
}

fn example_config(source: &std::path::Path) -> ResampleConfig {
    ResampleConfig {
        source_path: source.to_path_buf(),
        spatial_ranges: SpatialRanges {
            x: Some(AxisSample::new(-0.02, 0.02, 3)),
            y: None,
            z: Some(AxisSample::new(0.015, 0.035, 3)),
        },
        time_ranges_or_all: TimeRequest::Range(AxisSample::new(0., 0.006, 3)),
        ..Default::default()
    }
}

#[test]
fn three_timestep_example() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("example.e");
    example_mesh().write(&source);

    let summary = pipeline::exodus_to_mat(&example_config(&source)).unwrap();

    assert_eq!(summary.output, dir.path().join("example_disp_z.mat"));
    assert_eq!(summary.shape, (3, 3, 3));
    assert_eq!(summary.depth_axis, Axis::Z);
    // 0.003 is closer to 0.002 than to 0.006
    assert_eq!(summary.times, vec![0., 0.002, 0.006]);
    assert_eq!(summary.missing, 0);

    let mat = common::read_mat(&summary.output);

    let xs = mat.get("xs").unwrap();
    assert_eq!(xs.dims, vec![1, 3]);
    let xs = xs.as_doubles().unwrap();
    assert_abs_diff_eq!(xs[0], -0.02);
    assert_abs_diff_eq!(xs[1], 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(xs[2], 0.02);

    let zs = mat.get("zs").unwrap().as_doubles().unwrap();
    assert_abs_diff_eq!(zs[0], 0.015);
    assert_abs_diff_eq!(zs[1], 0.025, epsilon = 1e-15);
    assert_abs_diff_eq!(zs[2], 0.035);

    assert_eq!(mat.get("ts").unwrap().as_doubles(), Some(&[0., 0.002, 0.006][..]));
    assert_abs_diff_eq!(mat.get("dx").unwrap().scalar().unwrap(), 0.02, epsilon = 1e-15);
    assert_abs_diff_eq!(mat.get("dz").unwrap().scalar().unwrap(), 0.01, epsilon = 1e-15);
    assert_abs_diff_eq!(mat.get("dt").unwrap().scalar().unwrap(), 0.003, epsilon = 1e-15);

    let field = mat.get("disp_z").unwrap().to_ndarray().unwrap();
    assert_eq!(field.shape(), &[3, 3, 3]);

    let ts = [0., 0.002, 0.006];
    for (k, z) in zs.iter().enumerate() {
        for (i, x) in xs.iter().enumerate() {
            for (n, t) in ts.iter().enumerate() {
                assert_abs_diff_eq!(field[[k, i, n]], disp_z([*x, 0., *z], *t), epsilon = 1e-9);
            }
        }
    }

    let mask = mat.get("mask").unwrap().as_logical().unwrap();
    assert!(mask.iter().all(|inside| *inside));
    assert_eq!(mat.get("valid").unwrap().as_logical(), Some(&[true; 3][..]));
}

#[test]
fn unavailable_field_leaves_zero_slices() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("example.e");
    example_mesh().write(&source);

    let config = ResampleConfig {
        field_name: "temperature".to_string(),
        ..example_config(&source)
    };

    let summary = pipeline::exodus_to_mat(&config).unwrap();
    assert_eq!(summary.shape, (3, 3, 3));
    assert_eq!(summary.missing, 3);

    let mat = common::read_mat(&summary.output);
    let field = mat.get("temperature").unwrap();
    assert_eq!(field.dims, vec![3, 3, 3]);
    assert!(field.as_doubles().unwrap().iter().all(|v| *v == 0.));
    assert_eq!(mat.get("valid").unwrap().as_logical(), Some(&[false; 3][..]));
}

#[test]
fn vector_component_is_selected() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("example.e");
    example_mesh().write(&source);

    let config = ResampleConfig {
        field_name: "disp".to_string(),
        component: 0,
        compress: true,
        ..example_config(&source)
    };

    let summary = pipeline::exodus_to_mat(&config).unwrap();
    let mat = common::read_mat(&summary.output);
    let field = mat.get("disp").unwrap().to_ndarray().unwrap();

    // disp_x is the x coordinate, at every depth and time
    for k in 0..3 {
        for n in 0..3 {
            assert_abs_diff_eq!(field[[k, 0, n]], -0.02, epsilon = 1e-12);
            assert_abs_diff_eq!(field[[k, 2, n]], 0.02, epsilon = 1e-12);
        }
    }
}

#[test]
fn equal_extents_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("cube.e");
    HexMesh::new(vec![0., 1.], vec![0., 1.], vec![0., 1.], vec![0.])
        .nodal("disp_z", |p, _| p[2])
        .write(&source);

    let config = ResampleConfig {
        source_path: source.clone(),
        ..Default::default()
    };
    let err = pipeline::exodus_to_mat(&config).unwrap_err();
    assert!(matches!(err, Error::Plan(_)));
    assert!(!dir.path().join("cube_disp_z.mat").exists());

    // an explicit depth axis resolves it
    let config = ResampleConfig {
        source_path: source,
        spatial_ranges: SpatialRanges {
            x: Some(AxisSample::new(0., 1., 2)),
            y: None,
            z: Some(AxisSample::new(0., 1., 2)),
        },
        time_ranges_or_all: TimeRequest::All,
        depth_axis: Some(Axis::Z),
        ..Default::default()
    };
    let summary = pipeline::exodus_to_mat(&config).unwrap();
    assert_eq!(summary.shape, (2, 2, 1));
}

#[test]
fn missing_input() {
    let config = ResampleConfig {
        source_path: "/nonexistent/run.e".into(),
        ..Default::default()
    };

    assert!(matches!(
        pipeline::exodus_to_mat(&config),
        Err(Error::InputNotFound(_))
    ));
}

#[test]
fn grid_files_round_trip_into_one_mat_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("example.e");
    example_mesh().write(&source);

    let grid_config = GridConfig {
        source_path: source,
        field_name: "disp".to_string(),
        spacing_mode: SpacingMode::Counts { nx: 5, ny: 2, nz: 3 },
        precision: Precision::Float64,
        ..Default::default()
    };

    let grids = pipeline::exodus_to_grids(&grid_config).unwrap();
    assert_eq!(grids.files.len(), 3);
    assert!(grids.skipped.is_empty());
    assert!(grids.files[1].ends_with("resampled_t002000000.vtr"));

    let first = VtrFile::read(&grids.files[0]).unwrap();
    assert_eq!(first.dimensions(), [5, 2, 3]);
    assert_eq!(first.array("disp").unwrap().components, 3);

    let summary = pipeline::grids_to_mat(&AggregateConfig {
        source_path: grids.output_dir.clone(),
        field_name: Some("disp".to_string()),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(summary.shape, [5, 2, 3, 3, 3]);

    let mat = common::read_mat(&summary.output);
    assert_eq!(mat.get("ts").unwrap().as_doubles(), Some(&[0., 0.002, 0.006][..]));

    let values = mat.get("disp").unwrap().to_ndarray().unwrap();
    let xs = mat.get("xs").unwrap().as_doubles().unwrap().to_vec();
    let zs = mat.get("zs").unwrap().as_doubles().unwrap().to_vec();

    // (nx, ny, nz, nt, component)
    assert_abs_diff_eq!(values[[4, 1, 2, 2, 0]], xs[4], epsilon = 1e-12);
    assert_abs_diff_eq!(values[[4, 1, 2, 2, 1]], 0.01, epsilon = 1e-12);
    assert_abs_diff_eq!(
        values[[1, 0, 1, 1, 2]],
        disp_z([xs[1], 0., zs[1]], 0.002),
        epsilon = 1e-9
    );
}

/// an ascii image data file with a two component `vel` array
fn image_file(step: f64) -> String {
    let values: Vec<String> = (0..6)
        .flat_map(|p| [step + p as f64, -(p as f64)])
        .map(|v| v.to_string())
        .collect();

    format!(
        r#"<?xml version="1.0"?>
<VTKFile type="ImageData" version="1.0" byte_order="LittleEndian">
  <ImageData WholeExtent="0 2 0 0 0 1" Origin="1 0 -1" Spacing="0.5 1 2">
    <Piece Extent="0 2 0 0 0 1">
      <PointData>
        <DataArray type="Float32" Name="vel" NumberOfComponents="2" format="ascii">{}</DataArray>
      </PointData>
    </Piece>
  </ImageData>
</VTKFile>"#,
        values.join(" ")
    )
}

#[test]
fn image_data_files_aggregate() {
    let dir = tempfile::tempdir().unwrap();
    let grids = dir.path().join("images");
    std::fs::create_dir(&grids).unwrap();

    std::fs::write(grids.join("resampled_t001000000.vti"), image_file(100.)).unwrap();
    std::fs::write(grids.join("resampled_t000000000.vti"), image_file(0.)).unwrap();

    let summary = pipeline::grids_to_mat(&AggregateConfig {
        source_path: grids,
        ..Default::default()
    })
    .unwrap();

    assert_eq!(summary.field, "vel");
    assert_eq!(summary.shape, [3, 1, 2, 2, 2]);
    assert_eq!(summary.missing, 0);

    let mat = common::read_mat(&summary.output);
    assert_eq!(mat.get("xs").unwrap().as_doubles(), Some(&[1., 1.5, 2.][..]));
    assert_eq!(mat.get("ys").unwrap().as_doubles(), Some(&[0.][..]));
    assert_eq!(mat.get("zs").unwrap().as_doubles(), Some(&[-1., 1.][..]));
    assert_eq!(mat.get("ts").unwrap().as_doubles(), Some(&[0., 0.001][..]));

    // point index p = i + 3 k, x fastest in the file
    let values = mat.get("vel").unwrap().to_ndarray().unwrap();
    assert_eq!(values[[2, 0, 1, 0, 0]], 5.);
    assert_eq!(values[[2, 0, 1, 1, 0]], 105.);
    assert_eq!(values[[1, 0, 0, 1, 1]], -1.);
}
