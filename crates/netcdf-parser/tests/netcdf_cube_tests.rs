//! Reading small NetCDF cubes written on the fly.

use climate_common::{GridAxis, VariableAliases, YearRange};
use netcdf_parser::{CubeSource, NetCdfCube, NetCdfError, SliceAccess};
use test_utils::{date, netcdf_path, pattern_value, scratch_dir, write_netcdf_cube, CubeFile};

fn aliases(logical: &str) -> Vec<String> {
    VariableAliases::default().candidates(logical)
}

// ============================================================================
// Variable resolution
// ============================================================================

#[test]
fn test_first_present_alias_wins() {
    let dir = scratch_dir();
    let path = netcdf_path(&dir, "pr");
    write_netcdf_cube(&path, &CubeFile::pattern("prAdjust", 3, 4, 5)).unwrap();

    let cube = NetCdfCube::open(&path, &aliases("pr")).unwrap();
    assert_eq!(cube.variable_name(), "prAdjust");
    assert!(cube.variable_names().contains(&"time".to_string()));
}

#[test]
fn test_missing_variable_names_aliases() {
    let dir = scratch_dir();
    let path = netcdf_path(&dir, "tas");
    write_netcdf_cube(&path, &CubeFile::pattern("tas", 2, 2, 2)).unwrap();

    match NetCdfCube::open(&path, &aliases("pr")) {
        Err(NetCdfError::VariableNotFound { aliases }) => {
            assert_eq!(aliases, vec!["prAdjust", "prAdjusted", "pr"]);
        }
        other => panic!("expected VariableNotFound, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = scratch_dir();
    let err = NetCdfCube::open(&netcdf_path(&dir, "absent"), &aliases("pr")).unwrap_err();
    assert!(matches!(err, NetCdfError::IoError(_)));
}

// ============================================================================
// Axes
// ============================================================================

#[test]
fn test_regular_grid_and_time_axis() {
    let dir = scratch_dir();
    let path = netcdf_path(&dir, "pr");
    write_netcdf_cube(&path, &CubeFile::pattern("pr", 3, 4, 5)).unwrap();

    let cube = NetCdfCube::open(&path, &aliases("pr")).unwrap();
    assert!(matches!(cube.grid_axis(), GridAxis::Regular { .. }));
    assert_eq!(cube.grid_axis().shape(), (3, 4));
    assert_eq!(cube.access(), SliceAccess::Direct);

    let dates: Vec<_> = cube.time_axis().iter().map(|s| s.date.clone().unwrap()).collect();
    assert_eq!(dates.first(), Some(&date(2030, 1, 1)));
    assert_eq!(dates.last(), Some(&date(2030, 1, 5)));
}

#[test]
fn test_year_filter() {
    let dir = scratch_dir();
    let path = netcdf_path(&dir, "pr");
    let mut layout = CubeFile::pattern("pr", 2, 2, 4);
    layout.time_units = "days since 2030-12-30".to_string();
    write_netcdf_cube(&path, &layout).unwrap();

    let cube = NetCdfCube::open(&path, &aliases("pr")).unwrap();
    let years = YearRange::new(2031, 2031).unwrap();
    assert_eq!(cube.timestep_indices(Some(years)), vec![2, 3]);
}

#[test]
fn test_360_day_calendar_marks_invalid_dates() {
    let dir = scratch_dir();
    let path = netcdf_path(&dir, "tas");
    let mut layout = CubeFile::pattern("tas", 2, 2, 3);
    layout.time_units = "days since 2030-02-28".to_string();
    layout.calendar = "360_day".to_string();
    layout.times = vec![0.0, 1.0, 3.0];
    write_netcdf_cube(&path, &layout).unwrap();

    let cube = NetCdfCube::open(&path, &aliases("tas")).unwrap();
    let axis = cube.time_axis();
    assert_eq!(axis[0].date, Ok(date(2030, 2, 28)));
    assert!(axis[1].date.is_err());
    assert_eq!(axis[2].date, Ok(date(2030, 3, 1)));
}

// ============================================================================
// Slices
// ============================================================================

#[test]
fn test_read_single_timestep() {
    let dir = scratch_dir();
    let path = netcdf_path(&dir, "pr");
    write_netcdf_cube(&path, &CubeFile::pattern("pr", 3, 4, 5)).unwrap();

    let cube = NetCdfCube::open(&path, &aliases("pr")).unwrap();
    let slice = cube.read_timestep(3).unwrap();
    assert_eq!((slice.rows, slice.cols), (3, 4));
    assert_eq!(slice.get(2, 1), Some(pattern_value(3, 2, 1)));
    assert!(matches!(
        cube.read_timestep(5),
        Err(NetCdfError::TimestepOutOfRange { index: 5, len: 5 })
    ));
}

#[test]
fn test_transposed_layout_reads_row_major() {
    let dir = scratch_dir();
    let path = netcdf_path(&dir, "pr");
    let mut layout = CubeFile::pattern("pr", 3, 4, 2);
    layout.transposed = true;
    write_netcdf_cube(&path, &layout).unwrap();

    let cube = NetCdfCube::open(&path, &aliases("pr")).unwrap();
    assert_eq!(
        cube.access(),
        SliceAccess::Generic {
            level_axis: false,
            transposed: true
        }
    );
    let slice = cube.read_timestep(1).unwrap();
    for row in 0..3 {
        for col in 0..4 {
            assert_eq!(slice.get(row, col), Some(pattern_value(1, row, col)));
        }
    }
}

#[test]
fn test_fill_value_decodes_to_none() {
    let dir = scratch_dir();
    let path = netcdf_path(&dir, "pr");
    let mut layout = CubeFile::pattern("pr", 2, 2, 1);
    layout.fill_value = Some(-9999.0);
    layout.values[1] = -9999.0;
    layout.values[2] = f32::NAN;
    write_netcdf_cube(&path, &layout).unwrap();

    let cube = NetCdfCube::open(&path, &aliases("pr")).unwrap();
    let slice = cube.read_timestep(0).unwrap();
    assert_eq!(slice.get(0, 0), Some(0.0));
    assert_eq!(slice.get(0, 1), None);
    assert_eq!(slice.get(1, 0), None);
    assert_eq!(slice.valid_count(), 2);
}

#[test]
fn test_curvilinear_grid() {
    let dir = scratch_dir();
    let path = netcdf_path(&dir, "tas");
    let mut layout = CubeFile::pattern("tas", 2, 2, 1);
    layout.curvilinear = true;
    layout.lats = vec![48.0, 48.1, 48.2, 48.3];
    layout.lons = vec![1.0, 1.2, 0.9, 1.1];
    write_netcdf_cube(&path, &layout).unwrap();

    let cube = NetCdfCube::open(&path, &aliases("tas")).unwrap();
    assert!(matches!(cube.grid_axis(), GridAxis::Curvilinear { rows: 2, cols: 2, .. }));
    let cell = cube.grid_axis().resolve(48.21, 0.92).unwrap();
    assert_eq!((cell.row, cell.col), (1, 0));
}
