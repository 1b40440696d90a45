//! Scenario catalog - the built-in matrix and matrix file loading
//!
//! The default matrix is plain data: core suites first, then one scenario
//! per optional dependency, then an extended block that only runs on the
//! interpreter version the heavy integrations are pinned against.

use std::path::Path;

use crate::domain::{
    ConfigurationError, DependencySet, Gate, Implementation, Matrix, Package, Scenario,
    TestTarget,
};
use crate::error::Result;

/// Disables assertions and docstrings in the test process
pub const OPTIMIZE_VAR: &str = "PYTHONOPTIMIZE";
/// Toggles timezone-aware settings for the Django suite
pub const DJANGO_USE_TZ_VAR: &str = "HYPOTHESIS_DJANGO_USETZ";

/// The extended block runs on this interpreter version only
pub const EXTENDED_VERSION: (u32, u32) = (3, 8);

/// Built-in scenario matrix
pub fn default_matrix() -> Matrix {
    let (major, minor) = EXTENDED_VERSION;

    Matrix::default()
        .scenario(Scenario::new("cover", TestTarget::path("tests/cover")))
        .scenario(Scenario::new(
            "pytest-plugin",
            TestTarget::path("tests/pytest").with_arg("--runpytest=subprocess"),
        ))
        .scenario(
            Scenario::new("nocover", TestTarget::path("tests/nocover"))
                .gated(Gate::final_reference()),
        )
        .scenario(
            Scenario::new(
                "optimized-decorators",
                TestTarget::path("tests/cover/test_testdecorators.py"),
            )
            .gated(Gate::final_reference())
            .with_env(OPTIMIZE_VAR, "2"),
        )
        .scenario(
            Scenario::new("datetime-pytz", TestTarget::path("tests/datetime"))
                .with_dependencies(DependencySet::of("pytz", ["pytz"])),
        )
        .scenario(
            Scenario::new("dateutil", TestTarget::path("tests/dateutil"))
                .installing(DependencySet::of("dateutil", ["python-dateutil"]))
                .removing(DependencySet::of("dateutil", ["python-dateutil", "six"])),
        )
        .scenario(
            Scenario::new("redis", TestTarget::path("tests/redis"))
                .installing(DependencySet::of("fakeredis", ["fakeredis"]))
                .removing(DependencySet::of("fakeredis", ["fakeredis", "redis"])),
        )
        .scenario(
            Scenario::new("lark", TestTarget::path("tests/lark"))
                .gated(Gate::implementation(Implementation::Reference))
                .with_dependencies(DependencySet::of("lark", ["lark-parser"])),
        )
        .block(
            "extended",
            Gate::version_equals(major, minor),
            vec![
                Scenario::new("django-aware", TestTarget::path("tests/django"))
                    .with_dependencies(django())
                    .with_env(DJANGO_USE_TZ_VAR, "TRUE"),
                Scenario::new("django-naive", TestTarget::path("tests/django"))
                    .with_dependencies(django())
                    .with_env(DJANGO_USE_TZ_VAR, "FALSE"),
                Scenario::new("numpy", TestTarget::path("tests/numpy"))
                    .with_dependencies(DependencySet::of("numpy", ["numpy"])),
                Scenario::new("pandas", TestTarget::path("tests/pandas"))
                    .installing(DependencySet::of("pandas", ["pandas"]))
                    .removing(DependencySet::of(
                        "pandas",
                        ["pandas", "numpy", "pytz", "python-dateutil", "six"],
                    )),
            ],
        )
}

fn django() -> DependencySet {
    DependencySet::new(
        "django",
        vec![Package::pinned("django", "3.0.8"), Package::new("sqlparse")],
    )
}

/// Parse and validate a JSON matrix
///
/// # Errors
/// - MatrixError::Serialization for malformed JSON
/// - MatrixError::Configuration when the matrix fails validation
pub fn parse_matrix(json: &str) -> Result<Matrix> {
    let matrix: Matrix = serde_json::from_str(json)?;
    matrix
        .validate()
        .map_err(|e| ConfigurationError::InvalidMatrix(e.to_string()))?;
    Ok(matrix)
}

/// Load a JSON matrix file
pub fn load_matrix(path: &Path) -> Result<Matrix> {
    let json = std::fs::read_to_string(path)?;
    parse_matrix(&json)
}
