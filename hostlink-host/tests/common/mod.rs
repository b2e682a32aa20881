//! Shared helpers for tests that load the fixture library.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use hostlink_host::ModulePaths;

/// Builds `hostlink-fixture` once per test binary and returns its path.
///
/// The build uses its own target directory so it never waits on the lock
/// held by the cargo invocation running the tests.
pub fn fixture_library() -> &'static Path {
    static LIBRARY: OnceLock<PathBuf> = OnceLock::new();
    LIBRARY.get_or_init(|| {
        let workspace = Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .expect("crate lives in the workspace root");
        let target = Path::new(env!("CARGO_TARGET_TMPDIR")).join("fixture");
        let output = Command::new(env!("CARGO"))
            .current_dir(workspace)
            .args(["build", "--quiet", "-p", "hostlink-fixture", "--target-dir"])
            .arg(&target)
            .output()
            .expect("cargo runs");
        assert!(
            output.status.success(),
            "building hostlink-fixture failed:\n{}",
            String::from_utf8_lossy(&output.stderr)
        );
        let library = target.join("debug").join(format!(
            "{}hostlink_fixture{}",
            std::env::consts::DLL_PREFIX,
            std::env::consts::DLL_SUFFIX
        ));
        assert!(library.exists(), "no fixture library at {}", library.display());
        library
    })
}

/// The fixture as both host and serializer.
pub fn fixture_paths() -> ModulePaths {
    let library = fixture_library().to_path_buf();
    ModulePaths {
        host: library.clone(),
        dependencies: Vec::new(),
        serializer: library,
    }
}
