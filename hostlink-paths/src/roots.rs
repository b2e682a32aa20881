//! Platform directories user data must never be placed in.

use std::path::PathBuf;

#[cfg(unix)]
const UNIX_ROOTS: &[&str] = &[
    "/bin", "/boot", "/dev", "/etc", "/lib", "/lib32", "/lib64", "/libx32", "/opt", "/proc",
    "/sbin", "/sys", "/usr",
];

#[cfg(target_os = "macos")]
const MACOS_ROOTS: &[&str] = &["/System", "/Library", "/Applications"];

/// Program installation roots, shared program roots and system directories
/// for the current platform.
pub fn system_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    #[cfg(windows)]
    {
        const VARS: &[&str] = &[
            "ProgramFiles",
            "ProgramFiles(x86)",
            "ProgramW6432",
            "CommonProgramFiles",
            "CommonProgramFiles(x86)",
            "CommonProgramW6432",
            "SystemRoot",
            "windir",
        ];
        const FALLBACKS: &[&str] = &[
            r"C:\Program Files",
            r"C:\Program Files (x86)",
            r"C:\Program Files\Common Files",
            r"C:\Program Files (x86)\Common Files",
            r"C:\Windows",
        ];
        roots.extend(
            VARS.iter()
                .filter_map(|var| std::env::var_os(var))
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        );
        roots.extend(FALLBACKS.iter().map(PathBuf::from));
    }

    #[cfg(target_os = "macos")]
    roots.extend(MACOS_ROOTS.iter().map(PathBuf::from));

    #[cfg(unix)]
    roots.extend(UNIX_ROOTS.iter().map(PathBuf::from));

    roots.sort();
    roots.dedup();
    roots
}
