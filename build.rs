//! Build-time hints for locating FFmpeg.
//!
//! `ffmpeg-sys-next` does the actual discovery. This script only warns when
//! the environment looks like it will make that discovery fail, so the error
//! the user sees first is actionable.

use std::env;
use std::path::{Path, PathBuf};

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    for hint in ffmpeg_hints(&env::var("CARGO_CFG_TARGET_OS").unwrap_or_default()) {
        println!("cargo:warning=framegrab: {hint}");
    }
}

fn ffmpeg_hints(target_os: &str) -> Vec<String> {
    if let Some(dir) = env::var_os("FFMPEG_DIR").map(PathBuf::from) {
        if dir.join("include").is_dir() {
            return Vec::new();
        }
        return vec![format!(
            "FFMPEG_DIR={} has no include/ directory; ffmpeg-sys-next will not find the headers",
            dir.display()
        )];
    }

    match target_os {
        "windows" => windows_hints(),
        _ => Vec::new(),
    }
}

fn windows_hints() -> Vec<String> {
    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        return vec![
            "FFMPEG_DIR is not set; install FFmpeg with vcpkg and set VCPKG_ROOT and FFMPEG_DIR"
                .to_string(),
        ];
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let installed = Path::new(&vcpkg_root).join("installed").join(&triplet);

    if !installed.exists() {
        return vec![format!("no vcpkg FFmpeg install under {}", installed.display())];
    }

    let mut hints = vec![format!(
        "found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to pin it",
        installed.display()
    )];
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        hints.push("set VCPKGRS_DYNAMIC=1 when linking a dynamic vcpkg FFmpeg".to_string());
    }
    hints
}
