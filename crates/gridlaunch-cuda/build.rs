//! Build script for gridlaunch-cuda.
//!
//! This script:
//! 1. Detects nvcc at build time
//! 2. Compiles the bundled kernels in `src/cuda/builtin_kernels.cu` to PTX
//! 3. Embeds the PTX and sets `cfg(has_nvcc)` so the typed builtin kernels exist
//! 4. Falls back to a stub without nvcc; handle-based launches still work

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    println!("cargo:rustc-check-cfg=cfg(has_nvcc)");
    println!("cargo:rerun-if-changed=src/cuda/builtin_kernels.cu");
    println!("cargo:rerun-if-env-changed=CUDA_PATH");
    println!("cargo:rerun-if-env-changed=CUDA_HOME");
    println!("cargo:rerun-if-env-changed=GRIDLAUNCH_NVCC_ARCH");

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    if env::var("CARGO_FEATURE_CUDA").is_err() {
        generate_stub(&out_dir, "cuda feature not enabled");
        return;
    }

    match find_nvcc() {
        Some(nvcc) => match compile_builtin_kernels(&nvcc, &out_dir) {
            Ok(()) => {
                println!("cargo:rustc-cfg=has_nvcc");
            }
            Err(e) => {
                println!("cargo:warning=Failed to compile builtin kernels: {}", e);
                generate_stub(&out_dir, &format!("nvcc compilation failed: {}", e));
            }
        },
        None => {
            println!("cargo:warning=nvcc not found - typed builtin kernels are unavailable");
            generate_stub(&out_dir, "nvcc not found at build time");
        }
    }
}

/// Find nvcc executable.
fn find_nvcc() -> Option<PathBuf> {
    for var in ["CUDA_PATH", "CUDA_HOME"] {
        if let Ok(root) = env::var(var) {
            let nvcc = PathBuf::from(root).join("bin").join("nvcc");
            if nvcc.exists() {
                return Some(nvcc);
            }
        }
    }

    for path in [
        "/usr/local/cuda/bin/nvcc",
        "/opt/cuda/bin/nvcc",
        "/usr/bin/nvcc",
    ] {
        let p = PathBuf::from(path);
        if p.exists() {
            return Some(p);
        }
    }

    let output = Command::new("which").arg("nvcc").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// Compile the builtin kernels to PTX and write the Rust bindings.
fn compile_builtin_kernels(nvcc: &Path, out_dir: &Path) -> Result<(), String> {
    let manifest_dir = PathBuf::from(
        env::var("CARGO_MANIFEST_DIR").map_err(|e| format!("CARGO_MANIFEST_DIR: {}", e))?,
    );
    let source = manifest_dir
        .join("src")
        .join("cuda")
        .join("builtin_kernels.cu");
    if !source.exists() {
        return Err(format!("CUDA source not found: {:?}", source));
    }

    // PTX is forward-compatible, so the oldest supported target runs everywhere newer.
    let arch = env::var("GRIDLAUNCH_NVCC_ARCH").unwrap_or_else(|_| "sm_75".to_string());
    let ptx_file = out_dir.join("builtin_kernels.ptx");

    let status = Command::new(nvcc)
        .args(["-ptx", "-O3", "-std=c++17"])
        .arg(format!("-arch={}", arch))
        .arg("-o")
        .arg(&ptx_file)
        .arg(&source)
        .status()
        .map_err(|e| format!("failed to execute nvcc: {}", e))?;

    if !status.success() {
        return Err(format!("nvcc exited with {:?}", status.code()));
    }

    let ptx = fs::read_to_string(&ptx_file).map_err(|e| format!("failed to read PTX: {}", e))?;
    write_rust_code(
        &out_dir.join("builtin_kernels.rs"),
        &ptx,
        true,
        &format!("builtin kernels compiled with nvcc for {}", arch),
    )
    .map_err(|e| format!("failed to write Rust bindings: {}", e))
}

/// Generate stub when nvcc is not available.
fn generate_stub(out_dir: &Path, reason: &str) {
    write_rust_code(&out_dir.join("builtin_kernels.rs"), "", false, reason)
        .expect("failed to write builtin kernel stub");
}

/// Write the Rust code with the PTX constant.
fn write_rust_code(path: &Path, ptx: &str, compiled: bool, message: &str) -> std::io::Result<()> {
    let mut code = String::new();

    code.push_str("// Generated by build.rs.\n\n");
    code.push_str("/// PTX of the bundled kernels, empty when nvcc was unavailable.\n");
    code.push_str("pub const BUILTIN_KERNEL_PTX: &str = r####\"");
    code.push_str(ptx);
    code.push_str("\"####;\n\n");

    code.push_str("/// Whether the device compiler ran for this build.\n");
    code.push_str(&format!(
        "pub const HAS_DEVICE_COMPILER: bool = {};\n\n",
        compiled
    ));

    code.push_str("/// How the bundled kernels were (or were not) built.\n");
    let escaped = message.replace('\\', "\\\\").replace('"', "\\\"");
    code.push_str(&format!(
        "pub const DEVICE_COMPILER_MESSAGE: &str = \"{}\";\n",
        escaped
    ));

    fs::write(path, code)
}
