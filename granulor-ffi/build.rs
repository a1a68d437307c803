// Build script that tries to generate a C header with `cbindgen`.
// If `cbindgen` is not available, it falls back to copying the
// checked-in `include/granulor.h` to $OUT_DIR.
//
// Either way, consumers can include the header from:
//   - <repo>/granulor-ffi/include/granulor.h   (checked-in)
//   - $OUT_DIR/granulor.h

use std::{env, fs, path::PathBuf, process::Command};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=include/granulor.h");

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let header_repo = crate_dir.join("include").join("granulor.h");
    let header_out = out_dir.join("granulor.h");

    let cbindgen_ok = Command::new("cbindgen")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);

    if cbindgen_ok {
        let status = Command::new("cbindgen")
            .args(["--crate", "granulor-ffi", "--lang", "C", "--output"])
            .arg(&header_out)
            .current_dir(&crate_dir)
            .status()?;
        if status.success() {
            println!("cargo:warning=granulor-ffi: generated header with cbindgen -> {}", header_out.display());
            return Ok(());
        }
        println!("cargo:warning=granulor-ffi: cbindgen failed; falling back to checked-in header");
    }

    fs::copy(&header_repo, &header_out)?;
    Ok(())
}
