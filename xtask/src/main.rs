use std::fs::create_dir_all;

use anyhow::bail;
use xtaskops::ops::{clean_files, cmd};

const USAGE: &str = "usage: cargo xtask <cover [xml|lcov] | simd>";

fn main() -> Result<(), anyhow::Error> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("cover") => cover(args.get(1).map(String::as_str)),
        Some("simd") => simd(),
        Some(other) => bail!("unknown task '{other}'\n{USAGE}"),
        None => {
            println!("{USAGE}");
            Ok(())
        }
    }
}

/// Runs the test suite with the AVX2 block kernels compiled in.
fn simd() -> Result<(), anyhow::Error> {
    println!("=== testing bbwt with avx2 kernels ===");
    cmd!("cargo", "test", "--package", "bbwt", "--features", "simd")
        .env("RUSTFLAGS", "-Ctarget-feature=+avx2")
        .run()?;
    println!("ok.");
    Ok(())
}

/// Writes a grcov report of the bbwt tests to `coverage/`.
fn cover(format: Option<&str>) -> Result<(), anyhow::Error> {
    let (fmt, file_ext) = match format.map(str::to_ascii_lowercase).as_deref() {
        Some("lcov") => ("lcov", "lcov"),
        None | Some("xml") | Some("cobertura") => ("cobertura", "xml"),
        Some(s) => bail!("unknown coverage format '{s}', expected xml or lcov"),
    };
    create_dir_all("coverage")?;
    let report = format!("coverage/bbwt.{file_ext}");

    println!("=== running instrumented tests ===");
    cmd!("cargo", "test", "--package", "bbwt")
        .env("CARGO_INCREMENTAL", "0")
        .env("RUSTFLAGS", "-Cinstrument-coverage")
        .env("LLVM_PROFILE_FILE", "cargo-test-%p-%m.profraw")
        .run()?;

    println!("=== writing {fmt} report to {report} ===");
    cmd!(
        "grcov",
        ".",
        "--binary-path",
        "./target/debug/deps",
        "-s",
        ".",
        "-t",
        fmt,
        "--branch",
        "--ignore-not-existing",
        "--ignore",
        "../*",
        "--ignore",
        "/*",
        "--ignore",
        "xtask/*",
        "--ignore",
        "bbwt/benches/*",
        "-o",
        report,
    )
    .run()?;

    clean_files("**/*.profraw")?;
    println!("ok.");
    Ok(())
}
