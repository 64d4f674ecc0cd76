//! Renders the `wsdriver(1)` manual page for the frame-replay demo binary.
//!
//! The page is generated from the clap definition in `src/cli.rs` and written
//! to `target/generated-man/<package>.1`.

use std::{fs, path::PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli.rs"]
mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=CARGO_PKG_NAME");

    let out_dir = PathBuf::from("target/generated-man");
    fs::create_dir_all(&out_dir)?;

    let page = format!("{}.1", env!("CARGO_PKG_NAME"));
    let cmd = cli::Cli::command().name(env!("CARGO_PKG_NAME"));
    let mut buf: Vec<u8> = Vec::new();
    Man::new(cmd).render(&mut buf)?;
    fs::write(out_dir.join(page), buf)?;

    Ok(())
}
