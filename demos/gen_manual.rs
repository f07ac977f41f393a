//! Writes man pages and shell completions for `pve-mcp`.
//!
//! Usage: `cargo run --example gen_manual [OUT_DIR]` (default `assets`).

use clap::{Command, CommandFactory, ValueEnum};
use clap_complete::{generate_to, Shell};
use clap_mangen::Man;
use pve_mcp::cli::Args;
use std::fs;
use std::path::{Path, PathBuf};

const BIN: &str = "pve-mcp";

/// One page for the binary and one per subcommand, `pve-mcp-config.1` style.
fn write_man_pages(cmd: &Command, dir: &Path) -> std::io::Result<usize> {
    let mut written = 0;
    let pages = std::iter::once((BIN.to_string(), cmd.clone())).chain(
        cmd.get_subcommands()
            .map(|sub| (format!("{}-{}", BIN, sub.get_name()), sub.clone())),
    );

    for (name, page) in pages {
        let mut buffer = Vec::new();
        Man::new(page).title(name.to_uppercase()).render(&mut buffer)?;
        fs::write(dir.join(format!("{}.1", name)), buffer)?;
        written += 1;
    }
    Ok(written)
}

fn main() -> std::io::Result<()> {
    let out_dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "assets".into()));
    let man_dir = out_dir.join("man");
    let comp_dir = out_dir.join("completions");
    fs::create_dir_all(&man_dir)?;
    fs::create_dir_all(&comp_dir)?;

    let mut cmd = Args::command();
    cmd.build();

    let pages = write_man_pages(&cmd, &man_dir)?;
    println!("{} man page(s) written to {}", pages, man_dir.display());

    for shell in Shell::value_variants() {
        let path = generate_to(*shell, &mut cmd, BIN, &comp_dir)?;
        println!("{}", path.display());
    }

    Ok(())
}
