//! CLI `nestcopy <source-file> [destination-file]` — компактирующее копирование.
//!
//! Коды выхода: 0 — успех (и --help/--version), 1 — любой сбой, включая
//! ошибки разбора аргументов (например, не указан source-file).

use anyhow::Result;
use clap::error::ErrorKind as ClapErrorKind;
use clap::Parser;
use log::{error, info};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::CopyConfig;
use crate::copy::{copy_store, dest, ContainerPath, CopyReport};

#[derive(Parser, Debug)]
#[command(
    name = "nestcopy",
    version,
    about = "Copy a NestDB store into a fresh, compacted file"
)]
pub struct Cli {
    /// Source store file
    pub source: PathBuf,

    /// Destination store file (default: newcopy_<source-name> next to the source)
    pub destination: Option<PathBuf>,

    /// Insert all entries of a bucket in one write transaction
    #[arg(long)]
    pub batch: bool,

    /// Re-open the copy and compare it with the source snapshot
    #[arg(long)]
    pub verify: bool,

    /// Do not fsync the destination on every commit
    #[arg(long)]
    pub no_fsync: bool,

    /// Do not print per-bucket progress
    #[arg(long)]
    pub quiet: bool,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// ENV-конфиг с поверх наложенными флагами CLI.
    pub fn config(&self) -> CopyConfig {
        let mut cfg = CopyConfig::from_env();
        if self.batch {
            cfg = cfg.with_batch_entries(true);
        }
        if self.verify {
            cfg = cfg.with_verify(true);
        }
        if self.no_fsync {
            cfg = cfg.with_fsync(false);
        }
        if self.quiet {
            cfg = cfg.with_progress(false);
        }
        cfg
    }
}

/// Разобрать аргументы и выполнить копирование. Возвращает код выхода процесса.
pub fn run<I, T>(args: I) -> Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return Ok(match e.kind() {
                ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => 0,
                _ => 1,
            });
        }
    };

    let cfg = cli.config();
    let destination = dest::resolve_destination(&cli.source, cli.destination.as_deref());
    info!(
        "copy {} -> {} ({})",
        cli.source.display(),
        destination.display(),
        cfg
    );

    let progress = cfg.progress;
    let res = copy_store(&cli.source, &destination, &cfg, |path: &ContainerPath, n| {
        if progress {
            println!("{}", progress_line(path, n));
        }
    });

    match res {
        Ok(report) => {
            print_report(&report, cli.json)?;
            Ok(0)
        }
        Err(e) => {
            let code = e.exit_code();
            error!("{:#}", anyhow::Error::new(e));
            Ok(code)
        }
    }
}

/// Блок прогресса для одного посещённого контейнера назначения.
pub fn progress_line(path: &ContainerPath, entries: usize) -> String {
    format!("Bucket path: {}\nEntries: {}\n", path, entries)
}

fn print_report(rep: &CopyReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(rep)?);
        return Ok(());
    }

    println!("Copy summary:");
    println!("  source            = {}", rep.source.display());
    println!("  destination       = {}", rep.destination.display());
    println!("  containers        = {}", rep.containers);
    println!("  entries           = {}", rep.entries);
    println!("  write_txns        = {}", rep.write_txns);
    println!("  source_bytes      = {}", rep.source_bytes);
    println!("  destination_bytes = {}", rep.destination_bytes);
    println!("  verified          = {}", rep.verified);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_exits_with_one() {
        let code = run(["nestcopy"]).unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn progress_line_names_nested_path() {
        let path = ContainerPath::from_names(["a", "b"]);
        assert_eq!(progress_line(&path, 3), "Bucket path: [a b]\nEntries: 3\n");
    }

    #[test]
    fn progress_line_marks_binary_names() {
        let path = ContainerPath::from_names(["users"]).child(&[0xff, 0xfe]);
        assert_eq!(
            progress_line(&path, 0),
            "Bucket path: [users (binary 2 B)]\nEntries: 0\n"
        );
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from(["nestcopy", "a.db", "--batch", "--quiet", "--no-fsync"])
            .unwrap();
        let cfg = cli.config();
        assert!(cfg.batch_entries);
        assert!(!cfg.progress);
        assert!(!cfg.fsync);
        assert!(cli.destination.is_none());
    }
}
