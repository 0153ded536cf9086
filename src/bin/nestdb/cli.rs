use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Админ-CLI для файлов NestDB
#[derive(Parser, Debug)]
#[command(name = "nestdb", version, about = "NestDB store admin CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Create a bucket path (missing levels are created)
    ///
    /// Пример:
    ///   nestdb mkbucket --path ./app.db --bucket users --bucket archive
    Mkbucket {
        #[arg(long)]
        path: PathBuf,
        /// Bucket name; repeat to address nested buckets root→leaf
        #[arg(long, required = true)]
        bucket: Vec<String>,
    },
    /// Put key/value into a bucket path (bucket path is created if missing)
    Put {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, required = true)]
        bucket: Vec<String>,
        #[arg(long)]
        key: String,
        /// Value: literal, "hex:..", "@file" or "-" for stdin. Ignored if --value-file is set.
        #[arg(long)]
        value: Option<String>,
        /// Read value bytes from a file
        #[arg(long)]
        value_file: Option<PathBuf>,
    },
    /// Get key from a bucket path
    Get {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, required = true)]
        bucket: Vec<String>,
        #[arg(long)]
        key: String,
        /// Optional file to write raw value into
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete key from a bucket path
    Del {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, required = true)]
        bucket: Vec<String>,
        #[arg(long)]
        key: String,
    },
    /// Print the bucket hierarchy with entry counts
    Tree {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print file/journal statistics
    Stat {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}
