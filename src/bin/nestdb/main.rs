use anyhow::Result;
use clap::Parser;

mod cli;
mod util;
mod cmd_mkbucket;
mod cmd_put;
mod cmd_get;
mod cmd_del;
mod cmd_tree;
mod cmd_stat;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Mkbucket { path, bucket } =>
            cmd_mkbucket::exec(path, bucket),

        cli::Cmd::Put { path, bucket, key, value, value_file } =>
            cmd_put::exec(path, bucket, key, value, value_file),

        cli::Cmd::Get { path, bucket, key, out } =>
            cmd_get::exec(path, bucket, key, out),

        cli::Cmd::Del { path, bucket, key } =>
            cmd_del::exec(path, bucket, key),

        cli::Cmd::Tree { path, json } =>
            cmd_tree::exec(path, json),

        cli::Cmd::Stat { path, json } =>
            cmd_stat::exec(path, json),
    }
}
