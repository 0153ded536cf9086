use env_logger::{Builder, Env};
use log::error;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт — info.
    // Пример: RUST_LOG=debug ./nestcopy src.db
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    let code = match NestDB::cli::run(std::env::args_os()) {
        Ok(code) => code,
        Err(e) => {
            // Логируем ошибку и выходим с кодом 1.
            error!("{:#}", e);
            1
        }
    };
    std::process::exit(code);
}
