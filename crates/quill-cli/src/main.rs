mod cli;

use quill_core::api::ApiError;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{e:#}"); // pretty anyhow chain
        if e
            .downcast_ref::<ApiError>()
            .is_some_and(ApiError::is_unauthenticated)
        {
            eprintln!("Run `quill login` to sign in.");
        }
        std::process::exit(1);
    }
}
