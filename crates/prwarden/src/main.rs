//! prwarden.
//!
//! prwarden is a standalone web service that enforces repository process
//! policy on GitHub pull requests: it checks that every change ships a news
//! fragment (or is labeled trivial), labels pull requests with merge
//! conflicts, and answers comment commands such as `request review`.

#![warn(missing_debug_implementations, clippy::all)]

mod cli;
mod config;
mod endpoints;
mod logging;
mod server;
mod signature;


fn main() {
    match cli::execute() {
        Ok(()) => std::process::exit(0),
        Err(error) => {
            logging::ensure_log_error(&error);
            std::process::exit(1);
        }
    }
}
