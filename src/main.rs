//! polyglotpkg - packages Node.js, Python and PowerShell actions into deployable bundles.
//!
//! Exit code 0 guarantees the archive exists at the output path.

use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Run CLI and get exit code
    let exit_code = match polyglotpkg::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            for suggestion in e.recovery_suggestions() {
                eprintln!("  hint: {suggestion}");
            }
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
