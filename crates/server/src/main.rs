//! The main function for the bookstore HTTP server

#[allow(
    clippy::print_stderr,
    reason = "Tracing may not be initialized yet when startup fails"
)]
#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(error) = server::start_server().await {
        eprintln!("Failed to start bookstore server! Error: {error}");
        return std::process::ExitCode::FAILURE;
    }
    std::process::ExitCode::SUCCESS
}
