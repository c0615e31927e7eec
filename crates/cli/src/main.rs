use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    teller_cli::run().await
}
