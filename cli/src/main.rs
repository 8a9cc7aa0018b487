use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    rankscope_cli::run().await
}
