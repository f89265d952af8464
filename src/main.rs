#[tokio::main]
async fn main() {
    if let Err(e) = permisos_client::run().await {
        tracing::error!(error = %e, "command failed");
        eprintln!("{e}");
        std::process::exit(1);
    }
}
