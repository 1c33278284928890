//! Lab Worker - Entry Point
//!
//! Consumes the work queue until SIGINT/SIGTERM.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    core_config::tracing::install_color_eyre();
    lab_worker::run().await
}
