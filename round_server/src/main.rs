#[tokio::main]
async fn main() -> std::io::Result<()> {
    round_server::run_with_config().await
}
