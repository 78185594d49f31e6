use rybbit_feeder::app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::main().await
}
