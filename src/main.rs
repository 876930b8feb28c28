#[tokio::main]
async fn main() {
    if let Err(err) = store_goals_api::run().await {
        eprintln!("fatal: {err}");
        std::process::exit(1);
    }
}
