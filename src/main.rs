#[tokio::main]
async fn main() {
    slot_engine::run().await;
}
