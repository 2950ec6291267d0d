mod host;
mod monitor;
mod net;
mod scheduler;
mod status;
mod store;

#[cfg(test)]
mod testutil;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
