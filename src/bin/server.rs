use anyhow::Context;
use tracing::Level;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(debug_assertions)]
    let level = Some(Level::DEBUG);
    #[cfg(not(debug_assertions))]
    let level = Some(Level::INFO);

    let rocket = coursehub_backend::create(level)
        .await
        .context("unable to assemble the server")?;

    rocket.launch().await.context("error launching server")?;

    Ok(())
}
