// This example proxies a GET request through a verity prover and prints the
// response together with the size of its proof.
//
// Start a prover (or the fixture: `cargo run -p verity-prover-fixture`) and
// point `VERITY_PROVER_URL` at it.

use tracing::info;
use verity_client::VerityClient;
use verity_examples::{client_config, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = client_config()?;
    info!("Proving a GET request through {}", config.prover_url());

    let response = VerityClient::new(config)
        .get("https://jsonplaceholder.typicode.com/posts/98")
        .redact("res:body:dolor")
        .send()
        .await?;

    if !response.status().is_success() {
        anyhow::bail!(response.status());
    }

    let json: serde_json::Value = response.json()?;
    println!("json: {json:#?}");

    match &response.proof {
        Some(proof) => println!("proof.len(): {}", proof.len()),
        None => println!("no proof was obtained"),
    }

    Ok(())
}
