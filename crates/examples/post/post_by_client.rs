// This example proxies two POST requests through a verity prover, one of them
// with a strict proof policy.

use std::time::Duration;

use verity_client::VerityClient;
use verity_examples::{client_config, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let client = VerityClient::new(client_config()?);

    let notary = client.get_notary_info().await?;
    println!("notary version: {}", notary.version);

    let response = client
        .post("https://jsonplaceholder.typicode.com/posts")
        .json(&serde_json::json!({
            "userId": 1000,
            "firstName": "John",
            "lastName": "Smith",
            "fullName": "John Smith",
            "favoriteActor": "Johnny Depp"
        }))
        .redact("req:body:firstName, res:body:firstName")
        .send()
        .await?;

    if !response.status().is_success() {
        anyhow::bail!(response.status());
    }
    println!("json: {:#?}", response.json::<serde_json::Value>()?);
    println!("has proof: {}", response.has_proof());

    // Fail instead of returning the response without a proof.
    let response = client
        .post("https://jsonplaceholder.typicode.com/posts")
        .json(&serde_json::json!({"userId": 1001, "firstName": "Jane"}))
        .redact("req:body:firstName")
        .throw_on_error(true)
        .proof_timeout(Duration::from_secs(10))
        .await?;

    println!("notary key: {:?}", response.notary_pub_key);
    println!("proof.len(): {:?}", response.proof.map(|proof| proof.len()));

    Ok(())
}
