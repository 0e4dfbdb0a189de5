// This example proxies several POST requests through a verity prover at once.
// Each request is correlated with its own proof.

use futures::future::join_all;
use verity_client::VerityClient;
use verity_examples::{client_config, init_tracing};

const USERS: [(u32, &str); 3] = [(1000, "John"), (1001, "Jane"), (1002, "Alice")];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let client = VerityClient::new(client_config()?);

    let requests = USERS.iter().map(|(user_id, first_name)| {
        client
            .post("https://jsonplaceholder.typicode.com/posts")
            .json(&serde_json::json!({"userId": user_id, "firstName": first_name}))
            .redact("req:body:firstName, res:body:firstName")
            .send()
    });

    for ((user_id, _), response) in USERS.iter().zip(join_all(requests).await) {
        let response = response?;
        if !response.status().is_success() {
            anyhow::bail!(response.status());
        }

        match &response.proof {
            Some(proof) => println!("user {user_id}: proof.len(): {}", proof.len()),
            None => println!("user {user_id}: no proof was obtained"),
        }
    }

    Ok(())
}
