//! Example Amazon Pay client.
//!
//! Checks the service status and, when an order reference id is given, prints
//! everything attached to that order.
//!
//! Run with:
//! ```bash
//! cargo run --example client -- [ORDER_REFERENCE_ID]
//! ```
//!
//! Environment variables (a `.env` file is read too):
//! - AP_MWS_ACCESS_KEY, AP_MWS_SECRET_KEY: MWS credentials
//! - AP_MERCHANT_ID: Seller id
//! - AP_REGION: Region code, e.g. `us`, `de`, `jp`
//! - AP_CURRENCY_CODE: Default currency, e.g. `USD`
//! - AP_SANDBOX: `true` to use the sandbox

use amazon_pay::client::{AmazonPayClient, SellerScope};
use amazon_pay::config::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ClientConfig::from_env()?.with_application("amazon-pay-demo", "0.1.0");
    println!("Amazon Pay example client");
    println!("   Region: {}", config.region);
    println!("   Sandbox: {}", config.sandbox);
    println!();

    let client = AmazonPayClient::new(config)?;
    println!("Endpoint: {}", client.endpoint());

    let status = client.get_service_status().await?;
    println!("Service status ({:?}):", status.status_code());
    println!("{}", serde_json::to_string_pretty(status.to_dict())?);

    let Some(order_reference_id) = std::env::args().nth(1) else {
        return Ok(());
    };

    let details = client
        .get_payment_details(&order_reference_id, &SellerScope::default())
        .await?;
    for response in &details.responses {
        println!(
            "\n{} (request {})",
            response.response_type(),
            response.request_id().unwrap_or("-")
        );
        println!("{}", serde_json::to_string_pretty(response.to_dict())?);
    }
    for error in &details.errors {
        eprintln!("lookup failed: {}", error);
    }

    Ok(())
}
