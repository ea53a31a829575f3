//! Interactive CLI for the DonoPot SDK
//!
//! Run with: cargo run --example donate
//!
//! Requires DONOPOT_ABI_FILE and either DONOPOT_CONTRACT_ADDRESS or
//! DONOPOT_ADDRESSES_FILE. Set PRIVATE_KEY to enable donations.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use donopot_sdk::{AbiDescription, ContractClient, LocalWallet, MonetaryAmount, NetworkConfig};

const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(180);

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = NetworkConfig::from_env()?;
    let abi_path = std::env::var("DONOPOT_ABI_FILE")
        .map_err(|_| eyre::eyre!("DONOPOT_ABI_FILE must be set"))?;
    let abi = AbiDescription::from_file(&abi_path)?;

    let mut client = ContractClient::new(config.clone(), abi);
    if let Ok(private_key) = std::env::var("PRIVATE_KEY") {
        let wallet = LocalWallet::from_private_key(&private_key, &config.chain.rpc_urls[0])?;
        client = client.with_wallet(Arc::new(wallet));
    }

    println!("\n========================================");
    println!("        DonoPot SDK Interactive CLI");
    println!("========================================");
    println!("Contract: {}", client.contract_url());
    match client.current_account().await {
        Some(account) => println!("Wallet:   {account}"),
        None => println!("Wallet:   none (set PRIVATE_KEY to donate)"),
    }

    loop {
        println!("\n----------------------------------------");
        println!("Select an option:");
        println!("  1. View pot");
        println!("  2. Donate");
        println!("  3. Retry read endpoints");
        println!("  q. Quit");
        println!("----------------------------------------");

        print!("Enter choice: ");
        io::stdout().flush()?;

        let choice = prompt_line()?;
        let result = match choice.as_str() {
            "1" => view_pot(&client).await,
            "2" => donate_flow(&client).await,
            "3" => {
                client.reset_read_connection();
                view_pot(&client).await
            }
            "q" | "Q" => {
                println!("\nGoodbye!");
                break;
            }
            _ => {
                println!("\nInvalid choice. Please try again.");
                Ok(())
            }
        };

        // Every failure is recoverable; report it and keep the menu running
        if let Err(e) = result {
            println!("\nError: {e:#}");
        }
    }

    Ok(())
}

fn prompt_line() -> io::Result<String> {
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

async fn view_pot(client: &ContractClient) -> eyre::Result<()> {
    println!("\n=== POT ===");

    let account = client.current_account().await;

    // Fetch the total and our share in parallel
    let (total, mine) = futures::future::try_join(
        client.read_aggregate(),
        client.read_account_value(account),
    )
    .await?;

    println!("Total donated: {total} ETH");
    if account.is_some() {
        println!("Your donations: {mine} ETH");
    }

    Ok(())
}

async fn donate_flow(client: &ContractClient) -> eyre::Result<()> {
    println!("\n=== DONATE ===");

    print!("Amount in ETH (e.g. 0.001): ");
    io::stdout().flush()?;
    let input = prompt_line()?;
    let amount: MonetaryAmount = input.parse()?;
    if amount.is_zero() {
        println!("Nothing to donate.");
        return Ok(());
    }

    let handle = client.submit(amount).await?;
    println!("Transaction: {}", client.tx_url(handle.hash()));

    let receipt = handle.await_confirmation(CONFIRMATION_TIMEOUT).await?;
    println!("Donated {amount} ETH in block {}", receipt.block_number);

    view_pot(client).await
}
