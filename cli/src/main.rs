//! Drives the wallet round trip from the command line. Each invocation is one
//! "page load": commands share nothing but the file-backed store.

use std::str::FromStr;

use anyhow::Context;
use arcade_link_api::prelude::*;
use solana_sdk::{message::Message, pubkey::Pubkey, transaction::Transaction};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let store = ResumptionStore::new(FileStore::open(&config.store_path)?);
    tracing::debug!(path = %config.store_path.display(), "opened store");

    match env("COMMAND")?.as_str() {
        "keys" => keys(&store)?,
        "connect" => connect(&config, &store)?,
        "connect_callback" => connect_callback(&config, &store).await?,
        "pay" => pay(&config, &store).await?,
        "sign_callback" => sign_callback(&config, &store).await?,
        "disconnect" => disconnect(&config, &store)?,
        "disconnect_callback" => disconnect_callback(&config, &store).await?,
        "session" => log_session(&store)?,
        "resume" => resume(&store)?,
        "forget" => forget(&store)?,
        other => anyhow::bail!("Invalid command {other}"),
    };
    Ok(())
}

fn keys(store: &ResumptionStore<FileStore>) -> Result<(), anyhow::Error> {
    let key_pair = get_or_create_key_pair(store)?;
    println!("Dapp encryption key: {}", key_pair.public_key);
    Ok(())
}

fn connect(config: &Config, store: &ResumptionStore<FileStore>) -> Result<(), anyhow::Error> {
    let outbound = Outbound::new(store.clone(), config.deep_links()?);
    let link = outbound.begin_connect(&redirect())?;
    println!("{link}");
    Ok(())
}

async fn connect_callback(
    config: &Config,
    store: &ResumptionStore<FileStore>,
) -> Result<(), anyhow::Error> {
    let url = callback_url()?;
    let handler = CallbackHandler::with_clock(store.clone(), SystemClock, config.handler_config());
    print_outcome(handler.handle_connect(&url).await).await;
    Ok(())
}

/// Builds the entry-fee transfer from the connected wallet and sends it to
/// the wallet for signing.
async fn pay(config: &Config, store: &ResumptionStore<FileStore>) -> Result<(), anyhow::Error> {
    let session = store
        .session()?
        .ok_or_else(|| anyhow::anyhow!("No wallet connected. Run COMMAND=connect first."))?;
    let lamports = u64::from_str(&env("BET_LAMPORTS")?).context("Invalid BET_LAMPORTS")?;
    let treasury = Pubkey::from_str(&env("TREASURY")?).context("Invalid TREASURY")?;
    let game_mode = std::env::var("GAME_MODE").unwrap_or_else(|_| "casual".to_string());
    let method = match std::env::var("METHOD").as_deref() {
        Ok("signAndSendTransaction") => SignMethod::SignAndSendTransaction,
        _ => SignMethod::SignTransaction,
    };

    let wallet = Pubkey::from_str(&session.wallet_public_key).context("Stored wallet address is invalid")?;
    let relay = relay(config);
    let blockhash = relay.client().get_latest_blockhash().await?;
    #[allow(deprecated)]
    let ix = solana_sdk::system_instruction::transfer(&wallet, &treasury, lamports);
    let message = Message::new_with_blockhash(&[ix], Some(&wallet), &blockhash);
    let transaction = bincode::serialize(&Transaction::new_unsigned(message))?;

    let outbound = Outbound::new(store.clone(), config.deep_links()?);
    let link = outbound.begin_sign(
        method,
        &transaction,
        &redirect(),
        &PendingFlow::new(game_mode, lamports),
    )?;

    println!("═══════════════════════════════════════════════════════════");
    println!("  Entry fee: {} lamports from {}", lamports, session.short_address());
    println!("  Treasury:  {}", treasury);
    println!("  Method:    {}", method);
    println!("═══════════════════════════════════════════════════════════");
    println!("{link}");
    Ok(())
}

async fn sign_callback(
    config: &Config,
    store: &ResumptionStore<FileStore>,
) -> Result<(), anyhow::Error> {
    let url = callback_url()?;
    let relay = relay(config);
    let handler = CallbackHandler::with_clock(store.clone(), SystemClock, config.handler_config());
    print_outcome(handler.handle_sign(&url, &relay).await).await;
    Ok(())
}

fn disconnect(config: &Config, store: &ResumptionStore<FileStore>) -> Result<(), anyhow::Error> {
    let outbound = Outbound::new(store.clone(), config.deep_links()?);
    let link = outbound.disconnect(&redirect())?;
    println!("{link}");
    Ok(())
}

async fn disconnect_callback(
    config: &Config,
    store: &ResumptionStore<FileStore>,
) -> Result<(), anyhow::Error> {
    let url = callback_url()?;
    let handler = CallbackHandler::with_clock(store.clone(), SystemClock, config.handler_config());
    print_outcome(handler.handle_disconnect(&url).await).await;
    Ok(())
}

fn log_session(store: &ResumptionStore<FileStore>) -> Result<(), anyhow::Error> {
    match store.session()? {
        Some(session) => {
            println!("Wallet:          {}", session.wallet_public_key);
            println!("Wallet key:      {}", session.phantom_encryption_public_key);
        }
        None => println!("Wallet:          not connected"),
    }
    if let Some(key_pair) = store.dapp_key_pair()? {
        println!("Dapp key:        {}", key_pair.public_key);
    }
    if let Some(path) = store.pending_redirect()? {
        println!("Pending path:    {}", path);
    }
    if let Some(signature) = store.last_transaction_id()? {
        println!("Last tx:         {}", signature);
    }
    let flow = store.pending_flow()?;
    if !flow.is_empty() {
        println!("Pending flow:    {:?}", flow);
    }
    Ok(())
}

/// What the resumed game page does: consume the payment and flow flags.
fn resume(store: &ResumptionStore<FileStore>) -> Result<(), anyhow::Error> {
    let signature = store.take_last_transaction_id()?;
    let flow = store.take_pending_flow()?;
    match signature {
        Some(signature) => {
            println!("Entry confirmed: {}", signature);
            if let Some(mode) = flow.game_mode {
                println!("Game mode:       {}", mode);
            }
            if let Some(lamports) = flow.bet_lamports {
                println!("Bet:             {} lamports", lamports);
            }
        }
        None => println!("No confirmed entry. Start a new payment."),
    }
    Ok(())
}

fn forget(store: &ResumptionStore<FileStore>) -> Result<(), anyhow::Error> {
    store.wipe()?;
    println!("Local wallet state cleared.");
    Ok(())
}

async fn print_outcome(outcome: CallbackOutcome) {
    match outcome {
        CallbackOutcome::Duplicate => println!("Callback already handled."),
        CallbackOutcome::Navigate(navigation) => {
            // The guard release must finish before this process exits.
            let (path, result) = navigation.settle().await;
            match result {
                Ok(Commit::Connected(session)) => println!("Connected {}", session.wallet_public_key),
                Ok(Commit::Confirmed { signature }) => println!("Confirmed {}", signature),
                Ok(Commit::Disconnected) => println!("Disconnected"),
                Err(e) => println!("Wallet action not completed: {}", e),
            }
            println!("Navigate: {}", path);
        }
    }
}

fn relay(config: &Config) -> RpcRelay {
    RpcRelay::new(config.rpc_url.clone()).with_polling(config.confirm_timeout, config.poll_interval)
}

fn redirect() -> String {
    std::env::var("REDIRECT").unwrap_or_else(|_| DEFAULT_ROUTE.to_string())
}

fn callback_url() -> Result<Url, anyhow::Error> {
    let raw = env("CALLBACK_URL")?;
    Url::parse(&raw).with_context(|| format!("Invalid CALLBACK_URL {raw}"))
}

fn env(name: &str) -> Result<String, anyhow::Error> {
    std::env::var(name).with_context(|| format!("Missing {name} env var"))
}
