//! Sends one test message through the configured chat sink and exits.
//! Use after setting up credentials to check the bot can reach the chat.

use kap_buyback_notifier::logging::init_tracing;
use kap_buyback_notifier::notify::{Notifier, TelegramNotifier};
use kap_buyback_notifier::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cfg = Config::from_env()?;
    init_tracing(cfg.verbose);

    let notifier = TelegramNotifier::new(&cfg.telegram)?.with_retries(1);
    notifier.send("✅ Telegram test mesajı").await?;

    tracing::info!(chat_id = %cfg.telegram.chat_id, "probe message delivered");
    println!("notify-probe done");
    Ok(())
}
