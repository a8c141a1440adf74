//! `parley webhook set | delete | info`.

use console::style;
use secrecy::SecretString;

use parley_infra::telegram::TelegramClient;

use crate::http::router::WEBHOOK_PATH;

/// The URL Telegram should post updates to for a server at `base_url`.
pub fn webhook_endpoint(base_url: &str) -> String {
    format!("{}{WEBHOOK_PATH}", base_url.trim_end_matches('/'))
}

pub async fn set_webhook(
    client: &TelegramClient,
    base_url: &str,
    secret: Option<&SecretString>,
) -> anyhow::Result<()> {
    let url = webhook_endpoint(base_url);
    client.set_webhook(&url, secret).await?;
    println!(
        "  {} Webhook set to {}",
        style("✓").green(),
        style(&url).cyan()
    );
    if secret.is_none() {
        println!(
            "  {}",
            style("No PARLEY_WEBHOOK_SECRET configured; requests will not be authenticated").yellow()
        );
    }
    Ok(())
}

pub async fn delete_webhook(client: &TelegramClient) -> anyhow::Result<()> {
    client.delete_webhook().await?;
    println!("  {} Webhook deleted", style("✓").green());
    Ok(())
}

pub async fn webhook_info(client: &TelegramClient) -> anyhow::Result<()> {
    let info = client.get_webhook_info().await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_endpoint() {
        assert_eq!(
            webhook_endpoint("https://bot.example.com"),
            "https://bot.example.com/api/webhook"
        );
        assert_eq!(
            webhook_endpoint("https://bot.example.com/"),
            "https://bot.example.com/api/webhook"
        );
    }
}
