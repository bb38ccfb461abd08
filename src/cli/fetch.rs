//! `statline fetch` command handler.

use anyhow::Result;

use statline::{Config, Dispatcher};

/// Fetch `endpoint` `repeat` times through one dispatcher and print the
/// payload. Stops at the first failed fetch.
pub(crate) async fn cmd_fetch(
    config: &Config,
    endpoint: &str,
    params: Vec<(String, String)>,
    repeat: u32,
) -> Result<()> {
    let dispatcher = Dispatcher::from_config(config)?;

    let outcome = fetch_repeated(&dispatcher, endpoint, &params, repeat.max(1)).await;
    dispatcher.metrics().emit_usage("fetch");

    let payload = outcome?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

async fn fetch_repeated(
    dispatcher: &Dispatcher,
    endpoint: &str,
    params: &[(String, String)],
    repeat: u32,
) -> statline::Result<serde_json::Value> {
    let mut payload = dispatcher.fetch(endpoint, params.iter().cloned()).await?;
    for _ in 1..repeat {
        payload = dispatcher.fetch(endpoint, params.iter().cloned()).await?;
    }
    Ok(payload)
}
