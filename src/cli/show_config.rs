//! `statline config` command handler.

use anyhow::Result;

use statline::Config;

pub(crate) fn cmd_config(config: &Config) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    if config.api.api_key.is_none() {
        eprintln!("Note: no API key configured (set STATLINE_API_KEY).");
    }
    Ok(())
}
