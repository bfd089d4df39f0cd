use anyhow::Result;
use timewarp_sdk::Client;
use timewarp_types::Context as CancelContext;

use crate::config::{resolve_data_path, Config};

/// Everything a handler needs: an open client, a cancellation context
/// (never cancelled — the CLI runs one command to completion) and the
/// resolved config.
pub struct ExecutionContext {
    pub client: Client,
    pub ctx: CancelContext,
    pub config: Config,
}

impl ExecutionContext {
    pub fn open(data_path: Option<&str>) -> Result<Self> {
        let path = resolve_data_path(data_path)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let client = Client::open(&path)?;
        let config = Config::load()?;
        Ok(Self {
            client,
            ctx: CancelContext::background(),
            config,
        })
    }
}
