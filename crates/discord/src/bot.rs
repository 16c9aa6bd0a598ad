use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    serenity::{Client, all::GuildId},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

use {
    aula_channels::{DirectoryState, InboundEvent},
    aula_config::DiscordConfig,
};

use crate::{handler::DiscordHandler, outbound::DiscordTransport};

/// A running gateway connection.
pub struct DiscordConnection {
    pub transport: Arc<DiscordTransport>,
    /// Cancel to disconnect every shard.
    pub cancel: CancellationToken,
}

/// Connect to the gateway and start forwarding events into `events`.
///
/// The directory is filled by the handler and shared with the returned
/// transport so DM channels opened either way are reused.
pub async fn connect(
    config: &DiscordConfig,
    directory: Arc<DirectoryState>,
    events: mpsc::Sender<InboundEvent>,
) -> anyhow::Result<DiscordConnection> {
    let token = config.token.expose_secret();
    if token.trim().is_empty() {
        anyhow::bail!("discord token is not configured");
    }
    let guild_id = match config.guild_id.as_deref() {
        Some(raw) => {
            let id: u64 = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid discord guild id: {raw}"))?;
            if id == 0 {
                anyhow::bail!("invalid discord guild id: {raw}");
            }
            Some(GuildId::new(id))
        },
        None => None,
    };

    let handler = DiscordHandler::new(Arc::clone(&directory), events, guild_id);
    let mut client = Client::builder(token, DiscordHandler::intents())
        .event_handler(handler)
        .await?;
    let transport = Arc::new(DiscordTransport::new(Arc::clone(&client.http), directory));

    let cancel = CancellationToken::new();
    let shards = Arc::clone(&client.shard_manager);
    let stop = cancel.clone();
    tokio::spawn(async move {
        stop.cancelled().await;
        info!("disconnecting from discord");
        shards.shutdown_all().await;
    });
    let failed = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = client.start().await {
            error!(error = %e, "discord client stopped");
        } else {
            warn!("discord client exited");
        }
        failed.cancel();
    });

    info!(guild_id = ?guild_id, "discord client started");
    Ok(DiscordConnection { transport, cancel })
}
