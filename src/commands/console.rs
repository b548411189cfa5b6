//! Line-oriented console driving the command handler.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::commands::{Command, CommandError, CommandHandler};
use crate::health::Prober;

/// Read commands from `reader` until EOF, writing one reply per line.
pub async fn run_console<P, R, W>(
    handler: &CommandHandler<P>,
    reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    P: Prober,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match Command::parse(line).and_then(|command| handler.execute(command)) {
            Ok(reply) => reply,
            Err(e @ (CommandError::Store(_) | CommandError::Monitor(_))) => {
                tracing::error!(command = %line, error = %e, "Command failed");
                format!("Internal error: {}", e)
            }
            Err(e) => e.to_string(),
        };

        writer.write_all(reply.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    tracing::info!("Console input closed");
    Ok(())
}
