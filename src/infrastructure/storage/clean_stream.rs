use crate::infrastructure::cache::connect;
use redis::Client;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

/// `dir/filename`, keeping only the final component of `filename`.
pub(crate) fn bare_path(dir: &Path, filename: &str) -> Option<PathBuf> {
    // queue entries come from Redis; never follow anything but a bare name
    let name = Path::new(filename).file_name()?;
    Some(dir.join(name))
}

/// Deletes the file named by every entry of `stream` from `dir`.
///
/// An entry is removed from the stream once its file is gone; entries whose
/// file could not be deleted stay queued for the next pass. Returns how many
/// entries were settled.
pub(crate) async fn drain(client: &Client, stream: &str, dir: &Path) -> anyhow::Result<u64> {
    let mut conn = connect(client).await?;
    let entries: Vec<(String, HashMap<String, String>)> = redis::cmd("XRANGE")
        .arg(stream)
        .arg("-")
        .arg("+")
        .query_async(&mut conn)
        .await?;

    let mut settled = 0;
    for (id, fields) in entries {
        let path = fields
            .get("filename")
            .and_then(|name| bare_path(dir, name));
        if let Some(path) = path {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(stream, path = %path.display(), "queued file already gone");
                }
                Err(e) => {
                    warn!(stream, path = %path.display(), error = %e, "failed to delete queued file");
                    continue;
                }
            }
        }
        let _: i64 = redis::cmd("XDEL")
            .arg(stream)
            .arg(&id)
            .query_async(&mut conn)
            .await?;
        settled += 1;
    }
    Ok(settled)
}
