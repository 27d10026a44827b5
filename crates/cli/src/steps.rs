use anyhow::{Context, Result, bail};
use console::style;
use dialoguer::Confirm;
use objectstore::Store;
use objectstore::join::join;

use crate::progress;

pub const PAYLOAD: &[u8] = b"Hello, World!";
pub const DEFAULT_NAME: &str = "objectstore-manualtest.txt";

/// Walk one object through write, read, list and delete.
///
/// With `interactive` set the operator confirms every step, which leaves
/// time to inspect the object with the provider's own tools.
pub async fn run(store: &Store, name: &str, interactive: bool) -> Result<()> {
    let coordinate = join(&store.location().to_string(), name);

    let spinner = progress::create_spinner(&format!("Writing '{coordinate}'..."));
    let written = store.write(name, PAYLOAD).await;
    spinner.finish_and_clear();
    written.with_context(|| format!("write '{coordinate}'"))?;
    done(&format!("Data written at '{coordinate}'"));
    pause(interactive)?;

    let spinner = progress::create_spinner(&format!("Reading '{coordinate}'..."));
    let data = store.read(name).await;
    spinner.finish_and_clear();
    let data = data.with_context(|| format!("read '{coordinate}'"))?;
    done(&format!("Data read from '{coordinate}' ({} bytes)", data.len()));
    pause(interactive)?;

    if data != PAYLOAD {
        bail!("the data stored does not match the data read");
    }
    done("Data compared");
    pause(interactive)?;

    let spinner = progress::create_spinner(&format!("Listing '{}'...", store.location()));
    let names = store.list().await;
    spinner.finish_and_clear();
    let names = names.with_context(|| format!("list '{}'", store.location()))?;
    let wanted = name.trim_start_matches('/');
    if !names.iter().any(|n| n == wanted) {
        bail!(
            "'{wanted}' missing from the {} objects listed at '{}'",
            names.len(),
            store.location()
        );
    }
    done(&format!("'{wanted}' found among {} listed objects", names.len()));
    pause(interactive)?;

    let spinner = progress::create_spinner(&format!("Deleting '{coordinate}'..."));
    let deleted = store.delete(name).await;
    spinner.finish_and_clear();
    deleted.with_context(|| format!("delete '{coordinate}'"))?;
    done(&format!("Object '{coordinate}' deleted"));
    pause(interactive)?;

    match store.read(name).await {
        Err(err) if err.is_not_found() => {
            done(&format!("'{coordinate}' is gone"));
            Ok(())
        }
        Ok(_) => bail!("'{coordinate}' is still readable after delete"),
        Err(err) => Err(err).with_context(|| format!("read '{coordinate}' after delete")),
    }
}

fn done(msg: &str) {
    println!("{} {msg}", style("✓").green());
}

fn pause(interactive: bool) -> Result<()> {
    if !interactive {
        return Ok(());
    }
    let proceed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()
        .context("failed to read confirmation")?;
    if !proceed {
        bail!("aborted by operator");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_round_trip_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().to_str().unwrap()).unwrap();

        run(&store, DEFAULT_NAME, false).await.unwrap();

        assert!(!dir.path().join(DEFAULT_NAME).exists());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn leading_separator_in_name_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().to_str().unwrap()).unwrap();
        run(&store, "/probe.txt", false).await.unwrap();
    }

    #[tokio::test]
    async fn missing_parent_fails_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().to_str().unwrap()).unwrap();

        let err = run(&store, "missing/probe.txt", false).await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.starts_with("write '"), "{message}");
        assert!(message.contains("does not exist or is not a directory"), "{message}");
    }

    #[tokio::test]
    async fn http_store_stops_at_write() {
        let store = Store::open("http://127.0.0.1:9/files").unwrap();
        let err = run(&store, DEFAULT_NAME, false).await.unwrap_err();
        assert!(format!("{err:#}").contains("HTTP write is not implemented"));
    }
}
