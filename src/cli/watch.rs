use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    lifecycle::{shutdown::detect_shutdown, source::LineLifecycle, LifecycleModule},
    store::EventLogStore,
};

use super::output::print_recorded;

/// Feeds app states from stdin into the store until stdin closes or Ctrl-C is pressed.
pub async fn watch_stdin(store: &mut EventLogStore) -> Result<()> {
    let shutdown = CancellationToken::new();
    let lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let module = LifecycleModule::new(Box::new(LineLifecycle::new(lines)), shutdown.clone());

    let signals = tokio::spawn(detect_shutdown(shutdown.clone()));

    let result = module
        .run(|| match store.record_foreground() {
            Some(event) => print_recorded(&event, store),
            None => println!("Tracking is paused, foreground transition ignored"),
        })
        .await;

    shutdown.cancel();
    signals.await?;

    let foregrounds = result?;
    info!("Watch finished after {foregrounds} foreground transitions");
    Ok(())
}
