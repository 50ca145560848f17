use anyhow::Result;
use daymark::{cli::run_cli, utils::runtime::single_thread_runtime};
use tracing::error;

fn main() -> Result<()> {
    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(run_cli()).inspect_err(|e| {
        error!("Error running cli {e:?}");
    });
    // `watch` can leave a blocking stdin read behind, don't wait for it.
    runtime.shutdown_background();
    result
}
