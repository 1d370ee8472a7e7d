//! Process plumbing shared by the server binaries.

use darkemu_server::ShutdownHandle;
use tracing_subscriber::EnvFilter;

/// Installs the global `fmt` subscriber.
///
/// An explicit `level` (any `EnvFilter` directive) wins over `RUST_LOG`;
/// without either the filter is `info`.
pub fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    // A subscriber installed by the embedder stays in place.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Stops the server loop behind `handle` on Ctrl+C.
///
/// Signals are awaited on a dedicated thread with its own small runtime,
/// leaving the readiness loop on the calling thread.
///
/// # Errors
/// Returns IO error if the runtime or thread cannot be created.
pub fn shutdown_on_ctrl_c(handle: ShutdownHandle) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("darkemu-signal".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("shutdown requested");
                        handle.shutdown();
                    }
                    Err(e) => tracing::warn!(error = %e, "cannot listen for Ctrl+C"),
                }
            });
        })?;
    Ok(())
}
