pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{BootstrapResult, bootstrap_workspace};
pub use application::commands::{
    AppState, BlockView, DocumentView, PriorityView, ScheduleUpdateResponse, add_priority_impl,
    assign_block_impl, current_block_impl, delete_priority_impl, list_priorities_impl,
    load_blocks_impl, merge_blocks_impl, priority_color_impl, recolor_priority_impl, redo_impl,
    rename_priority_impl, reset_blocks_impl, select_block_impl, split_block_impl, start_scheduler,
    undo_impl, update_schedule_impl,
};
pub use application::day_transition::{DayTransitionScheduler, SchedulerHandle, TransitionTask};
pub use application::events::{DocumentEvent, DocumentEvents};
pub use domain::generator::generate_time_blocks;
pub use domain::models::{BlockSequence, Document, ScheduleConfig, ScheduleError, TimeBlock};
pub use infrastructure::error::InfraError;

use infrastructure::logging::init_logging;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Runs the planner daemon in the current directory until Ctrl-C.
pub async fn run() -> Result<(), InfraError> {
    let workspace_root = std::env::current_dir()?;
    init_logging(&workspace_root.join("logs"))?;
    let app_state = AppState::new(workspace_root.clone())?;

    let mut changes = app_state.subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(DocumentEvent::DocumentChanged { document }) => info!(%document, "document changed"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "change feed lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let scheduler = start_scheduler(&app_state).await?;
    info!(
        workspace = %workspace_root.display(),
        timezone = %app_state.timezone(),
        "timeblock running"
    );

    tokio::signal::ctrl_c().await?;
    scheduler.shutdown().await?;
    watcher.abort();
    info!("timeblock stopped");
    Ok(())
}
