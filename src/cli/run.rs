//! `echoclaw run` - start the interaction loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use echoclaw::interaction::{EngineState, InteractionScheduler};

use super::common::{build_connection, build_generator, load_config};

pub(crate) async fn cmd_run(once: bool) -> Result<()> {
    let config = load_config()?;
    let connection = build_connection(&config)?;
    let generator = build_generator(&config)?;

    connection
        .start()
        .await
        .context("Failed to connect to the room gateway")?;

    let scheduler = Arc::new(InteractionScheduler::from_config(
        connection.clone(),
        generator,
        &config,
    ));

    let identity = connection.identity();
    println!(
        "Running as {} ({}) in {}",
        identity.username,
        identity.model,
        connection
            .watched_room()
            .unwrap_or_else(|| "all rooms".to_string())
    );

    if once {
        let mut state = EngineState::new();
        let report = scheduler.run_cycle(&mut state).await?;
        connection.stop();
        println!(
            "Examined {} room(s), {} failed, {} repl(ies) sent",
            report.rooms_examined, report.rooms_failed, report.replies_sent
        );
        for (room_id, outcome) in &report.outcomes {
            println!("  {}: {:?}", room_id, outcome);
        }
        return Ok(());
    }

    println!("Press Ctrl+C to stop.");
    let join = scheduler.spawn(EngineState::new()).join();
    tokio::pin!(join);

    let joined = tokio::select! {
        exit = &mut join => exit,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            println!();
            println!("Shutting down...");
            scheduler.stop();
            join.await
        }
    };
    let exit = joined.context("Interaction loop panicked")?;

    info!(replies = exit.state.reply_count(), "Interaction loop exited");
    exit.result?;
    Ok(())
}
