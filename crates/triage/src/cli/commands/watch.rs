//! Implementation of `triage watch`.

use std::{process::ExitCode, time::Duration};

use chrono::Utc;
use triage_console::{AlertConsole, ConsoleEvent, ResultView, SearchBackend};

use crate::cli::{
    args::WatchCommand,
    commands::shared::{apply_query, settle},
    context::CommandContext,
    output::{dim, warning},
};

/// Keeps a search refreshed, printing a summary line after each refresh that lands.
pub async fn run(ctx: &CommandContext, cmd: &WatchCommand) -> ExitCode {
    let mut settings = ctx.settings();
    settings.paused = false;
    if let Some(secs) = cmd.interval {
        settings.refresh_interval = Duration::from_secs(secs.max(1));
    }
    let (_, mut console) = match ctx.console(settings) {
        Ok(console) => console,
        Err(code) => return code,
    };

    apply_query(console.query_mut(), &cmd.query);
    if cmd.group_by.is_empty() {
        console.search(true, None);
    } else {
        console.on_groups_change(cmd.group_by.clone());
    }
    if let Err(code) = settle(&mut console).await {
        return code;
    }
    println!("{}", summary(&console));

    let mut reported: Option<String> = None;
    let mut ticks = 0;
    while cmd.ticks == 0 || ticks < cmd.ticks {
        let Some(event) = console.next_event().await else {
            break;
        };
        let polled = matches!(event, ConsoleEvent::Polled(_));
        if !console.handle_event(event) {
            continue;
        }
        console.settle().await;
        if polled {
            ticks += 1;
        }

        let error = console.last_error().map(String::from);
        if error != reported {
            if let Some(message) = &error {
                eprintln!("{}", warning(&format!("refresh failed: {message}")));
            }
            reported = error;
        }
        println!("{}", summary(&console));
    }

    console.shutdown();
    ExitCode::SUCCESS
}

/// One line describing what the console shows.
fn summary<B: SearchBackend>(console: &AlertConsole<B>) -> String {
    let time = dim(&Utc::now().format("%H:%M:%S").to_string());
    if let Some(view) = console.flat() {
        let response = view.response();
        return format!(
            "{time} {} alerts, {} shown",
            response.total,
            response.results.len()
        );
    }

    let Some(view) = console.grouped() else {
        return time;
    };
    let groups: Vec<String> = view
        .tree()
        .roots()
        .iter()
        .map(|node| format!("{} ({})", node.key, node.total))
        .collect();
    let shown = view.alerts().len();
    format!(
        "{time} {} groups: {} {}",
        groups.len(),
        groups.join(", "),
        dim(&format!("[{shown} alerts expanded]"))
    )
}
