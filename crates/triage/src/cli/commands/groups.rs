//! Implementation of `triage groups`.

use std::process::ExitCode;

use triage_console::{AlertConsole, SearchBackend};
use triage_query::GroupPath;
use triage_tree::GroupNode;

use crate::cli::{
    args::GroupsCommand,
    commands::shared::{apply_query, settle},
    context::CommandContext,
    output::{JsonGroup, format_path, header, print_groups, print_json},
};

/// Groups the search results and prints the bucket tree.
pub async fn run(ctx: &CommandContext, cmd: &GroupsCommand) -> ExitCode {
    let (_, mut console) = match ctx.console(ctx.settings()) {
        Ok(console) => console,
        Err(code) => return code,
    };

    apply_query(console.query_mut(), &cmd.query);
    console.on_groups_change(cmd.group_by.clone());
    if let Err(code) = settle(&mut console).await {
        return code;
    }

    let mut paths = cmd.expand.clone();
    paths.sort_by_key(GroupPath::len);
    for path in &paths {
        if let Err(code) = expand(&mut console, path).await {
            return code;
        }
    }

    let Some(view) = console.grouped() else {
        return ExitCode::FAILURE;
    };
    if cmd.json {
        let groups: Vec<JsonGroup<'_>> =
            view.tree().roots().iter().map(JsonGroup::from_node).collect();
        return print_json(&groups);
    }

    println!("{} {}", header("Grouped by"), cmd.group_by.join(" > "));
    print_groups(view);
    ExitCode::SUCCESS
}

/// Expands `path` and every collapsed group above it, waiting for each to load.
async fn expand<B: SearchBackend>(
    console: &mut AlertConsole<B>,
    path: &GroupPath,
) -> Result<(), ExitCode> {
    let mut prefix = GroupPath::root();
    for segment in path.segments() {
        prefix = prefix.child(&segment.field, &segment.key);
        let expanded = console
            .grouped()
            .and_then(|view| view.tree().node(&prefix))
            .map(GroupNode::is_expanded);
        match expanded {
            Some(true) => continue,
            Some(false) => {}
            None => {
                eprintln!("error: no group {}", format_path(&prefix));
                return Err(ExitCode::FAILURE);
            }
        }
        if let Err(e) = console.toggle_group(&prefix) {
            eprintln!("error: {e}");
            return Err(ExitCode::FAILURE);
        }
        settle(console).await?;
    }
    Ok(())
}
