//! CLI module
//!
//! This module provides the command-line interface functionality for the planboard tool.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io::{self, Write};

use crate::{
    api::{serve, Client, ClientConfig, HttpClient, ServerConfig},
    confirm::Pending,
    core::Core,
    engine::{Command, Edge},
    models::{Document, Row, RowId, RowKind, TaskStatus},
    seed::example_document,
    tree,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API server URL
    #[arg(short, long, default_value = "http://localhost:4400")]
    server: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the planboard API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 4400)]
        port: u16,

        /// Populate with the example plan for UI testing
        #[arg(long)]
        example: bool,
    },

    /// Print the plan tree
    Show {
        /// Only show rows matching this term (also reveals collapsed matches)
        #[arg(short = 'q', long)]
        search: Option<String>,
    },

    /// Add a row under a parent (top level if no parent given)
    Add {
        /// Label for the new row
        label: String,

        /// Parent row id
        #[arg(short, long)]
        parent: Option<String>,

        /// Kind of row to create
        #[arg(short, long, value_enum, default_value_t = KindArg::Task)]
        kind: KindArg,
    },

    /// Delete a row and everything under it
    Rm {
        /// Row id to delete
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Advance a task to its next status
    Status {
        /// Row id of the task
        id: String,

        /// Skip the confirmation prompt when un-completing a done task
        #[arg(short, long)]
        yes: bool,
    },

    /// Reset a done task back to new (clears its completion timestamp)
    Reset {
        /// Row id of the task
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Move a row before or after another row
    Mv {
        /// Row id to move
        source: String,

        /// Row id to place it next to
        target: String,

        /// Which side of the target to land on
        #[arg(short, long, value_enum, default_value_t = EdgeArg::After)]
        edge: EdgeArg,
    },

    /// Search the plan
    Search {
        /// Term to search for
        term: String,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Panel,
    Task,
    Text,
    Link,
    Comment,
}

impl From<KindArg> for RowKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Panel => RowKind::Panel,
            KindArg::Task => RowKind::Task,
            KindArg::Text => RowKind::Text,
            KindArg::Link => RowKind::Link,
            KindArg::Comment => RowKind::Comment,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EdgeArg {
    Before,
    After,
}

impl From<EdgeArg> for Edge {
    fn from(value: EdgeArg) -> Self {
        match value {
            EdgeArg::Before => Edge::Before,
            EdgeArg::After => Edge::After,
        }
    }
}

/// Run the CLI application
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { port, example } => {
            println!("Starting planboard API server on port {}...", port);

            let document = if *example {
                println!("Populating with the example plan for UI testing...");
                example_document()
            } else {
                Document::new("Plan")
            };

            let core = Core::new(document);

            let config = ServerConfig {
                address: ([127, 0, 0, 1], *port).into(),
            };

            serve(core, config).await?;
            Ok(())
        }

        Commands::Show { search } => {
            let client = create_client(&cli.server);
            let document = client.document().await?;

            println!("{}", document.title.bold());
            let rows = tree::flatten_visible(&document.rows, search.as_deref());
            if rows.is_empty() {
                println!("  No rows to show. Add some with 'planboard add'");
            } else {
                for (row, depth) in rows {
                    print_row(row, depth);
                }
            }

            Ok(())
        }

        Commands::Add { label, parent, kind } => {
            let client = create_client(&cli.server);
            let parent_id = parent.as_deref().map(RowId::from);

            let outcome = client
                .apply(Command::AddChild {
                    parent: parent_id,
                    kind: (*kind).into(),
                })
                .await?;

            if let Some(reject) = &outcome.rejected {
                return Err(reject.to_string().into());
            }

            // AddChild creates an empty row in an open edit session; commit the
            // label in the same breath so the CLI behaves like a one-shot tool.
            let new_id = outcome
                .created
                .first()
                .cloned()
                .ok_or("server did not report a created row")?;
            client
                .apply(Command::CommitEdit {
                    id: new_id.clone(),
                    label: label.clone(),
                    link_target: None,
                })
                .await?;

            println!("Added {} \"{}\" with id: {}", kind_name(*kind), label, new_id);
            Ok(())
        }

        Commands::Rm { id, yes } => {
            let client = create_client(&cli.server);
            let row_id = RowId::from(id.as_str());

            let pending = match client.request_delete(&row_id).await? {
                Some(pending) => pending,
                None => return Err(format!("no row with id {}", id).into()),
            };

            if !*yes && !confirmed(&pending)? {
                client.cancel_pending().await?;
                println!("Aborted.");
                return Ok(());
            }

            let outcome = client
                .confirm_pending()
                .await?
                .ok_or("confirmation was no longer pending")?;
            if let Some(reject) = &outcome.rejected {
                return Err(reject.to_string().into());
            }

            println!("Deleted {}", id);
            Ok(())
        }

        Commands::Status { id, yes } => {
            let client = create_client(&cli.server);
            let row_id = RowId::from(id.as_str());

            match advance_status(&client, &row_id, *yes).await? {
                StatusChange::Cycled(status) => {
                    println!("{} is now {}", id, paint_status(status))
                }
                StatusChange::Reset => {
                    println!("{} was done; reset to {}", id, paint_status(TaskStatus::New))
                }
                StatusChange::Aborted => println!("Aborted."),
            }
            Ok(())
        }

        Commands::Reset { id, yes } => {
            let client = create_client(&cli.server);
            let row_id = RowId::from(id.as_str());

            if reset_task(&client, &row_id, *yes).await? {
                println!("Reset {} to {}", id, paint_status(TaskStatus::New));
            } else {
                println!("Aborted.");
            }
            Ok(())
        }

        Commands::Mv {
            source,
            target,
            edge,
        } => {
            let client = create_client(&cli.server);

            let outcome = client
                .apply(Command::MoveRow {
                    source: RowId::from(source.as_str()),
                    target: RowId::from(target.as_str()),
                    edge: (*edge).into(),
                })
                .await?;
            if let Some(reject) = &outcome.rejected {
                return Err(reject.to_string().into());
            }

            println!("Moved {} {:?} {}", source, Edge::from(*edge), target);
            Ok(())
        }

        Commands::Search { term } => {
            let client = create_client(&cli.server);

            let hits = client.search(term).await?;
            if hits.is_empty() {
                println!("No rows match \"{}\"", term);
            } else {
                for hit in hits {
                    let indent = "  ".repeat(hit.depth);
                    println!(
                        "{}{} {} ({})",
                        indent,
                        hit.id.to_string().dimmed(),
                        hit.label,
                        hit.kind
                    );
                }
            }
            Ok(())
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, bin_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn create_client(server_url: &str) -> HttpClient {
    let config = ClientConfig {
        base_url: server_url.to_string(),
    };

    HttpClient::with_config(config)
}

#[derive(Debug, PartialEq, Eq)]
enum StatusChange {
    Cycled(TaskStatus),
    Reset,
    Aborted,
}

/// Advances a task's status. Un-completing a done task would silently drop
/// its completion timestamp, so that case goes through the reset confirmation
/// instead of a bare cycle.
async fn advance_status<C: Client + ?Sized>(
    client: &C,
    id: &RowId,
    yes: bool,
) -> Result<StatusChange, Box<dyn std::error::Error>> {
    let document = client.document().await?;
    let done_task = document
        .find(id)
        .map(|row| row.is_task() && row.status.is_done())
        .ok_or_else(|| format!("no row with id {}", id))?;

    if done_task {
        return Ok(if reset_task(client, id, yes).await? {
            StatusChange::Reset
        } else {
            StatusChange::Aborted
        });
    }

    let outcome = client.apply(Command::CycleStatus { id: id.clone() }).await?;
    if let Some(reject) = &outcome.rejected {
        return Err(reject.to_string().into());
    }

    let status = client
        .document()
        .await?
        .find(id)
        .map(|row| row.status)
        .unwrap_or_default();
    Ok(StatusChange::Cycled(status))
}

/// Two-phase reset of a done task. Returns false when the user declines.
async fn reset_task<C: Client + ?Sized>(
    client: &C,
    id: &RowId,
    yes: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let pending = client
        .request_reset(id)
        .await?
        .ok_or_else(|| format!("{} is not a task", id))?;

    if !yes && !confirmed(&pending)? {
        client.cancel_pending().await?;
        return Ok(false);
    }

    let outcome = client
        .confirm_pending()
        .await?
        .ok_or("confirmation was no longer pending")?;
    if let Some(reject) = &outcome.rejected {
        return Err(reject.to_string().into());
    }
    Ok(true)
}

fn confirmed(pending: &Pending) -> io::Result<bool> {
    print!("{} [y/N] ", pending.message());
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn kind_name(kind: KindArg) -> &'static str {
    match kind {
        KindArg::Panel => "panel",
        KindArg::Task => "task",
        KindArg::Text => "text",
        KindArg::Link => "link",
        KindArg::Comment => "comment",
    }
}

/// Prints one flattened row with indentation and a kind-appropriate marker.
fn print_row(row: &Row, depth: usize) {
    let indent = "  ".repeat(depth + 1);

    let marker = match row.kind {
        RowKind::Panel => "#".to_string(),
        RowKind::Task => format!("[{}]", status_glyph(row.status)),
        RowKind::Text => "·".to_string(),
        RowKind::Link => "↗".to_string(),
        RowKind::Comment => "//".to_string(),
    };

    let mut line = format!("{}{} {}", indent, marker, row.label);
    if row.kind == RowKind::Panel {
        let (done, total) = tree::task_counts(row);
        if total > 0 {
            line.push_str(&format!(" ({done}/{total})"));
        }
    }
    if let Some(target) = &row.link_target {
        line.push_str(&format!(" ({})", target));
    }
    line.push_str(&format!("  {}", row.id.to_string().dimmed()));

    if !row.visible {
        println!("{}", line.dimmed());
    } else if row.kind == RowKind::Task {
        println!("{}", colorize_for_status(&line, row.status));
    } else {
        println!("{}", line);
    }
}

fn status_glyph(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::New => " ",
        TaskStatus::InProgress => "~",
        TaskStatus::Attention => "!",
        TaskStatus::Blocked => "x",
        TaskStatus::Done => "✓",
    }
}

fn paint_status(status: TaskStatus) -> String {
    colorize_for_status(&status.to_string(), status)
}

fn colorize_for_status(text: &str, status: TaskStatus) -> String {
    match status {
        TaskStatus::New => text.to_string(),
        TaskStatus::InProgress => text.cyan().to_string(),
        TaskStatus::Attention => text.yellow().to_string(),
        TaskStatus::Blocked => text.red().to_string(),
        TaskStatus::Done => text.green().to_string(),
    }
}
