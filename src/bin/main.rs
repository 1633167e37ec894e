#[macro_use]
extern crate log;

use std::path::PathBuf;

use chatlist::event::read_script;
use chatlist::helper::{MemoryStore, RecordingRows};
use chatlist::prelude::*;
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};

/// chatlist - windowed dialog list demo
///
/// Fills an in-memory store with synthetic dialogs, shows the default filter, pages it
/// down to the end, applies a script of events and prints the visible window.
#[derive(Parser, Debug)]
#[command(name = "chatlist", version, about, verbatim_doc_comment)]
struct Cli {
    /// Number of synthetic dialogs
    #[arg(long, default_value_t = 100)]
    dialogs: u32,

    /// Every n-th dialog goes to the archive (0 disables)
    #[arg(long, default_value_t = 7)]
    archive_every: u32,

    /// RON file holding a list of events to apply, e.g. `[ItemUpserted(3), StateCleared]`
    #[arg(long)]
    script: Option<PathBuf>,

    /// Filter whose window is printed (defaults to the active one)
    #[arg(long)]
    print: Option<FilterId>,

    #[command(flatten)]
    options: ChatListOptions,
}

fn synthetic_store(count: u32, archive_every: u32) -> MemoryStore {
    MemoryStore::with_dialogs((1..=count).map(|i| {
        let mut summary = DialogSummary::new(DialogId(i64::from(i)), OrderKey(u64::from(i) * 60));
        summary.unread_count = i % 4;
        summary.muted = i % 5 == 0;
        if archive_every != 0 && i % archive_every == 0 {
            summary.filter_membership.push(FilterId::ARCHIVE);
        }
        summary
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::builder().format_timestamp_nanos().init();

    let cli = Cli::parse();
    let options = cli.options.build();
    debug!("options: {:?}", options);

    let store = synthetic_store(cli.dialogs, cli.archive_every);
    let rows = RecordingRows::new();
    let list = ChatList::new(options, Collaborators::from_store(Arc::new(store.clone()), Arc::new(rows.clone())));
    list.add_filter(FilterSpec::new(FilterId::ARCHIVE, "Archive")).await;

    let bus = EventBus::new();
    list.start(&bus);

    let default = list.options().default_filter;
    let activation = list.set_active_filter(default).await?;
    info!("filter {} active, first page cached: {}", default, activation.cached);
    while let LoadOutcome::Loaded { .. } = list.load_more(Edge::Bottom).await? {}

    if let Some(path) = &cli.script {
        let events = read_script(path).wrap_err_with(|| format!("loading {}", path.display()))?;
        for event in events {
            list.handle_event(event).await;
        }
    }

    let shown = cli.print.or(list.active_filter()).unwrap_or(default);
    let window = list.window_state(shown);
    println!("filter {shown}: {:?}", window);
    for id in list.visible_ids(shown) {
        println!("{id}");
    }
    if let Some(derived) = list.recompute_derived() {
        println!("{:?}", derived);
    }

    list.dispose();
    Ok(())
}
