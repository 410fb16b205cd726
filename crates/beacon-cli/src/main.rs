//! `beacon`: command-line client for the notification feed

use anyhow::{Context, Result};
use beacon_core::{
    BeaconConfig, BeaconError, ConnectionStatus, FeedView, NotificationFeed, NotificationHub, StaticToken,
};
use chrono::{DateTime, Utc};
use beacon_model::{NotificationId, NotificationItem};
use beacon_store::{FileStorage, SnapshotStore};
use beacon_transport::WsConnector;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("beacon")
        .version(beacon_core::VERSION)
        .about("Live CRM notification feed")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory holding the notification snapshot"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("watch")
                .about("Connect and print notifications as they arrive")
                .arg(
                    Arg::new("token")
                        .long("token")
                        .env("BEACON_TOKEN")
                        .help("Auth token for the push endpoint"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("Print stored notifications")
                .arg(
                    Arg::new("unread")
                        .long("unread")
                        .action(ArgAction::SetTrue)
                        .help("Only unread notifications"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("mark-read")
                .about("Mark one notification read")
                .arg(
                    Arg::new("id")
                        .required(true)
                        .value_parser(value_parser!(i64))
                        .help("Notification id"),
                ),
        )
        .subcommand(Command::new("mark-all-read").about("Mark every notification read"))
        .subcommand(Command::new("clear").about("Remove every stored notification"))
        .subcommand(
            Command::new("status").about("Show snapshot summary").arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Output as JSON"),
            ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(matches: &ArgMatches) -> Result<BeaconConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => BeaconConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => BeaconConfig::default(),
    }
    .with_env_overrides();

    if let Some(dir) = matches.get_one::<PathBuf>("data-dir") {
        config.data_dir = Some(dir.clone());
    }
    config.validate()?;
    Ok(config)
}

fn open_store(config: &BeaconConfig) -> SnapshotStore {
    let storage = FileStorage::new(config.resolved_data_dir());
    SnapshotStore::new(Arc::new(storage), config.storage_key.clone())
}

fn render(item: &NotificationItem) -> String {
    let marker = if item.is_read { ' ' } else { '*' };
    let mut line = format!(
        "{marker} #{:<6} {}  [{}/{}]  {}",
        item.id,
        item.created_at.format("%Y-%m-%d %H:%M"),
        item.kind.as_str(),
        item.priority.as_str(),
        item.title
    );
    if let Some(message) = &item.message {
        line.push_str(" - ");
        line.push_str(message);
    }
    line
}

/// Fail when the hub could not find a token to connect with
fn ensure_authenticated(view: &FeedView) -> Result<(), BeaconError> {
    if view.status == ConnectionStatus::AuthRequired {
        return Err(BeaconError::AuthenticationRequired);
    }
    Ok(())
}

fn render_status(view: &FeedView) -> String {
    let mut line = format!("{}  {} unread", view.status, view.unread_count);
    if let Some(error) = &view.last_error {
        line.push_str("  (");
        line.push_str(error);
        line.push(')');
    }
    line
}

async fn watch(config: BeaconConfig, args: &ArgMatches) -> Result<()> {
    let token = args.get_one::<String>("token").cloned().or_else(|| config.token.clone());
    let storage = Arc::new(FileStorage::new(config.resolved_data_dir()));
    let hub = NotificationHub::mount(&config, storage, Arc::new(WsConnector), &StaticToken::from(token));

    let mut views = hub.subscribe();
    let mut last = views.borrow_and_update().clone();
    println!("{}", render_status(&last));
    for item in last.notifications.iter().rev() {
        println!("{}", render(item));
    }

    if let Err(e) = ensure_authenticated(&last) {
        hub.unmount();
        return Err(e).context("set BEACON_TOKEN or pass --token");
    }

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if view.status != last.status || view.last_error != last.last_error {
                    println!("{}", render_status(&view));
                }
                for item in view.notifications.iter().rev() {
                    if !last.notifications.contains(item) {
                        println!("{}", render(item));
                    }
                }
                last = view;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    hub.unmount();
    Ok(())
}

fn list(store: &SnapshotStore, args: &ArgMatches) -> Result<()> {
    let snapshot = store.load();
    let unread_only = args.get_flag("unread");
    let items: Vec<&NotificationItem> = snapshot
        .notifications
        .iter()
        .filter(|item| !unread_only || !item.is_read)
        .collect();

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("No notifications");
    } else {
        for item in items {
            println!("{}", render(item));
        }
    }
    Ok(())
}

/// Apply `change` to the stored feed and write it back, reporting failures
fn update(store: &SnapshotStore, change: impl FnOnce(&mut NotificationFeed) -> usize) -> Result<usize> {
    let mut feed = NotificationFeed::from_items(store.load().notifications);
    let changed = change(&mut feed);
    if changed > 0 {
        store
            .try_save(feed.items())
            .map_err(BeaconError::from)
            .with_context(|| format!("saving snapshot {}", store.key()))?;
    }
    Ok(changed)
}

/// Mark one stored notification read; `Ok(false)` if it already was
fn mark_read(store: &SnapshotStore, id: NotificationId, now: DateTime<Utc>) -> Result<bool> {
    let mut stored = false;
    let changed = update(store, |feed| {
        stored = feed.get(id).is_some();
        usize::from(feed.mark_as_read(id, now))
    })?;
    if !stored {
        return Err(BeaconError::NotFound(id.0).into());
    }
    Ok(changed > 0)
}

fn status(store: &SnapshotStore, args: &ArgMatches) -> Result<()> {
    let snapshot = store.load();
    if args.get_flag("json") {
        let summary = serde_json::json!({
            "key": store.key(),
            "count": snapshot.notifications.len(),
            "unreadCount": snapshot.unread_count,
            "lastSyncedAt": snapshot.last_synced_at,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Key: {}", store.key());
        println!("Notifications: {}", snapshot.notifications.len());
        println!("Unread: {}", snapshot.unread_count);
        match snapshot.last_synced_at {
            Some(at) => println!("Last synced: {}", at.to_rfc3339()),
            None => println!("Last synced: never"),
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    let config = load_config(&matches)?;
    let store = open_store(&config);
    let now = Utc::now();

    match matches.subcommand() {
        Some(("watch", args)) => watch(config, args).await?,
        Some(("list", args)) => list(&store, args)?,
        Some(("mark-read", args)) => {
            let id = args.get_one::<i64>("id").copied().context("missing id")?;
            if mark_read(&store, NotificationId(id), now)? {
                println!("Marked {id} read");
            } else {
                println!("Notification {id} is already read");
            }
        }
        Some(("mark-all-read", _)) => {
            let flipped = update(&store, |feed| feed.mark_all_as_read(now))?;
            println!("Marked {flipped} read");
        }
        Some(("clear", _)) => {
            let dropped = update(&store, NotificationFeed::clear)?;
            if dropped == 0 {
                // still write an empty snapshot so a corrupt one is replaced
                store
                    .try_save(&[])
                    .map_err(BeaconError::from)
                    .context("clearing snapshot")?;
            }
            println!("Removed {dropped} notifications");
        }
        Some(("status", args)) => status(&store, args)?,
        _ => unreachable!("subcommand_required"),
    }
    Ok(())
}
