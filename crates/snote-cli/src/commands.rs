use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use snote_gc::GarbageCollector;
use snote_index::{ListSynthesizer, TagIndex};
use snote_refs::{MarkdownExtractor, ReferenceExtractor};
use snote_server::{SnoteConfig, SnoteServer};
use snote_store::{BlobStore, DiskStorage, NoteStore};
use snote_types::{BlobId, Note};
use tracing::{debug, info, warn};

use crate::cli::{Cli, Command, FsckArgs, GcArgs, LsArgs, OutputFormat, ServeArgs};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Command::Serve(args) => cmd_serve(config, args).await,
        Command::Gc(args) => cmd_gc(&open_store(&config).await?, args, &cli.format).await,
        Command::Ls(args) => cmd_ls(open_store(&config).await?, args, &cli.format).await,
        Command::Fsck(FsckArgs {}) => cmd_fsck(open_store(&config).await?.as_ref()).await,
        Command::Config(_) => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

/// Configuration file (if any) with command-line overrides applied.
fn load_config(cli: &Cli) -> anyhow::Result<SnoteConfig> {
    let mut config = match &cli.config {
        Some(path) => SnoteConfig::load(path)?,
        None => SnoteConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.storage_root = root.clone();
    }
    if let Command::Serve(ServeArgs { bind: Some(bind), .. }) = &cli.command {
        config.bind_addr = *bind;
    }
    Ok(config)
}

async fn open_store(config: &SnoteConfig) -> anyhow::Result<Arc<DiskStorage>> {
    let store = DiskStorage::open(&config.storage_root)
        .await
        .with_context(|| format!("cannot open store at {}", config.storage_root.display()))?;
    Ok(Arc::new(store))
}

async fn cmd_serve(mut config: SnoteConfig, args: ServeArgs) -> anyhow::Result<()> {
    if args.no_gc {
        config.gc.enabled = false;
    }
    println!(
        "{} snote on {} (root: {})",
        "▶".green().bold(),
        config.bind_addr.to_string().bold(),
        config.storage_root.display()
    );
    SnoteServer::open(config).await?.serve().await?;
    Ok(())
}

async fn cmd_gc(store: &Arc<DiskStorage>, args: GcArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let gc = GarbageCollector::new(store.clone(), store.clone(), Arc::new(MarkdownExtractor));
    if args.dry_run {
        let plan = gc.plan().await?;
        info!(
            notes = plan.notes_scanned,
            unreferenced = plan.unreferenced.len(),
            "gc: dry run planned"
        );
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
            OutputFormat::Text => {
                println!(
                    "{} notes, {} referenced blobs, {} stored blobs",
                    plan.notes_scanned,
                    plan.referenced.len(),
                    plan.stored
                );
                for id in &plan.unreferenced {
                    println!("  {} {}", "would delete".yellow(), id);
                }
                println!("{} {} blobs would be removed.", "✓".green(), plan.unreferenced.len());
            }
        }
        return Ok(());
    }

    let report = gc.run_pass().await?;
    info!(deleted = report.deleted.len(), "gc: manual pass finished");
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            for id in &report.deleted {
                println!("  {} {}", "deleted".red(), id);
            }
            println!("{} GC: {} blobs removed.", "✓".green(), report.deleted.len());
        }
    }
    Ok(())
}

async fn cmd_ls(store: Arc<DiskStorage>, args: LsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    if args.markdown {
        let synth = ListSynthesizer::new(store);
        let note = if args.tags {
            synth.all_tags().await?
        } else {
            synth.all_notes().await?
        };
        print!("{}", note.contents);
        return Ok(());
    }

    if args.tags {
        let index = TagIndex::build(store.as_ref()).await?;
        if index.is_empty() {
            println!("No tags.");
        }
        for (tag, ids) in index.iter() {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            println!("{} {}", tag.cyan().bold(), ids.join(", "));
        }
        return Ok(());
    }

    let mut notes = load_notes(store.as_ref()).await?;
    if let Some(tag) = &args.tag {
        retain_tagged(&mut notes, tag);
        debug!(tag = %tag, matched = notes.len(), "ls: filtered by tag");
    }
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&notes)?),
        OutputFormat::Text => {
            if notes.is_empty() {
                println!("No notes.");
            }
            for note in &notes {
                let visibility = if note.is_public {
                    "public".green()
                } else {
                    "private".dimmed()
                };
                println!(
                    "{:<24} {:>8}B  {}  {}  {}",
                    note.id.yellow(),
                    note.content_size(),
                    note.last_edit.format("%Y-%m-%d %H:%M"),
                    visibility,
                    note.title
                );
            }
        }
    }
    Ok(())
}

fn retain_tagged(notes: &mut Vec<Note>, tag: &str) {
    let index = TagIndex::from_notes(notes.iter());
    let tagged = index.notes_with(tag).cloned().unwrap_or_default();
    notes.retain(|note| tagged.contains(&note.id));
}

async fn load_notes(store: &dyn NoteStore) -> anyhow::Result<Vec<Note>> {
    debug!("loading all notes");
    let mut notes = Vec::new();
    for id in store.list_note_ids().await? {
        notes.push(store.load_note(&id).await?);
    }
    Ok(notes)
}

/// Problems found by [`fsck`].
#[derive(Debug, Default)]
struct FsckReport {
    notes: usize,
    blobs: usize,
    bytes: u64,
    broken_notes: Vec<(String, String)>,
    broken_blobs: Vec<(BlobId, String)>,
    dangling: Vec<(String, BlobId)>,
}

impl FsckReport {
    fn is_clean(&self) -> bool {
        self.broken_notes.is_empty() && self.broken_blobs.is_empty()
    }
}

async fn fsck(store: &DiskStorage) -> anyhow::Result<FsckReport> {
    let mut report = FsckReport::default();
    let blob_ids = store.list_blob_ids().await?;

    for id in store.list_note_ids().await? {
        report.notes += 1;
        let note = match store.load_note(&id).await {
            Ok(note) => note,
            Err(e) => {
                report.broken_notes.push((id, e.to_string()));
                continue;
            }
        };
        match MarkdownExtractor.blob_ids(&note.contents) {
            Ok(refs) => report.dangling.extend(
                refs.into_iter()
                    .filter(|blob| !blob_ids.contains(blob))
                    .map(|blob| (id.clone(), blob)),
            ),
            Err(e) => report.broken_notes.push((id, e.to_string())),
        }
    }

    for id in blob_ids {
        report.blobs += 1;
        match store.verify_blob(&id).await {
            Ok(size) => report.bytes += size,
            Err(e) => report.broken_blobs.push((id, e.to_string())),
        }
    }
    Ok(report)
}

async fn cmd_fsck(store: &DiskStorage) -> anyhow::Result<()> {
    let report = fsck(store).await?;
    if !report.dangling.is_empty() {
        warn!(count = report.dangling.len(), "fsck: notes link missing blobs");
    }
    for (id, reason) in &report.broken_notes {
        println!("{} note {}: {}", "✗".red().bold(), id.yellow(), reason);
    }
    for (id, reason) in &report.broken_blobs {
        println!("{} blob {}: {}", "✗".red().bold(), id.short(), reason);
    }
    for (note, blob) in &report.dangling {
        println!("{} note {} links missing blob {}", "!".yellow(), note.yellow(), blob.short());
    }
    println!(
        "{} notes, {} blobs ({} bytes) checked",
        report.notes, report.blobs, report.bytes
    );
    if !report.is_clean() {
        bail!(
            "{} broken notes, {} broken blobs",
            report.broken_notes.len(),
            report.broken_blobs.len()
        );
    }
    println!("{} No issues.", "✓".green().bold());
    Ok(())
}
