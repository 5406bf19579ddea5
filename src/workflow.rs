use crate::alternate::AlternateFrameCommentPoster;
use crate::best_of::{BestOfReposter, ReviewQueue};
use crate::bot::{BotOptions, FrameBot};
use crate::catalog::{scan_frames, FrameNaming};
use crate::cli::{InitArgs, MigrateArgs, RunArgs, StatusArgs};
use crate::clock::{Clock, SystemClock};
use crate::config::{
    default_config, load_config, resolve_access_token, validate_config, write_config,
    BestOfSettings, BotConfig,
};
use crate::hooks::LifecycleHook;
use crate::migrate::migrate_legacy;
use crate::paths::{resolve_working_dir, BestOfPaths, WorkingPaths};
use crate::progress::ProgressState;
use crate::social::{GraphClient, SocialClient};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub fn run_run(args: RunArgs) -> Result<()> {
    let (paths, config) = load_working_dir(args.directory.as_deref())?;
    let token = resolve_access_token(&config)?;
    let progress = ProgressState::load(paths.progress_path())?;
    let naming = FrameNaming::new(&config.bot.frames_naming, &config.bot.frames_ext)?;
    let catalog = scan_frames(&config.bot.frames_dir(&paths), &naming, progress.last())?;

    let clock: Rc<dyn Clock> = Rc::new(SystemClock);
    let client: Rc<dyn SocialClient> = Rc::new(
        GraphClient::connect(&config.facebook, token, clock.clone())
            .context("connect to the graph api")?,
    );
    let hooks = build_hooks(&config, &paths, &client, &clock)?;

    let options = BotOptions {
        title: config.bot.title.clone(),
        name: config.bot.name.clone(),
        upload_interval: config.bot.upload_interval(),
        delete_files: config.bot.delete_files,
    };
    let mut bot = FrameBot::new(options, catalog, progress, client, clock);
    for hook in hooks {
        bot.register_hook(hook);
    }
    bot.start()
}

/// Hooks in run order: best-of review first, then alternate comments.
fn build_hooks(
    config: &BotConfig,
    paths: &WorkingPaths,
    client: &Rc<dyn SocialClient>,
    clock: &Rc<dyn Clock>,
) -> Result<Vec<Box<dyn LifecycleHook>>> {
    let mut hooks: Vec<Box<dyn LifecycleHook>> = Vec::new();
    if let Some(settings) = config.best_of_enabled() {
        let best_of = BestOfPaths::new(paths.best_of_dir(&config.bot.title));
        hooks.push(Box::new(BestOfReposter::new(
            settings,
            best_of,
            client.clone(),
            clock.clone(),
        )?));
    }
    if let Some(settings) = config.alternate_frames_enabled() {
        hooks.push(Box::new(AlternateFrameCommentPoster::new(
            settings,
            paths,
            client.clone(),
        )?));
    }
    Ok(hooks)
}

pub fn run_init(args: InitArgs) -> Result<()> {
    let paths = WorkingPaths::new(resolve_working_dir(args.directory.as_deref())?);
    let config_path = paths.config_path();
    if config_path.is_file() && !args.force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            config_path.display()
        ));
    }
    let mut config = default_config();
    if let Some(title) = args.title {
        config.bot.title = title;
    }
    validate_config(&config)?;
    write_config(&paths, &config)?;
    let frames_dir = config.bot.frames_dir(&paths);
    fs::create_dir_all(&frames_dir).with_context(|| format!("create {}", frames_dir.display()))?;
    println!("wrote {}", config_path.display());
    println!("put frames in {}", frames_dir.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct StatusReport {
    working_dir: PathBuf,
    title: String,
    last_published: Option<u64>,
    next_frame: Option<u64>,
    pending_frames: usize,
    total_frames: u64,
    best_of: Option<BestOfStatus>,
}

#[derive(Debug, Serialize)]
struct BestOfStatus {
    queued: usize,
    /// Records already past the cooldown; reviewed on the next run.
    due_now: usize,
    next_frame: Option<u64>,
    next_check_at: Option<DateTime<Utc>>,
}

pub fn run_status(args: StatusArgs) -> Result<()> {
    let (paths, config) = load_working_dir(args.directory.as_deref())?;
    let progress = ProgressState::load(paths.progress_path())?;
    let naming = FrameNaming::new(&config.bot.frames_naming, &config.bot.frames_ext)?;
    let catalog = scan_frames(&config.bot.frames_dir(&paths), &naming, progress.last())?;

    let best_of = config
        .best_of_enabled()
        .map(|settings| best_of_status(&paths, &config.bot.title, settings))
        .transpose()?;
    let report = StatusReport {
        working_dir: paths.root().to_path_buf(),
        title: config.bot.title.clone(),
        last_published: progress.last(),
        next_frame: catalog.frames.first().map(|frame| frame.number),
        pending_frames: catalog.frames.len(),
        total_frames: catalog.total,
        best_of,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("working directory: {}", report.working_dir.display());
    println!("title: {}", report.title);
    match report.last_published {
        Some(last) => println!("last published frame: {last}"),
        None => println!("last published frame: none"),
    }
    println!(
        "frames pending: {} (highest frame number {})",
        report.pending_frames, report.total_frames
    );
    if let Some(best_of) = &report.best_of {
        match (best_of.next_frame, best_of.next_check_at) {
            (Some(frame), Some(at)) => println!(
                "best-of queue: {} ({} due; frame {frame} due for review at {})",
                best_of.queued,
                best_of.due_now,
                at.to_rfc3339()
            ),
            _ => println!("best-of queue: {}", best_of.queued),
        }
    }
    Ok(())
}

fn best_of_status(
    paths: &WorkingPaths,
    title: &str,
    settings: &BestOfSettings,
) -> Result<BestOfStatus> {
    let queue = ReviewQueue::load(BestOfPaths::new(paths.best_of_dir(title)).queue_path())?;
    let cooldown = chrono::Duration::from_std(settings.cooldown())
        .context("best_of.wait_hours out of range")?;
    let now = Utc::now();
    let due_now = queue
        .iter()
        .filter(|frame| {
            frame
                .post_time
                .and_then(|posted| posted.checked_add_signed(cooldown))
                .is_some_and(|due| due <= now)
        })
        .count();
    let head = queue.front();
    Ok(BestOfStatus {
        queued: queue.len(),
        due_now,
        next_frame: head.map(|frame| frame.number),
        next_check_at: head
            .and_then(|frame| frame.post_time)
            .and_then(|posted| posted.checked_add_signed(cooldown)),
    })
}

pub fn run_migrate(args: MigrateArgs) -> Result<()> {
    let (paths, config) = load_working_dir(Some(args.directory.as_path()))?;
    let report = migrate_legacy(&args.legacy, &paths, &config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("queued {} frames for best-of review", report.queued);
    if report.missing_frames > 0 {
        println!(
            "{} queued frames had no held file and will be retired unchecked",
            report.missing_frames
        );
    }
    println!("copied {} archived best-of files", report.album_files);
    if report.frames_copied > 0 {
        println!("copied {} frames into the working directory", report.frames_copied);
    }
    if report.progress_copied {
        println!("copied the legacy progress file");
    }
    if let Some(backup) = &report.backup {
        println!("legacy files backed up to {}", backup.display());
    }
    Ok(())
}

fn load_working_dir(explicit: Option<&Path>) -> Result<(WorkingPaths, BotConfig)> {
    let paths = WorkingPaths::new(resolve_working_dir(explicit)?);
    let config = load_config(&paths)?;
    validate_config(&config).with_context(|| format!("invalid {}", paths.config_path().display()))?;
    Ok((paths, config))
}
