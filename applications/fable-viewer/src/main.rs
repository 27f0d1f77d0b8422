/// Fable Viewer - command-line story player
use clap::{Parser, Subcommand};
use fable_core::{Language, ProgressStore, StoryId};
use fable_viewer::{
    run_story, JsonProgressStore, StoryBundle, ViewerCommand, ViewerConfig, ViewerOptions,
};
use std::{path::PathBuf, time::Duration};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fable-viewer")]
#[command(about = "Play narrated picture-book stories on a simulated device", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "FABLE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a story bundle
    Play {
        /// Story bundle (JSON)
        story: PathBuf,
        /// Start from the first page, ignoring saved progress
        #[arg(long)]
        restart: bool,
        /// Narration language (ko or en)
        #[arg(long, value_parser = parse_language)]
        language: Option<Language>,
        /// Tap once on open (unlocks audio on gesture-gated devices)
        #[arg(long)]
        tap: bool,
        /// Read commands from stdin (next, prev, pause, lang, toggle bgm, ...)
        #[arg(short, long)]
        interactive: bool,
        /// Give up after this many seconds
        #[arg(long)]
        max_seconds: Option<u64>,
    },
    /// Print a story bundle summary
    Inspect {
        /// Story bundle (JSON)
        story: PathBuf,
    },
    /// Show saved progress for a story
    Progress {
        /// Story id
        story_id: String,
    },
}

fn parse_language(s: &str) -> Result<Language, String> {
    Language::from_str(s).ok_or_else(|| format!("unsupported language: {s} (use ko or en)"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fable_viewer=info,fable_playback=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = ViewerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Play {
            story,
            restart,
            language,
            tap,
            interactive,
            max_seconds,
        } => {
            let options = ViewerOptions {
                restart,
                language,
                tap_on_start: tap,
                max_duration: max_seconds.map(Duration::from_secs),
            };
            play(&story, &config, options, interactive).await?;
        }
        Commands::Inspect { story } => {
            inspect(&story)?;
        }
        Commands::Progress { story_id } => {
            show_progress(&config, &story_id)?;
        }
    }

    Ok(())
}

async fn play(
    path: &std::path::Path,
    config: &ViewerConfig,
    options: ViewerOptions,
    interactive: bool,
) -> anyhow::Result<()> {
    let bundle = StoryBundle::load(path)?;

    let commands = if interactive {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ViewerCommand>() {
                    Ok(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{e}"),
                }
            }
        });
        Some(rx)
    } else {
        None
    };

    let report = run_story(&bundle, config, options, commands).await?;

    println!("Story:   {}", bundle.story.id);
    println!("Exit:    {:?}", report.exit);
    println!(
        "Pages:   {}",
        report
            .pages_visited
            .iter()
            .map(|page| (page + 1).to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    println!(
        "Final:   page {} of {} ({}%)",
        report.final_snapshot.page + 1,
        report.final_snapshot.page_count,
        report.final_snapshot.progress_percent
    );

    Ok(())
}

fn inspect(path: &std::path::Path) -> anyhow::Result<()> {
    let bundle = StoryBundle::load(path)?;
    let title = bundle
        .story
        .title
        .get(Language::Ko)
        .or_else(|| bundle.story.title.get(Language::En))
        .cloned()
        .unwrap_or_default();

    println!("{} - {}", bundle.story.id, title);
    println!(
        "{} pages, {} narrated sentences, music: {}",
        bundle.pages.len(),
        bundle.narrated_sentences(),
        bundle
            .story
            .bgm
            .as_ref()
            .map_or_else(|| "none".to_string(), ToString::to_string)
    );

    for page in &bundle.pages {
        let media = if page.video().is_some() { "video" } else { "image" };
        let mode = if page.has_sentence_audio(Language::Ko) {
            "sentences"
        } else if page.legacy_audio(Language::Ko).is_some() {
            "page narration"
        } else {
            "silent"
        };
        println!(
            "  page {:>2}: {} sentence(s), {}, {}",
            page.index + 1,
            page.sentences.len(),
            media,
            mode
        );
    }

    Ok(())
}

fn show_progress(config: &ViewerConfig, story_id: &str) -> anyhow::Result<()> {
    let store = JsonProgressStore::new(&config.storage.progress_path);
    match store.read_progress(&StoryId::new(story_id))? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("No saved progress for {story_id}"),
    }
    Ok(())
}
