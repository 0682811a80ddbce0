use std::path::{Path, PathBuf};
use std::{fs, process};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::style;

use sitesync_terminal::{
    cinematic::script::CinematicScript,
    config::PlayerConfig,
    game::story::Story,
    logging,
    player::{to_content_style, Player, Screen},
    renderer::Renderer,
    sprites::{SpriteRenderer, SpriteTable},
};

#[derive(Parser)]
#[command(name = "sitesync-terminal")]
#[command(about = "SiteSync terminal: the cinematic and the pixel-art story")]
struct Cli {
    /// Player config (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log file (defaults to the temp dir)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launcher screen with the terminal button
    Launch,
    /// Open the overlay and play the cinematic
    Cinematic {
        #[arg(long)]
        script: Option<PathBuf>,
    },
    /// Play the pixel-art story
    Game {
        #[arg(long)]
        story: Option<PathBuf>,
    },
    /// Print one sprite with true colours
    Sprite {
        name: String,
        #[arg(long, default_value_t = 0)]
        frame: usize,
    },
    /// List sprites with their sizes and frame counts
    Sprites,
    /// Validate the sprite table and the scripts
    Check {
        #[arg(long)]
        script: Option<PathBuf>,
        #[arg(long)]
        story: Option<PathBuf>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(PlayerConfig::default_path);
    let loaded = config_path.as_deref().map(PlayerConfig::try_load);

    let log_path = cli
        .log_file
        .clone()
        .or_else(|| match &loaded {
            Some(Ok(Some(config))) => config.log_file.clone(),
            _ => None,
        })
        .unwrap_or_else(logging::default_log_path);
    logging::init(&log_path)?;

    let config = loaded.map(PlayerConfig::or_defaults).unwrap_or_default();

    match cli.command.unwrap_or(Commands::Launch) {
        Commands::Launch => play(config, None, None, Screen::Launcher),
        Commands::Cinematic { script } => play(config, script.as_deref(), None, Screen::Cinematic),
        Commands::Game { story } => play(config, None, story.as_deref(), Screen::Game),
        Commands::Sprite { name, frame } => print_sprite(&name, frame),
        Commands::Sprites => {
            list_sprites();
            Ok(())
        }
        Commands::Check { script, story } => check(script.as_deref(), story.as_deref()),
    }
}

fn load_script(path: Option<&Path>) -> Result<CinematicScript> {
    match path {
        Some(path) => {
            let json =
                fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            CinematicScript::from_json(&json)
                .with_context(|| format!("Failed to parse {}", path.display()))
        }
        None => CinematicScript::builtin().context("Built-in cinematic is invalid"),
    }
}

fn load_story(path: Option<&Path>) -> Result<Story> {
    match path {
        Some(path) => {
            let json =
                fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            Story::from_json(&json).with_context(|| format!("Failed to parse {}", path.display()))
        }
        None => Story::builtin().context("Built-in story is invalid"),
    }
}

fn play(
    config: PlayerConfig,
    script: Option<&Path>,
    story: Option<&Path>,
    screen: Screen,
) -> Result<()> {
    let script = load_script(script)?;
    let story = load_story(story)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start runtime")?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async move {
        let mut player = Player::new(config, script, story);
        player.open(screen);
        player.play().await
    })
}

fn print_sprite(name: &str, frame: usize) -> Result<()> {
    let visual = SpriteRenderer::builtin().render(name, frame)?;
    for row in Renderer::sprite_cells(&visual) {
        let mut line = String::new();
        for cell in row {
            match cell {
                Some(cell) => line.push_str(
                    &style::StyledContent::new(to_content_style(&cell.style), cell.ch).to_string(),
                ),
                None => line.push(' '),
            }
        }
        println!("{line}");
    }
    Ok(())
}

fn list_sprites() {
    let table = SpriteTable::builtin();
    for name in table.names() {
        if let Ok(sprite) = table.get(name) {
            println!(
                "{name:<20} {:>2}x{:<2} scale {} frames {}",
                sprite.width,
                sprite.height,
                sprite.scale,
                sprite.frame_count()
            );
        }
    }
}

fn check(script: Option<&Path>, story: Option<&Path>) -> Result<()> {
    let table = SpriteTable::builtin();
    if table.sprites.is_empty() {
        bail!("Sprite table is empty or failed to load");
    }
    table.validate()?;

    let script = load_script(script)?;
    let story = load_story(story)?;
    story.validate(table)?;

    eprintln!(
        "OK: {} sprites, {} cinematic lines, {} game scenes",
        table.sprites.len(),
        script.line_count(),
        story.scenes.len()
    );
    Ok(())
}
