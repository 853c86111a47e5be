use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use portfolio_stage_core::{
    view::menu_entry, AnimatedFieldRenderer, AppConfig, Catalog, DrawSurface, EventLoop,
    HeroAction, MenuOutcome, PassThrough, PixmapSurface, PortfolioError, RecordingSurface, Screen,
    Theme, ThemeSignal, Translate, ViewId, ViewOrchestrator, Viewport, MENU_ENTRIES,
};
use tracing_subscriber::EnvFilter;

fn main() -> portfolio_stage_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            catalog,
            actions,
        } => run_simulate(config, catalog, &actions),
        Commands::Render(args) => run_render(args),
    }
}

fn load_config(path: Option<PathBuf>) -> portfolio_stage_core::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

fn run_simulate(
    config: Option<PathBuf>,
    catalog: Option<PathBuf>,
    actions: &[SessionAction],
) -> portfolio_stage_core::Result<()> {
    let config = load_config(config)?;
    let translator: Box<dyn Translate> = match catalog {
        Some(path) => Box::new(Catalog::load(path)?),
        None => Box::new(PassThrough),
    };

    let event_loop = EventLoop::new(config.viewport);
    let mut orchestrator =
        ViewOrchestrator::mount(&event_loop.handle(), config.orchestrator.clone());
    tracing::info!(screen = ?orchestrator.screen(), "session started");

    for action in actions {
        match *action {
            SessionAction::Wait(delay) => event_loop.advance(delay),
            SessionAction::Settle => {
                event_loop.advance(config.orchestrator.loading_delay());
                while !orchestrator.is_settled() {
                    event_loop.advance(Duration::from_millis(16));
                }
            }
            SessionAction::Load => orchestrator.complete_loading(),
            SessionAction::Menu => orchestrator.toggle_menu(),
            SessionAction::Home => orchestrator.go_home(),
            SessionAction::Go(view) => orchestrator.navigate(view),
            SessionAction::Hero(hero) => {
                tracing::info!(
                    label = %translator.t(hero.label_key()),
                    target = %hero.target(),
                    "hero call to action"
                );
                orchestrator.hero_action(hero);
            }
            SessionAction::DownloadCv => {
                if let Some(entry) = menu_entry("download-cv") {
                    if let MenuOutcome::OpenExternal(href) = orchestrator.select_menu_entry(entry) {
                        tracing::info!(href, "open external document");
                    }
                }
            }
        }
        report(&orchestrator, action, translator.as_ref());
    }

    orchestrator.teardown();
    Ok(())
}

fn report(orchestrator: &ViewOrchestrator, action: &SessionAction, translator: &dyn Translate) {
    let screen = orchestrator.screen();
    let layers: Vec<String> = orchestrator
        .layers()
        .iter()
        .map(|layer| format!("{}@{:.2}", layer.key, layer.opacity))
        .collect();
    tracing::info!(?action, ?screen, ?layers, "screen");

    if let Screen::Menu { active } = screen {
        for entry in MENU_ENTRIES.iter() {
            tracing::info!(
                id = entry.id,
                label = %translator.t(entry.label_key),
                subtitle = %translator.t(entry.subtitle_key),
                active = entry.is_active(active),
                "menu entry"
            );
        }
    }
}

fn run_render(args: RenderArgs) -> portfolio_stage_core::Result<()> {
    let mut config = load_config(args.config.clone())?;
    if let Some(width) = args.width {
        config.viewport.width = width;
    }
    if let Some(height) = args.height {
        config.viewport.height = height;
    }
    tracing::info!(viewport = ?config.viewport, frames = args.frames, "rendering field");

    if args.dry_run {
        let surface = RecordingSurface::new(config.viewport);
        render_frames(&config, &args, surface, |_, _| Ok(()))
    } else {
        std::fs::create_dir_all(&args.out)?;
        let surface = PixmapSurface::new(config.viewport)?;
        let out = args.out.clone();
        render_frames(&config, &args, surface, move |index, surface: &PixmapSurface| {
            surface.save_png(out.join(format!("frame-{index:04}.png")))
        })
    }
}

fn render_frames<S, F>(
    config: &AppConfig,
    args: &RenderArgs,
    surface: S,
    mut emit: F,
) -> portfolio_stage_core::Result<()>
where
    S: DrawSurface + 'static,
    F: FnMut(u64, &S) -> portfolio_stage_core::Result<()>,
{
    let theme = ThemeSignal::new(args.theme.into());
    let event_loop = EventLoop::new(config.viewport);
    let renderer = AnimatedFieldRenderer::mount(
        &event_loop.handle(),
        Some(surface),
        config.wave,
        theme.reader(),
    )
    .ok_or_else(|| PortfolioError::msg("animated field could not be mounted"))?;

    for index in 0..args.frames {
        if index > 0 {
            if args.resize_at == Some(index) {
                let resized = Viewport::new(
                    args.resize_width.unwrap_or(config.viewport.width),
                    args.resize_height.unwrap_or(config.viewport.height),
                );
                event_loop.resize(resized);
            }
            if args.toggle_theme_at == Some(index) {
                theme.toggle();
            }
            event_loop.advance(FRAME_INTERVAL);
            event_loop.tick_frame();
        }

        if let Some(stats) = renderer.last_frame() {
            tracing::info!(
                index = stats.index,
                cols = stats.grid.cols,
                rows = stats.grid.rows,
                dots = stats.dots_drawn,
                bounds = ?stats.bounds,
                "frame"
            );
        }
        renderer.with_surface(|surface| emit(index, surface))?;
    }

    renderer.unmount();
    Ok(())
}

const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Headless driver for the portfolio page core",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scripted session through the view orchestrator.
    Simulate {
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// JSON string table used to label menu entries.
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Steps: settle, load, wait:<ms>, menu, logo, cv, hero:services,
        /// hero:contact or a view name (home, about, projects, skills, contact).
        actions: Vec<SessionAction>,
    },
    /// Render frames of the animated dot field.
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Number of frames to draw.
    #[arg(short, long, default_value_t = 60)]
    frames: u64,
    /// Viewport width, overriding the configuration.
    #[arg(long)]
    width: Option<u32>,
    /// Viewport height, overriding the configuration.
    #[arg(long)]
    height: Option<u32>,
    #[arg(long, value_enum, default_value_t = ThemeArg::Light)]
    theme: ThemeArg,
    /// Frame index at which the viewport is resized.
    #[arg(long)]
    resize_at: Option<u64>,
    #[arg(long)]
    resize_width: Option<u32>,
    #[arg(long)]
    resize_height: Option<u32>,
    /// Frame index at which the theme is flipped.
    #[arg(long)]
    toggle_theme_at: Option<u64>,
    /// Directory receiving `frame-NNNN.png` files.
    #[arg(short, long, default_value = "frames")]
    out: PathBuf,
    /// Only log frame statistics, write no files.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionAction {
    /// Let the splash finish and every transition settle.
    Settle,
    Wait(Duration),
    Load,
    Menu,
    Home,
    DownloadCv,
    Hero(HeroAction),
    Go(ViewId),
}

impl FromStr for SessionAction {
    type Err = PortfolioError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "settle" => return Ok(SessionAction::Settle),
            "load" => return Ok(SessionAction::Load),
            "menu" => return Ok(SessionAction::Menu),
            "logo" => return Ok(SessionAction::Home),
            "cv" => return Ok(SessionAction::DownloadCv),
            "hero:services" => return Ok(SessionAction::Hero(HeroAction::Services)),
            "hero:contact" => return Ok(SessionAction::Hero(HeroAction::Contact)),
            _ => {}
        }

        if let Some(millis) = value.strip_prefix("wait:") {
            let millis = millis
                .parse::<u64>()
                .map_err(|err| PortfolioError::msg(format!("invalid wait `{value}`: {err}")))?;
            return Ok(SessionAction::Wait(Duration::from_millis(millis)));
        }

        value.parse::<ViewId>().map(SessionAction::Go)
    }
}
