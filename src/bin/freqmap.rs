use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use freqmap::playback::{DEFAULT_TICK, next_hour_index};
use freqmap::prefs::{FilePreferences, PreferenceStore};
use freqmap::remote::RemoteSurface;
use freqmap::surface::{MapSurface, RecordingSurface};
use freqmap::{ColorMode, DataCatalog, Event, LaunchOptions, MapCommand, MapMode, Session};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(
    name = "freqmap",
    version,
    about = "Plan, replay & play Lisbon transit frequency map layers"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Catalog JSON file (defaults to the built-in Lisbon catalog).
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    /// Preferences file (defaults to <config dir>/freqmap/preferences.json).
    #[arg(long, global = true)]
    prefs: Option<PathBuf>,
    /// Launch query string, e.g. "?date=20250326&map=lines".
    #[arg(long, global = true, default_value = "")]
    query: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the catalog as JSON.
    Catalog,
    /// Print the layers mounted at session start.
    Plan,
    /// Apply a scripted sequence of steps and print the emitted commands.
    ///
    /// Steps: date:<id> hour:<index> on:<op> off:<op> ops:<a,b,...>
    /// mode:<lines|parishes> tick color:<dark|light> detail:<on|off>
    Replay {
        #[arg(required = true)]
        steps: Vec<String>,
    },
    /// Advance the hour on a timer.
    Play(PlayArgs),
}

#[derive(Args, Debug)]
struct PlayArgs {
    /// Number of hour changes before stopping.
    #[arg(long, default_value_t = 3)]
    ticks: usize,
    /// Milliseconds between hour changes.
    #[arg(long, default_value_t = DEFAULT_TICK.as_millis() as u64)]
    tick_ms: u64,
    /// Fetch every mounted layer from the data host.
    #[arg(long, default_value_t = false)]
    fetch: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let catalog = Arc::new(load_catalog(&cli.common)?);
    match cli.cmd {
        Command::Catalog => {
            println!("{}", serde_json::to_string_pretty(catalog.as_ref())?);
            Ok(())
        }
        Command::Plan => cmd_plan(&cli.common, catalog),
        Command::Replay { steps } => cmd_replay(&cli.common, catalog, &steps),
        Command::Play(args) => cmd_play(&cli.common, catalog, &args),
    }
}

fn load_catalog(common: &CommonArgs) -> Result<DataCatalog> {
    match &common.catalog {
        Some(path) => {
            DataCatalog::load(path).with_context(|| format!("load catalog {}", path.display()))
        }
        None => Ok(DataCatalog::lisbon()),
    }
}

fn open_session<S: MapSurface>(
    common: &CommonArgs,
    catalog: Arc<DataCatalog>,
    surface: S,
) -> Result<Session<S>> {
    let prefs: Box<dyn PreferenceStore> = match &common.prefs {
        Some(path) => Box::new(FilePreferences::new(path)),
        None => Box::new(FilePreferences::default_location()),
    };
    let launch = LaunchOptions::from_query(&common.query, &catalog);
    Ok(Session::start(catalog, launch, prefs, surface)?)
}

fn cmd_plan(common: &CommonArgs, catalog: Arc<DataCatalog>) -> Result<()> {
    let session = open_session(common, catalog, RecordingSurface::new())?;
    let state = session.state();
    println!(
        "date={} hour={} mode={}",
        state.date,
        session.hour_label(),
        state.mode.as_query_value()
    );
    if let Some(url) = session.surface().basemap() {
        println!("basemap {url}");
    }
    // Bottom layer first.
    for (handle, layer) in session.surface().layers() {
        println!("{handle} {} {}", layer.key, layer.url);
    }
    Ok(())
}

fn cmd_replay(common: &CommonArgs, catalog: Arc<DataCatalog>, steps: &[String]) -> Result<()> {
    let mut session = open_session(common, catalog, RecordingSurface::new())?;
    for step in steps {
        let event = parse_step(step, &session)?;
        let commands = session
            .dispatch(event)
            .with_context(|| format!("step {step:?}"))?;
        println!("> {step}");
        for command in &commands {
            println!("  {}", describe(command));
        }
    }
    println!("mounted:");
    for (key, handle) in &session.state().mounted {
        println!("  {handle} {key}");
    }
    Ok(())
}

fn parse_step<S: MapSurface>(step: &str, session: &Session<S>) -> Result<Event> {
    if step == "tick" {
        let count = session.catalog().hour_count();
        return Ok(Event::SelectHour(next_hour_index(
            session.state().hour_index,
            count,
        )));
    }
    let Some((name, value)) = step.split_once(':') else {
        bail!("invalid step {step:?}, expected name:value or tick");
    };
    let event = match name {
        "date" => Event::SelectDate(value.to_string()),
        "hour" => Event::SelectHour(
            value
                .parse()
                .with_context(|| format!("invalid hour index {value:?}"))?,
        ),
        "on" => Event::EnableOperator(value.to_string()),
        "off" => Event::DisableOperator(value.to_string()),
        "ops" => Event::ReplaceOperators(
            value
                .split([',', ';'])
                .map(|x| x.trim().to_string())
                .filter(|x| !x.is_empty())
                .collect(),
        ),
        "mode" => match MapMode::from_query_value(value) {
            Some(mode) => Event::SelectMode(mode),
            None => bail!("invalid map mode {value:?}, expected lines or parishes"),
        },
        "color" => match value {
            "dark" => Event::SetColorMode(ColorMode::Dark),
            "light" => Event::SetColorMode(ColorMode::Light),
            other => bail!("invalid colour mode {other:?}, expected dark or light"),
        },
        "detail" => match value {
            "on" => Event::SetDetailedMode(true),
            "off" => Event::SetDetailedMode(false),
            other => bail!("invalid detail value {other:?}, expected on or off"),
        },
        other => bail!("unknown step {other:?}"),
    };
    Ok(event)
}

fn describe(command: &MapCommand) -> String {
    match command {
        MapCommand::Mount { handle, descriptor } => {
            format!("mount {handle} {} {}", descriptor.key, descriptor.url)
        }
        MapCommand::Unmount { key, handle } => format!("unmount {handle} {key}"),
        MapCommand::BringToBack(handle) => format!("back {handle}"),
        MapCommand::BringToFront(handle) => format!("front {handle}"),
        MapCommand::SetBasemap(url) => format!("basemap {url}"),
    }
}

fn cmd_play(common: &CommonArgs, catalog: Arc<DataCatalog>, args: &PlayArgs) -> Result<()> {
    let tick = Duration::from_millis(args.tick_ms);
    if args.fetch {
        let mut session = open_session(common, catalog, RemoteSurface::new()?)?;
        settle(&mut session)?;
        play(&mut session, tick, args.ticks, settle)
    } else {
        let mut session = open_session(common, catalog, RecordingSurface::new())?;
        play(&mut session, tick, args.ticks, |_| Ok(()))
    }
}

fn play<S, F>(session: &mut Session<S>, tick: Duration, ticks: usize, mut after: F) -> Result<()>
where
    S: MapSurface,
    F: FnMut(&mut Session<S>) -> Result<()>,
{
    println!("hour {}", session.hour_label());
    session.start_playback(tick, Instant::now());
    let mut played = 0;
    while played < ticks {
        if let Some(deadline) = session.playback().next_deadline() {
            thread::sleep(deadline.saturating_duration_since(Instant::now()));
        }
        let fired = session.poll_playback(Instant::now())?;
        if fired > 0 {
            played += fired;
            println!("hour {}", session.hour_label());
            after(session)?;
        }
    }
    session.stop_playback();
    Ok(())
}

fn settle(session: &mut Session<RemoteSurface>) -> Result<()> {
    let reports = session.surface_mut().wait_loaded(Duration::from_secs(60));
    for report in &reports {
        if report.is_ok() && !report.stale {
            println!(
                "  {} {}: {} features, {} visible, max {}",
                report.handle, report.key, report.features, report.visible, report.max_services
            );
        }
        session.layer_loaded(report)?;
    }
    let stats = session.stats();
    println!(
        "  running max: lines {} parishes {}",
        stats.max_line, stats.max_parish
    );
    Ok(())
}
