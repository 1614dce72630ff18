//! Console explorer for administrative-boundary drill-down.
//!
//! Drives a drill-down session against the configured boundary and filter
//! services, rendering onto an in-memory map surface. Reads one command per
//! line from stdin.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use areamap::boundary::HttpBoundaryService;
use areamap::config::Config;
use areamap::drill::DrillSession;
use areamap::filter::{GraphQlFilterService, SpatialFilter};
use areamap::models::Organization;
use areamap::render::{
    BoundaryLayer, LayerSet, MapEvent, MemorySurface, PointerEvent, PointerKind, PointerTarget,
    DEFAULT_LAYER_ID,
};

mod command;
use command::{Command, HELP};

#[derive(Parser, Debug)]
#[command(name = "explore")]
#[command(about = "Drill into administrative areas and filter organizations")]
struct Args {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON array of organizations
    #[arg(short, long)]
    organizations: PathBuf,

    /// Deepest selectable level, overrides the config
    #[arg(long)]
    max_level: Option<u8>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

type Session = DrillSession<Organization>;
type Layer = BoundaryLayer<MemorySurface>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(level) = args.max_level {
        config.drill.max_level = level;
    }

    let organizations: Vec<Organization> = serde_json::from_str(
        &std::fs::read_to_string(&args.organizations)
            .context("Failed to read organizations file")?,
    )
    .context("Failed to parse organizations file")?;
    info!("Loaded {} organizations", organizations.len());

    let timeout = config.services.timeout();
    info!("Boundary service at {}", config.services.boundary_url);
    let boundaries = HttpBoundaryService::new(&config.services.boundary_url, timeout)?;
    info!("Filter service at {}", config.services.gapi_url);
    let filter_service = GraphQlFilterService::new(&config.services.gapi_url, timeout)?;

    let mut session = DrillSession::new(
        organizations,
        Arc::new(boundaries),
        SpatialFilter::new(Arc::new(filter_service), timeout),
        timeout,
        config.drill.max_level(),
    );
    let mut layer = BoundaryLayer::new(MemorySurface::default());
    let mut over_layer = false;

    refresh(&mut session, &mut layer).await;
    println!("{}\n\n{}", session.panel(), HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{HELP}"),
            Command::Status => {}
            Command::List => list_areas(&session),
            Command::ZoomOut => session.zoom_out(),
            Command::MaxLevel(level) => session.set_max_level(level),
            Command::Select(code) => {
                let hit = session
                    .state()
                    .boundaries()
                    .data
                    .as_ref()
                    .and_then(|data| data.find_by_code(&code).map(|f| f.name.clone()));
                match hit {
                    Some(name) => session.click_area(code, name),
                    None => println!("No area {code} at this level"),
                }
            }
            Command::Click { lon, lat } => {
                let target = layer.surface().hit_test(lon, lat);
                let event = layer.handle_pointer(&PointerEvent::new(PointerKind::Click, target));
                apply_map_event(&mut session, event);
            }
            Command::Move { lon, lat } => {
                let target = layer.surface().hit_test(lon, lat);
                let now_over = matches!(target, PointerTarget::Layer { .. });
                let mut events = Vec::new();
                if now_over && !over_layer {
                    events.push(PointerEvent::new(PointerKind::Enter, target.clone()));
                }
                if now_over {
                    events.push(PointerEvent::new(PointerKind::Move, target));
                } else if over_layer {
                    events.push(PointerEvent::new(
                        PointerKind::Leave,
                        PointerTarget::Layer {
                            layer: format!("{DEFAULT_LAYER_ID}-fill"),
                            feature: None,
                        },
                    ));
                }
                over_layer = now_over;
                for event in events {
                    let map_event = layer.handle_pointer(&event);
                    apply_map_event(&mut session, map_event);
                }
            }
        }

        refresh(&mut session, &mut layer).await;
        println!("{}", session.panel());
    }

    Ok(())
}

/// Let in-flight requests land, then redraw layers and markers
async fn refresh(session: &mut Session, layer: &mut Layer) {
    session.settle().await;
    layer.reconcile(LayerSet::for_state(DEFAULT_LAYER_ID, session.state()));
    layer.sync_markers(session.state().filter_result());
}

fn apply_map_event(session: &mut Session, event: Option<MapEvent>) {
    match event {
        Some(MapEvent::AreaClicked { code, name }) => session.click_area(code, name),
        Some(MapEvent::ZoomOutRequested) => session.zoom_out(),
        Some(MapEvent::HoverChanged(name)) => session.hover(Some(name)),
        Some(MapEvent::HoverCleared) => session.hover(None),
        Some(MapEvent::MarkerClicked(id)) => {
            match session.entities().iter().find(|o| o.id == id) {
                Some(org) => println!(
                    "{} ({}){}",
                    org.name,
                    org.id,
                    org.address
                        .as_deref()
                        .map(|a| format!(" - {a}"))
                        .unwrap_or_default()
                ),
                None => println!("Unknown marker {id}"),
            }
        }
        None => {}
    }
}

fn list_areas(session: &Session) {
    match &session.state().boundaries().data {
        Some(data) => {
            for feature in &data.features {
                println!("  {:<12} {}", feature.code, feature.name);
            }
        }
        None => println!("  (no areas loaded)"),
    }
}
