use std::rc::Rc;

use clap::{Args as ClapArgs, Parser, Subcommand};
use foundation::Version;
use layers::ThresholdMode;
use serde::Serialize;
use session::{InitialSelection, RecordingSurface, ViewQuery, Viewer, ViewerOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod http;
mod report;

use config::{Overrides, ViewerConfig};
use http::HttpApi;
use report::RenderReport;

#[derive(Parser, Debug)]
#[command(author, version, about = "Disaster-response heatmap layer viewer")]
struct Args {
    /// Catalog API host (default: HAZARD_API_HOST or http://localhost:3000)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Minimum point intensity to display
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Threshold comparison: at-least (>=) or above (>)
    #[arg(long, global = true)]
    threshold_mode: Option<ThresholdMode>,

    #[arg(long, global = true)]
    exponent: Option<f64>,

    #[arg(long, global = true)]
    multiplier: Option<f64>,

    /// Lowest level drawn on multi-intensity layers
    #[arg(long, global = true)]
    min_intensity: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug, Clone, Default)]
struct QueryArgs {
    /// Page query string, e.g. "event=irma&pending=1"
    #[arg(long)]
    query: Option<String>,

    #[arg(long)]
    event: Option<String>,

    /// Load the pending (unapproved) releases
    #[arg(long)]
    pending: bool,

    /// Show a single layer's release
    #[arg(long)]
    layer: Option<String>,
}

impl QueryArgs {
    fn to_query(&self) -> ViewQuery {
        let mut q = self
            .query
            .as_deref()
            .map(ViewQuery::parse)
            .unwrap_or_default();
        if let Some(event) = &self.event {
            q.event = Some(event.clone());
        }
        if self.pending {
            q.pending = true;
        }
        if let Some(layer) = &self.layer {
            q.layer = Some(layer.clone());
        }
        q
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List events
    Events,

    /// Show an event's version groups and layers
    Layers {
        #[command(flatten)]
        query: QueryArgs,
    },

    /// Fetch and render layers, then report drawables and framing
    Render {
        #[command(flatten)]
        query: QueryArgs,

        /// Show every layer instead of only the first
        #[arg(long)]
        all: bool,

        /// Layer URLs to show in addition to the initial selection
        #[arg(long = "show")]
        show: Vec<String>,
    },

    /// Approve a pending version group
    Approve {
        #[arg(long)]
        event: String,

        #[arg(long)]
        version: String,
    },

    /// Print a version group's metadata document
    Metadata {
        #[command(flatten)]
        query: QueryArgs,

        #[arg(long)]
        version: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ViewerConfig::from_env().with_overrides(&Overrides {
        host: args.host.clone(),
        threshold: args.threshold,
        threshold_mode: args.threshold_mode,
        exponent: args.exponent,
        multiplier: args.multiplier,
        min_intensity: args.min_intensity,
    });
    info!(host = %config.api_host, "using catalog api");

    let api = Rc::new(HttpApi::new(config.api_host.clone()));
    let viewer = |initial: InitialSelection| {
        Viewer::new(
            api.clone(),
            api.clone(),
            RecordingSurface::new(),
            ViewerOptions {
                settings: config.settings,
                initial,
                ..ViewerOptions::default()
            },
        )
    };

    match args.command {
        Command::Events => {
            let events = viewer(InitialSelection::None).events().await;
            print_json(&events)?;
        }
        Command::Layers { query } => {
            let v = viewer(InitialSelection::None);
            v.load(&query.to_query()).await?;
            print_json(&v.summary())?;
        }
        Command::Render { query, all, show } => {
            let initial = if all {
                InitialSelection::All
            } else {
                InitialSelection::First
            };
            let v = viewer(initial);
            v.load(&query.to_query()).await?;
            for url in show {
                if let Err(err) = v.set_visibility(&url.as_str().into(), true).await {
                    tracing::warn!(%url, error = %err, "could not show layer");
                }
            }
            print_json(&RenderReport::collect(&v))?;
        }
        Command::Approve { event, version } => {
            let v = viewer(InitialSelection::None);
            v.load(&ViewQuery {
                event: Some(event),
                pending: true,
                layer: None,
            })
            .await?;
            let state = v.approve(&Version::from(version.as_str())).await?;
            print_json(&state)?;
        }
        Command::Metadata { query, version } => {
            let v = viewer(InitialSelection::None);
            v.load(&query.to_query()).await?;
            let doc = v.group_metadata(&Version::from(version.as_str())).await;
            print_json(&doc)?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
