use std::sync::Arc;

use clap::{Parser, Subcommand};
use dashboard::console::{TextHost, format_message, format_statistics, format_view, write_layer};
use dashboard::{Applied, Dashboard, DashboardConfig, FieldSource, driver};
use layers::OverlayMode;
use scene::{Attribute, Nutrient};
use streaming::{Backend, HttpBackend, SaveOutcome};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Query-driven field map dashboard")]
struct Args {
    /// Backend base URL (overrides FIELDMAP_BACKEND_URL)
    #[arg(long)]
    backend_url: Option<String>,

    /// Field cells as NAME=PATH to a GeoJSON FeatureCollection (repeatable)
    #[arg(long = "field", value_parser = FieldSource::parse)]
    fields: Vec<FieldSource>,

    /// Field to open (defaults to the first configured field)
    #[arg(long)]
    default_field: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a natural-language question and show the resulting view
    Query {
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Generate prescription maps for the active field
    Prescribe {
        /// Pass to display afterwards: nitrogen, phosphorus or potassium
        #[arg(long)]
        show: Option<String>,
    },

    /// Print acreage and projected yield for the active field
    Stats,

    /// Paint a yield target onto cells and report the new totals
    Paint {
        /// Cell ids (h3 index or feature id)
        #[arg(long = "cell", required = true)]
        cells: Vec<String>,

        /// Yield target in bu/ac
        #[arg(long)]
        value: f64,

        /// Submit the edits to the tile-update service
        #[arg(long)]
        save: bool,
    },

    /// Print the composed layer stack
    Layers {
        /// Attribute column to color by (e.g. yield_target, P_in_soil)
        #[arg(long, default_value = "yield_target")]
        attribute: String,

        /// Map zoom level
        #[arg(long, default_value_t = 15.0)]
        zoom: f64,

        /// List every cell's color
        #[arg(long)]
        verbose: bool,
    },
}

fn parse_nutrient(name: &str) -> Result<Nutrient, String> {
    Nutrient::ALL
        .into_iter()
        .find(|n| {
            n.pass_name().starts_with(&name.trim().to_ascii_lowercase())
                || Nutrient::from_pass_name(name) == Some(*n)
        })
        .ok_or_else(|| format!("unknown nutrient {name:?}"))
}

fn print_conversation_tail(dashboard: &Dashboard, from: usize) {
    for message in dashboard.controller().conversation().messages().iter().skip(from) {
        println!("{}", format_message(message));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = DashboardConfig::from_env()?;
    if let Some(url) = args.backend_url {
        config.backend_url = url;
    }
    if !args.fields.is_empty() {
        config.fields = args.fields;
    }
    if args.default_field.is_some() {
        config.default_field = args.default_field;
    }

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(&config.backend_url, config.timeout)?);
    let mut dashboard = Dashboard::from_config(&config)?;
    info!(
        backend = %config.backend_url,
        fields = config.fields.len(),
        "dashboard ready"
    );

    match args.command {
        Command::Query { question } => {
            let question = question.join(" ");
            let seen = dashboard.controller().conversation().messages().len();
            let applied = driver::ask(&mut dashboard, backend.as_ref(), &question).await;
            print_conversation_tail(&dashboard, seen);
            if let Ok(Applied::Transitioned(_)) = applied {
                print!("{}", format_view(dashboard.view()));
                if dashboard.active_field().is_some() {
                    let mut host = TextHost::new(false);
                    dashboard.render(&mut host)?;
                    print!("{}", host.take());
                }
            }
        }
        Command::Prescribe { show } => {
            let seen = dashboard.controller().conversation().messages().len();
            driver::prescribe(&mut dashboard, backend.as_ref()).await?;
            print_conversation_tail(&dashboard, seen);
            for layer in dashboard.controller().prescriptions() {
                println!("{}: {} zones", layer.nutrient.pass_name(), layer.zones.len());
            }
            if let Some(name) = show {
                dashboard.set_overlay_mode(OverlayMode::Prescription(parse_nutrient(&name)?));
                let mut host = TextHost::new(false);
                dashboard.render(&mut host)?;
                print!("{}", host.take());
            }
        }
        Command::Stats => {
            driver::refresh_statistics(&mut dashboard).await?;
            print!("{}", format_statistics(&dashboard.statistics()?));
        }
        Command::Paint { cells, value, save } => {
            dashboard.enter_edit_mode()?;
            let painted = dashboard.paint_cells(&cells, value)?;
            println!("painted {painted} of {} cells at {value} bu/ac", cells.len());
            driver::refresh_statistics(&mut dashboard).await?;
            print!("{}", format_statistics(&dashboard.statistics()?));
            if save {
                match driver::save(&mut dashboard, backend.as_ref()).await? {
                    SaveOutcome::Saved {
                        changeset_id,
                        features,
                    } => println!(
                        "saved {features} cells, changeset {}",
                        changeset_id.as_deref().unwrap_or("-")
                    ),
                    SaveOutcome::NothingToSave => println!("nothing to save"),
                    SaveOutcome::Rejected => println!("save rejected"),
                }
            }
        }
        Command::Layers {
            attribute,
            zoom,
            verbose,
        } => {
            let attribute = Attribute::from_column(&attribute)
                .ok_or_else(|| format!("unknown attribute {attribute:?}"))?;
            dashboard.set_attribute(attribute);
            dashboard.set_zoom(zoom);
            let mut out = String::new();
            for layer in dashboard.compose()? {
                write_layer(&mut out, &layer, verbose);
            }
            print!("{out}");
        }
    }
    Ok(())
}
