#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Operator CLI for the meetmap place & location engine.
//!
//! Drives the same sync coordinator the app uses: without `--server`
//! everything runs against the local cache under the guest (or given)
//! identity; with `--server` and `--token` mutations go through the
//! server path with full-list refetch.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use meetmap_client::{ApiClient, HttpApiClient};
use meetmap_models::{Coordinates, Identity, LocationDraft, PlaceFilter};
use meetmap_store::KeyedStore;
use meetmap_sync::coordinator::{EngineView, SyncCoordinator};

#[derive(Parser)]
#[command(name = "meetmap", about = "Inspect and drive the place & location engine")]
struct Cli {
    /// Backend base URL (e.g., `https://api.example.com`). Omit to work
    /// offline against the local cache only.
    #[arg(long, global = true)]
    server: Option<String>,

    /// Session token for authenticated server calls.
    #[arg(long, global = true)]
    token: Option<String>,

    /// User id owning the cache namespace; defaults to guest.
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the identity's saved locations and the active one.
    List,
    /// Save a new location.
    Add {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Street address.
        #[arg(long, default_value = "")]
        address: String,
        /// Make this the default location.
        #[arg(long)]
        default: bool,
        /// Geocode the address before saving (needs `--server`).
        #[arg(long)]
        geocode: bool,
    },
    /// Delete a location by id.
    Delete {
        /// Location id.
        id: i64,
    },
    /// Make a location the default.
    SetDefault {
        /// Location id.
        id: i64,
    },
    /// Resolve an address to coordinates (needs `--server`).
    Geocode {
        /// Free-text address.
        address: String,
    },
    /// List the places of a catalog category (needs `--server`).
    Places {
        /// Category id.
        category: i64,
        /// Restrict to one place kind (e.g., `cafe`).
        #[arg(long)]
        kind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let client: Option<Arc<dyn ApiClient>> = cli
        .server
        .as_ref()
        .map(|url| Arc::new(HttpApiClient::new(url.clone(), cli.token.clone())) as Arc<dyn ApiClient>);

    let identity = match (&cli.user, &cli.token) {
        (Some(id), Some(token)) => Identity::User {
            id: id.clone(),
            session_token: token.clone(),
        },
        _ => Identity::Guest,
    };

    let store = KeyedStore::open_default()?;
    let coordinator = SyncCoordinator::new(store);

    match cli.command {
        Command::List => {
            let view = coordinator.initialize(identity, client).await;
            print_view(&view);
        }
        Command::Add {
            name,
            address,
            default,
            geocode,
        } => {
            coordinator.initialize(identity, client.clone()).await;
            let coords = match (&client, geocode) {
                (Some(client), true) => {
                    meetmap_geocoder::forward_geocode(client.as_ref(), &address).await
                }
                _ => None,
            };
            if geocode && coords.is_none() {
                log::warn!("No coordinates resolved for {address:?}; saving without them");
            }
            let view = coordinator
                .add_location(LocationDraft {
                    name,
                    address,
                    lat: coords.map(|c| c.lat),
                    lng: coords.map(|c| c.lng),
                    is_default: default,
                })
                .await?;
            print_view(&view);
        }
        Command::Delete { id } => {
            coordinator.initialize(identity, client).await;
            let view = coordinator.delete_location(id).await?;
            print_view(&view);
        }
        Command::SetDefault { id } => {
            coordinator.initialize(identity, client).await;
            let view = coordinator.set_default_location(id).await?;
            print_view(&view);
        }
        Command::Geocode { address } => {
            let client = require_server(client)?;
            match meetmap_geocoder::forward_geocode(client.as_ref(), &address).await {
                Some(Coordinates { lat, lng }) => println!("{lat}, {lng}"),
                None => println!("no match"),
            }
        }
        Command::Places { category, kind } => {
            let client = require_server(client)?;
            let filter = parse_filter(kind.as_deref())?;
            let catalog = meetmap_catalog::endpoints::places_of_category(client.as_ref(), category)
                .await?;
            for place in meetmap_catalog::filter::visible_places(&catalog, filter, None) {
                let coords = match (place.lat, place.lng) {
                    (Some(lat), Some(lng)) => format!("{lat}, {lng}"),
                    _ => "-".to_string(),
                };
                println!("{:>6}  {:<12}  {}  ({coords})", place.id, place.kind, place.name);
            }
        }
    }

    Ok(())
}

fn require_server(client: Option<Arc<dyn ApiClient>>) -> Result<Arc<dyn ApiClient>, String> {
    client.ok_or_else(|| "this command needs --server".to_string())
}

fn parse_filter(kind: Option<&str>) -> Result<PlaceFilter, String> {
    match kind {
        None => Ok(PlaceFilter::All),
        Some(kind) => kind
            .parse()
            .map(PlaceFilter::Kind)
            .map_err(|_| format!("unknown place kind: {kind}")),
    }
}

fn print_view(view: &EngineView) {
    println!("identity: {} ({:?})", view.identity.namespace(), view.mode);
    for location in view.locations.iter() {
        let marker = if location.is_default { "*" } else { " " };
        println!("{marker} {:>6}  {}  {}", location.id, location.name, location.address);
    }
    match &view.active_location {
        Some(active) => println!("active: {} ({})", active.name, active.id),
        None => println!("active: none"),
    }
}
