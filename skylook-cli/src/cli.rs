use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{Password, Select, Text};
use skylook_core::{Config, Session, UnitSystem, WeatherError, WeatherSnapshot};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skylook", version, about = "Look up current weather and a 3-day forecast")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactively set the API key and endpoint URLs.
    Configure,

    /// Search for locations by name.
    Search {
        /// At least three characters of a place name.
        text: String,

        /// Choose one of the results and show its forecast.
        #[arg(long)]
        pick: bool,
    },

    /// Show weather for a locator returned by `search`.
    Show {
        locator: String,

        /// Also save the location to favorites.
        #[arg(long)]
        save: bool,
    },

    /// Show weather for the last location looked up.
    Last,

    /// Manage saved locations.
    Favorites {
        #[command(subcommand)]
        action: Option<FavoritesAction>,
    },

    /// Show or change the display unit system.
    Units { choice: Option<UnitsChoice> },
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    /// List saved locations, newest first.
    List,
    /// Fetch a locator and save its location.
    Add { locator: String },
    /// Remove a saved location by name.
    Remove { name: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UnitsChoice {
    Metric,
    Imperial,
    Toggle,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            command => {
                let config = Config::load()?;
                let mut session = Session::from_config(&config)?;
                let res = execute(&mut session, command).await;
                session.shutdown();
                res
            }
        }
    }
}

async fn execute(session: &mut Session, command: Command) -> anyhow::Result<()> {
    tracing::debug!(?command, "Running command");
    match command {
        Command::Configure => configure()?,
        Command::Search { text, pick } => search(session, &text, pick).await?,
        Command::Show { locator, save } => {
            session.load_local_state().await;
            let snap = fetch(session, &locator).await?;
            if save && session.favorites_mut().save(&snap).await? {
                println!("Saved {} to favorites.", snap.location.name);
            }
            print_snapshot(session, &snap);
        }
        Command::Last => match session.start().await {
            Ok(Some(snap)) => print_snapshot(session, &snap),
            Ok(None) => println!("No location looked up yet. Try `skylook search <name>`."),
            Err(err) => return Err(explain(err).context("Could not load the last location")),
        },
        Command::Favorites { action } => {
            session.load_local_state().await;
            favorites(session, action.unwrap_or(FavoritesAction::List)).await?;
        }
        Command::Units { choice } => {
            session.load_local_state().await;
            let units = match choice {
                None => session.units(),
                Some(UnitsChoice::Toggle) => session.toggle_units().await?,
                Some(UnitsChoice::Metric) => set_units(session, UnitSystem::Metric).await?,
                Some(UnitsChoice::Imperial) => set_units(session, UnitSystem::Imperial).await?,
            };
            println!("Units: {units}");
        }
    }
    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load_file()?;

    let key = Password::new("API key (leave empty to keep the current one):")
        .without_confirmation()
        .prompt()?;
    if !key.trim().is_empty() {
        cfg.api_key = Some(key.trim().to_string());
    }

    cfg.search_url = Text::new("Search endpoint URL:").with_default(&cfg.search_url).prompt()?;
    cfg.forecast_url =
        Text::new("Forecast endpoint URL:").with_default(&cfg.forecast_url).prompt()?;

    cfg.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn search(session: &mut Session, text: &str, pick: bool) -> anyhow::Result<()> {
    let Some(results) = session.search().search_now(text).await.map_err(explain)? else {
        println!("Type at least 3 characters to search.");
        return Ok(());
    };

    if !pick || results.is_empty() {
        println!("{}", render::search_results(&results));
        return Ok(());
    }

    let labels: Vec<String> = results.iter().map(|r| r.label()).collect();
    let choice = Select::new("Pick a location:", labels).raw_prompt()?;
    let selected = &results[choice.index];

    session.load_local_state().await;
    let snap = session.select(selected).await.map_err(explain)?;
    print_snapshot(session, &snap);
    Ok(())
}

async fn favorites(session: &mut Session, action: FavoritesAction) -> anyhow::Result<()> {
    match action {
        FavoritesAction::List => println!("{}", render::favorites(session.favorites().list())),
        FavoritesAction::Add { locator } => {
            let snap = fetch(session, &locator).await?;
            if session.favorites_mut().save(&snap).await? {
                println!("Saved {}.", snap.location.name);
            } else {
                println!("{} is already saved.", snap.location.name);
            }
        }
        FavoritesAction::Remove { name } => {
            if session.favorites_mut().remove(&name).await? {
                println!("Removed {name}.");
            } else {
                println!("{name} was not saved.");
            }
        }
    }
    Ok(())
}

async fn set_units(session: &mut Session, units: UnitSystem) -> anyhow::Result<UnitSystem> {
    session.set_units(units).await.context("Failed to save unit preference")?;
    Ok(units)
}

async fn fetch(
    session: &Session,
    locator: &str,
) -> anyhow::Result<std::sync::Arc<WeatherSnapshot>> {
    session.forecast().fetch_forecast(locator).await.map_err(explain)
}

fn print_snapshot(session: &Session, snap: &WeatherSnapshot) {
    let saved = session.favorites().is_saved(&snap.location.name);
    println!("{}", render::snapshot(snap, session.units(), saved));
}

fn explain(err: WeatherError) -> anyhow::Error {
    let hint = err.user_message();
    anyhow::Error::new(err).context(hint)
}
