use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use divulga::cli::{self, Cli, Commands};
use divulga::sync::HttpBucket;
use divulga::{Config, Database, Profile, logging, utils};
use std::sync::Arc;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // --dev keeps a separate config, database and log
    let profile = if cli.dev { Profile::Dev } else { Profile::Prod };

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_path(&utils::expand_path(path))?,
        None => Config::load_with_profile(profile)?,
    };

    let data_dir = utils::get_data_dir(profile);
    logging::init(data_dir.as_deref(), &config.log_level);

    let db_path = config.get_database_path();
    let db = Database::new(
        db_path
            .to_str()
            .ok_or_else(|| eyre!("Database path contains invalid UTF-8"))?,
    )?;
    let bucket = HttpBucket::new(&config.sync.base_url)?;

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            let app = divulga::tui::App::new(config, db, Arc::new(bucket))?;
            divulga::tui::run_event_loop(app)?;
        }
        Commands::Show { date, all } => cli::handle_show(date, all, &db)?,
        Commands::Toggle { channel, date } => {
            cli::handle_toggle(channel, date, &db)?;
        }
        Commands::Complete { task_id, undo, date } => cli::handle_complete(task_id, undo, date, &db)?,
        Commands::Set {
            task_id,
            text,
            images,
            tags,
            date,
        } => cli::handle_set(task_id, text, images, tags, date, &db)?,
        Commands::Publish => cli::handle_publish(&db, &bucket)?,
        Commands::Fetch { id } => {
            cli::handle_fetch(id, &db, &bucket)?;
        }
        Commands::SyncId => {
            cli::handle_sync_id(&db)?;
        }
        Commands::Export => cli::handle_export(&db)?,
    }

    Ok(())
}
