//! CLI driver for the box store.
//!
//! # Responsibility
//! - Open the configured store and run one service command per invocation.
//! - Keep output line-oriented and deterministic for scripting.
//!
//! Configuration comes from `--config <file.json>` or, without it, from
//! `BOXSTORE_*` environment variables. The command line is fully parsed
//! before any config is read or any database is opened.

mod cli;

use anyhow::{bail, Context, Result};
use boxstore_core::{
    provision_box_atomically, provision_item_atomically, BoxAggregate, BoxAndItemService,
    CoreConfig, SqliteBoxRepository,
};
use cli::{CommandLine, Commands};
use log::info;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run(CommandLine::parse_args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: CommandLine) -> Result<()> {
    if cli.command == Commands::Ping {
        println!("boxstore_core ping={}", boxstore_core::ping());
        println!("boxstore_core version={}", boxstore_core::core_version());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => CoreConfig::from_json_file(path)?,
        None => CoreConfig::from_env()?,
    };
    config.init_logging()?;
    let mut conn = config
        .open_db()
        .with_context(|| format!("opening box store `{}`", config.db_path.display()))?;
    let policy = config.id_policy();

    match &cli.command {
        Commands::AddBox => {
            let box_id = provision_box_atomically(&mut conn, policy)?;
            println!("{box_id}");
        }
        Commands::AddItem { box_id } => {
            let item_id = provision_item_atomically(&mut conn, *box_id, policy)?;
            println!("{item_id}");
        }
        command => {
            let service = BoxAndItemService::new(SqliteBoxRepository::try_new(&conn)?);
            run_service_command(&service, command)?;
        }
    }

    info!(
        "event=cli_command module=cli status=ok command={}",
        cli.command.name()
    );
    Ok(())
}

fn run_service_command(
    service: &BoxAndItemService<SqliteBoxRepository<'_>>,
    command: &Commands,
) -> Result<()> {
    match command {
        Commands::List => {
            for aggregate in service.boxes()? {
                print_box(&aggregate);
            }
        }
        Commands::Count => println!("{}", service.count()?),
        Commands::RenameBox { box_id, title } => service.change_box_title(*box_id, title)?,
        Commands::RenameItem {
            box_id,
            item_id,
            title,
        } => service.change_item_title(*item_id, title, *box_id)?,
        Commands::RemoveBox { box_id } => service.remove_box(*box_id)?,
        Commands::RemoveItem { box_id, item_id } => service.remove_item(*item_id, *box_id)?,
        other => bail!("`{}` does not run through the box service", other.name()),
    }
    Ok(())
}

fn print_box(aggregate: &BoxAggregate) {
    println!("{}\t{}", aggregate.id, aggregate.title);
    for item in &aggregate.items {
        println!("  {}\t{}", item.id, item.title);
    }
}
