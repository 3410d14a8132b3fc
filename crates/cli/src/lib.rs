pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use orderdesk_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use orderdesk_core::domain::order::{DeliveryTimeSlot, OrderStatus};

#[derive(Debug, Parser)]
#[command(
    name = "orderdesk",
    about = "Orderdesk operator CLI",
    long_about = "Inspect storefront orders and walk them through status changes and deletion from a terminal.",
    after_help = "Examples:\n  orderdesk show ord_0001a2b3c4\n  orderdesk status ord_0001a2b3c4 accepted --slot 14:00-15:00\n  orderdesk status ord_0001a2b3c4 rejected --reason \"out of stock\"\n  orderdesk delete ord_0001a2b3c4\n  orderdesk config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Read configuration from this TOML file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the admin API base URL")]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Load one order and print it with its derived links")]
    Show { id: String },
    #[command(about = "Change an order's status, supplying a time slot or rejection reason")]
    Status {
        id: String,
        #[arg(help = "Target status: new|accepted|rejected")]
        status: OrderStatus,
        #[arg(long, help = "Delivery window when accepting, e.g. 14:00-15:00")]
        slot: Option<DeliveryTimeSlot>,
        #[arg(long, help = "Reason shown to the customer when rejecting")]
        reason: Option<String>,
    },
    #[command(about = "Delete an order permanently")]
    Delete { id: String },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        overrides: ConfigOverrides { api_url: cli.api_url.clone(), ..ConfigOverrides::default() },
    };

    let result = match cli.command {
        Command::Config => commands::config::run(options),
        command => match AppConfig::load(options) {
            Ok(config) => {
                logging::init(&config);
                dispatch(&config, command)
            }
            Err(error) => commands::CommandResult::failure(
                command_name(&command),
                "config_validation",
                format!("configuration issue: {error}"),
                commands::EXIT_CONFIG,
            ),
        },
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn dispatch(config: &AppConfig, command: Command) -> commands::CommandResult {
    tracing::debug!(
        event_name = "system.cli.command_started",
        command = command_name(&command),
        api_base_url = %config.api.base_url,
        "running command"
    );

    match command {
        Command::Show { id } => commands::show::run(config, &id),
        Command::Status { id, status, slot, reason } => {
            commands::status::run(config, &id, status, slot, reason)
        }
        Command::Delete { id } => commands::delete::run(config, &id),
        Command::Config => commands::config::run(LoadOptions::default()),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Show { .. } => "show",
        Command::Status { .. } => "status",
        Command::Delete { .. } => "delete",
        Command::Config => "config",
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use orderdesk_core::domain::order::{DeliveryTimeSlot, OrderStatus};

    use super::{Cli, Command};

    #[test]
    fn status_arguments_parse_into_domain_types() {
        let cli = Cli::try_parse_from([
            "orderdesk",
            "status",
            "ord-1",
            "accepted",
            "--slot",
            "14:00-15:00",
            "--api-url",
            "/api",
        ])
        .expect("arguments parse");

        assert_eq!(cli.api_url.as_deref(), Some("/api"));
        let Command::Status { id, status, slot, reason } = cli.command else {
            panic!("expected status command");
        };
        assert_eq!(id, "ord-1");
        assert_eq!(status, OrderStatus::Accepted);
        assert_eq!(slot, Some(DeliveryTimeSlot::From14To15));
        assert!(reason.is_none());
    }

    #[test]
    fn unknown_status_or_slot_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["orderdesk", "status", "ord-1", "shipped"]).is_err());
        assert!(Cli::try_parse_from([
            "orderdesk",
            "status",
            "ord-1",
            "accepted",
            "--slot",
            "09:00-10:00"
        ])
        .is_err());
    }
}
