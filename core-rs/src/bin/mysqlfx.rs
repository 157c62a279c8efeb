//! mysqlfx - standalone harness for the MySQL fixture
//!
//! Brings up a fixture outside a test run, for poking at schemas or
//! debugging a template, and tears it down on Ctrl+C.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use mysql_fixture::binary::{BinaryLayout, BinaryLoader, FixedRoot, LocalInstall};
use mysql_fixture::config::InstanceConfig;
use mysql_fixture::fixture::MysqlFixture;
use mysql_fixture::instance::probe;
use mysql_fixture::process_guard;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "mysqlfx")]
#[command(version = "0.3.2")]
#[command(about = "Ephemeral MySQL server fixture", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a fixture, print its connection URL, tear down on Ctrl+C
    Up {
        /// Database name to initialize
        #[arg(long, default_value = "service")]
        db_name: String,
        /// User to create during setup
        #[arg(long, default_value = "test")]
        user: String,
        /// Password to assign to the user
        #[arg(long, default_value = "test")]
        password: String,
        /// Pin the server port instead of picking a free one
        #[arg(long)]
        port: Option<u16>,
        /// Pipe server output to this terminal
        #[arg(long, short = 'd')]
        debug: bool,
        /// Load the fixture config from a YAML file instead of flags
        #[arg(long)]
        config: Option<PathBuf>,
        /// Binary install root (defaults to $MYSQL_FIXTURE_HOME, then /opt/mysql-fixture/)
        #[arg(long)]
        binary_root: Option<PathBuf>,
        /// Print connection details as JSON once ready
        #[arg(long)]
        json: bool,
    },
    /// Probe a server port once and report readiness
    Ping {
        /// Port to probe
        port: u16,
        /// Binary install root (defaults to $MYSQL_FIXTURE_HOME, then /opt/mysql-fixture/)
        #[arg(long)]
        binary_root: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn loader_for(binary_root: Option<PathBuf>) -> Box<dyn BinaryLoader> {
    match binary_root {
        Some(root) => Box::new(FixedRoot::new(root)),
        None => Box::new(LocalInstall),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Up {
            db_name,
            user,
            password,
            port,
            debug,
            config,
            binary_root,
            json,
        } => {
            let config = match config {
                Some(path) => InstanceConfig::from_yaml_file(&path)?,
                None => InstanceConfig::new(&db_name, &user, &password, debug, port),
            };

            let mut fixture = MysqlFixture::with_loader(config, loader_for(binary_root));

            // Reap the server even if we are interrupted mid-setup
            let shutdown = Arc::new(AtomicBool::new(false));
            let shutdown_clone = shutdown.clone();
            ctrlc::set_handler(move || {
                if shutdown_clone.swap(true, Ordering::SeqCst) {
                    // Second Ctrl+C: force-kill whatever is registered
                    let killed = process_guard::kill_registered();
                    eprintln!("[mysqlfx] Forced kill of {} child process(es)", killed);
                    std::process::exit(130);
                }
            })?;

            eprintln!("[mysqlfx] Starting fixture...");
            fixture.set_up()?;

            let status = fixture
                .status()
                .context("Fixture reported no status after set_up")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!(
                    "{} {}",
                    "ready".green().bold(),
                    status.url.cyan()
                );
                println!("  user: {}  password: {}", status.db_user, fixture.db_password());
                println!("  press Ctrl+C to tear down");
            }

            while !shutdown.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(200));
            }

            eprintln!("[mysqlfx] Tearing down...");
            fixture.tear_down()?;
            eprintln!("[mysqlfx] Done");
        }

        Commands::Ping {
            port,
            binary_root,
            json,
        } => {
            let root = loader_for(binary_root)
                .load()
                .context("Unable to load mysql binary.")?;
            let layout = BinaryLayout::new(root);

            let ready = probe::ping_server(&layout.admin(), port)?;
            if json {
                println!("{}", serde_json::json!({ "port": port, "ready": ready }));
            } else if ready {
                println!("{} port {}", "alive".green().bold(), port);
            } else {
                println!("{} port {}", "down".red().bold(), port);
            }

            if !ready {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
