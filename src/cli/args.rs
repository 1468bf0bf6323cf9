//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::resource::Kind;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Infrastructure inventory kept in YAML files
#[derive(Parser, Debug)]
#[command(
    name = "rackledger",
    version = env!("CARGO_PKG_VERSION"),
    about = "Infrastructure inventory kept in human-editable YAML files",
    next_line_help = true,
    styles = clap_cargo_style(),
    after_help = "Quick Start:\n  $ rackledger init\n  $ rackledger add server srv01 --tag rack1\n  $ rackledger add service immich\n  $ rackledger set-service immich --ip 192.168.10.14 --port 80\n  $ rackledger list --kind service\n  $ rackledger watch"
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Resource file to load (repeatable; replaces `files` from settings)
    #[arg(short, long = "file", value_name = "FILE", global = true)]
    pub files: Vec<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize project
    #[command(about = "Set up .rackledger directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// List the resource kinds
    #[command(about = "List known resource kinds and their categories")]
    Kinds,

    /// Add a resource
    #[command(
        about = "Add a resource to the inventory",
        after_help = "Examples:\n  rackledger add server srv01\n  rackledger add service immich --into services.yaml --tag media"
    )]
    Add {
        /// Resource kind (server, switch, firewall, router, desktop, laptop,
        /// accesspoint, ups, system, service)
        kind: Kind,

        /// Unique name (case-insensitive)
        name: String,

        /// File to store the resource in (defaults to `default_file`)
        #[arg(long = "into", value_name = "FILE")]
        into: Option<PathBuf>,

        /// Tag to attach (repeatable)
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Show one resource
    #[command(about = "Show a resource by name")]
    Get {
        name: String,
    },

    /// List resources
    #[command(about = "List resources, optionally filtered by kind")]
    List {
        #[arg(short, long)]
        kind: Option<Kind>,
    },

    /// Delete a resource
    #[command(about = "Remove a resource by name")]
    Del {
        name: String,
    },

    /// Tag a resource
    #[command(about = "Attach a tag to a resource")]
    Tag {
        name: String,
        tag: String,
    },

    /// Set service network details
    #[command(
        name = "set-service",
        about = "Update a service's network descriptor and host",
        after_help = "Example:\n  rackledger set-service immich --ip 192.168.10.14 --port 80"
    )]
    SetService {
        name: String,

        #[arg(long)]
        ip: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        protocol: Option<String>,

        #[arg(long)]
        url: Option<String>,

        /// System the service runs on
        #[arg(long)]
        runs_on: Option<String>,
    },

    /// Watch resource files and report reloads
    #[command(about = "Keep the inventory loaded and reload files edited elsewhere")]
    Watch {
        /// Stop after N seconds (runs until interrupted otherwise)
        #[arg(long, value_name = "SECONDS")]
        for_secs: Option<u64>,
    },
}
