use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "fdwctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Manage Postgres foreign data wrappers declaratively", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v info, -vv debug, -vvv SQL trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/fdwctl/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Connection string of the database to manage (overrides the config file)
    #[arg(long, env = "FDWCTL_CONNECTION", global = true, hide_env_values = true)]
    pub connection: Option<String>,

    /// Abort after this many seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge the database to the desired state in the config file
    Apply(ApplyArgs),

    /// List live FDW objects
    List(ListArgs),

    /// Create a single FDW object
    #[command(subcommand)]
    Create(CreateCommand),

    /// Drop a single FDW object
    #[command(subcommand)]
    Drop(DropCommand),

    /// Change an existing FDW object
    #[command(subcommand)]
    Edit(EditCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Apply
// ============================================================================

#[derive(Args)]
pub struct ApplyArgs {
    /// Dry run - read live state, print DDL instead of executing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Drop and re-import schemas that already exist
    #[arg(long)]
    pub recreate_schemas: bool,

    /// Also drop the local role of each removed user mapping
    #[arg(long)]
    pub drop_local_users: bool,

    /// Drop removed servers and schemas without CASCADE
    #[arg(long)]
    pub no_cascade: bool,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// List
// ============================================================================

#[derive(Args)]
pub struct ListArgs {
    /// Print as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub target: ListCommand,
}

#[derive(Subcommand)]
pub enum ListCommand {
    /// Foreign servers
    #[command(alias = "servers")]
    Server,

    /// Installed extensions
    #[command(alias = "extensions")]
    Extension,

    /// User mappings
    #[command(alias = "usermaps")]
    Usermap {
        /// Only mappings for this server
        server: Option<String>,
    },

    /// Imported foreign schemas
    #[command(alias = "schemas")]
    Schema {
        /// Only schemas imported from this server
        server: Option<String>,
    },
}

// ============================================================================
// Create
// ============================================================================

#[derive(Subcommand)]
pub enum CreateCommand {
    /// Create a foreign server
    Server {
        /// Server name (default: <host>_<port>_<dbname>)
        #[arg(long)]
        name: Option<String>,

        /// Remote host
        #[arg(long)]
        host: String,

        /// Remote port
        #[arg(long, default_value = "5432")]
        port: u16,

        /// Remote database
        #[arg(long)]
        dbname: String,

        /// Foreign data wrapper
        #[arg(long, default_value = fdwkit::DEFAULT_WRAPPER)]
        wrapper: String,
    },

    /// Install an extension
    Extension {
        /// Extension name
        #[arg(default_value = fdwkit::DEFAULT_WRAPPER)]
        name: String,
    },

    /// Create a user mapping (and its local role if missing)
    Usermap {
        /// Foreign server
        server: String,

        /// Local role, or PUBLIC
        local_user: String,

        /// Remote role
        #[arg(long)]
        remote_user: String,

        /// Remote password
        #[arg(long, env = "FDWCTL_REMOTE_PASSWORD", hide_env_values = true)]
        remote_password: Option<String>,
    },

    /// Import a remote schema
    Schema {
        /// Foreign server
        server: String,

        /// Local schema to import into
        #[arg(long)]
        local_schema: String,

        /// Remote schema to import
        #[arg(long)]
        remote_schema: String,

        /// Clone enum types used by the remote tables first
        #[arg(long)]
        import_enums: bool,

        /// Connection string of the remote database, for --import-enums
        #[arg(long)]
        enum_connection: Option<String>,

        /// Grant USAGE and SELECT to this role (repeatable)
        #[arg(long = "grant", value_name = "ROLE")]
        grants: Vec<String>,
    },
}

// ============================================================================
// Drop
// ============================================================================

#[derive(Subcommand)]
pub enum DropCommand {
    /// Drop an extension
    Extension {
        name: String,

        /// Also drop dependent objects
        #[arg(long)]
        cascade: bool,
    },

    /// Drop a foreign server
    Server {
        name: String,

        /// Also drop its user mappings and foreign tables
        #[arg(long)]
        cascade: bool,
    },

    /// Drop a user mapping
    Usermap {
        /// Foreign server
        server: String,

        /// Local role, or PUBLIC
        local_user: String,

        /// Also drop the local role
        #[arg(long)]
        drop_local: bool,
    },

    /// Drop a local schema
    Schema {
        name: String,

        /// Also drop the foreign tables in it
        #[arg(long)]
        cascade: bool,
    },
}

// ============================================================================
// Edit
// ============================================================================

#[derive(Subcommand)]
pub enum EditCommand {
    /// Change a server's options or name
    Server {
        name: String,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        dbname: Option<String>,

        /// Rename the server after updating its options
        #[arg(long)]
        new_name: Option<String>,
    },

    /// Change a user mapping's remote user or password
    Usermap {
        /// Foreign server
        server: String,

        /// Local role, or PUBLIC
        local_user: String,

        #[arg(long)]
        remote_user: Option<String>,

        #[arg(long, env = "FDWCTL_REMOTE_PASSWORD", hide_env_values = true)]
        remote_password: Option<String>,
    },
}
