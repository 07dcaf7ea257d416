use clap::{Parser, Subcommand};

#[allow(clippy::upper_case_acronyms)]
#[derive(Parser, Debug)]
#[clap(name = "mysql_bulk", about, version)]
pub struct CLI {
    #[clap(subcommand)]
    pub command: Commands,

    /// optional - The path to the manifest, default is mysql_bulk.yaml where the command is run.
    #[clap(long, short, global = true)]
    pub manifest: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validates the manifest and prints the resolved columns and operations.
    ///
    /// Example:
    /// `mysql_bulk validate`
    #[clap(name = "validate")]
    Validate,

    /// Renders a json lines file of events into bulk insert statements.
    ///
    /// Each line is `{"time": <unix seconds>, "record": {...}}`. Use `-` to read stdin.
    ///
    /// Example:
    /// `mysql_bulk render events.jsonl --inline`
    #[clap(name = "render")]
    Render {
        /// The events file to render.
        events: String,

        /// Print the statement with values bound inline instead of placeholders.
        #[clap(long)]
        inline: bool,

        /// Maximum number of events rendered into one statement.
        #[clap(long, default_value_t = 1000)]
        batch_size: usize,
    },
}
