use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deckpad")]
#[command(author, version, about)]
#[command(long_about = "A markdown slide deck viewer with a built-in editor.\n\n\
    Slides are separated by `---` lines and may carry YAML frontmatter.\n\
    Edits made in the editor are kept locally until you reset them.\n\n\
    Examples:\n  \
    deckpad slides.md               Present a local deck (fullscreen)\n  \
    deckpad slides.md --edit        Open with the editor visible\n  \
    deckpad https://host/talk.md    Present a remote deck\n  \
    deckpad list slides.md          List slide titles")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Deck to present: a file path or an http(s) URL
    pub source: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Launch in a window instead of fullscreen
    #[arg(long, global = false)]
    pub windowed: bool,

    /// Show the editor on launch
    #[arg(long, global = false)]
    pub edit: bool,

    /// Start on a specific slide (1-indexed)
    #[arg(long, global = false)]
    pub slide: Option<usize>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the slides of a deck
    List {
        /// Deck source (file path or URL)
        source: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Ignore locally saved edits
        #[arg(long)]
        original: bool,
    },

    /// Print slides as plain text
    Show {
        /// Deck source (file path or URL)
        source: Option<String>,

        /// Only this slide (1-indexed)
        #[arg(long)]
        slide: Option<usize>,

        /// Print the markdown source instead of rendered text
        #[arg(long)]
        raw: bool,

        /// Ignore locally saved edits
        #[arg(long)]
        original: bool,
    },

    /// Export slides as HTML or PNG images
    Export {
        /// Deck source (file path or URL)
        source: Option<String>,

        /// Output directory
        #[arg(short, long, default_value = "export")]
        output_dir: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "html")]
        format: ExportFormat,

        /// Export width in pixels (png)
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Export height in pixels (png)
        #[arg(long, default_value = "1080")]
        height: u32,
    },

    /// Discard locally saved edits and the remembered slide position
    Forget {
        /// Deck source (file path or URL)
        source: Option<String>,

        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (defaults.theme, defaults.source, storage.dir)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Html,
    Png,
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::List {
                source,
                json,
                original,
            }) => crate::commands::list::run(source.as_deref(), json, original),
            Some(Commands::Show {
                source,
                slide,
                raw,
                original,
            }) => crate::commands::show::run(source.as_deref(), slide, raw, original),
            Some(Commands::Export {
                source,
                output_dir,
                format,
                width,
                height,
            }) => match format {
                ExportFormat::Html => crate::commands::export::run_html(source.as_deref(), output_dir),
                ExportFormat::Png => {
                    crate::commands::export::run_png(source.as_deref(), output_dir, width, height)
                }
            },
            Some(Commands::Forget { source, yes }) => {
                crate::commands::forget::run(source.as_deref(), yes)
            }
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                crate::commands::print_version();
                Ok(())
            }
            None => crate::app::run(self.source.as_deref(), self.windowed, self.edit, self.slide),
        }
    }
}
