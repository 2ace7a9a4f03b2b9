use std::path::PathBuf;

mod courses;
mod show;
mod terminal;
mod tree;

use clap::ArgAction;
use courses::Courses;
use modulestore::{XmlModuleStore, storage::{Loaded, StoreLoadError}};
use show::Show;
use tree::Tree;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The directory containing one subdirectory per course
    #[arg(short, long, default_value = ".", global = true)]
    data_dir: PathBuf,

    /// Build every node while loading instead of on first access
    #[arg(long, global = true)]
    eager: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let options = StoreOptions {
            data_dir: self.data_dir,
            eager: self.eager,
        };

        self.command
            .unwrap_or_else(|| Command::Courses(Courses::default()))
            .run(&options)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

/// How to open the store, shared by every subcommand.
#[derive(Debug)]
pub struct StoreOptions {
    data_dir: PathBuf,
    eager: bool,
}

impl StoreOptions {
    fn load(&self) -> Result<XmlModuleStore<Loaded>, StoreLoadError> {
        let store = XmlModuleStore::new(self.data_dir.clone());
        // the flag can only switch eager loading on; otherwise the config decides
        let store = if self.eager { store.eager(true) } else { store };
        store.load_all()
    }
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// List loaded and configured courses (default)
    Courses(Courses),

    /// Print the content tree of every loaded course
    Tree(Tree),

    /// Show a single node
    Show(Show),
}

impl Command {
    fn run(self, options: &StoreOptions) -> anyhow::Result<()> {
        match self {
            Self::Courses(command) => command.run(options)?,
            Self::Tree(command) => command.run(options)?,
            Self::Show(command) => command.run(options)?,
        }
        Ok(())
    }
}
