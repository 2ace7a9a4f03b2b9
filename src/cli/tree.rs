use clap::Parser;
use modulestore::{Location, XmlModuleStore, storage::Loaded};
use tracing::instrument;

use super::{StoreOptions, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Print the content tree of every loaded course")]
pub struct Tree {
    /// Only print the course rooted at this location
    #[arg(long)]
    course: Option<Location>,

    /// Maximum depth to print (the course root is depth 0)
    #[arg(long)]
    depth: Option<usize>,
}

impl Tree {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, options: &StoreOptions) -> anyhow::Result<()> {
        let store = options.load()?;

        let roots: Vec<&Location> = match &self.course {
            Some(course) => vec![course],
            None => store.loaded_courses().iter().collect(),
        };

        for root in roots {
            self.print_node(&store, root, 0)?;
        }

        Ok(())
    }

    fn print_node(
        &self,
        store: &XmlModuleStore<Loaded>,
        location: &Location,
        depth: usize,
    ) -> anyhow::Result<()> {
        let node = store.get_item(location)?;
        println!(
            "{}{} {} {}",
            "  ".repeat(depth),
            node.category().category(),
            location.slug(),
            format!("({})", node.display_name()).dim()
        );

        if self.depth.is_some_and(|max| depth >= max) {
            return Ok(());
        }

        for child in node.children() {
            self.print_node(store, child, depth + 1)?;
        }
        Ok(())
    }
}
