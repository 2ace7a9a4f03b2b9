use clap::Parser;
use modulestore::{Descriptor, Location};
use tracing::instrument;

use super::{StoreOptions, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Display a single node")]
pub struct Show {
    /// The location of the node, e.g. i4x://MITx/6002/chapter/Week_1
    location: Location,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,

    /// Include the node's data (raw markup or text)
    #[arg(long)]
    with_data: bool,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, options: &StoreOptions) -> anyhow::Result<()> {
        let store = options.load()?;
        let node = store.get_item(&self.location)?;

        match self.output {
            OutputFormat::Pretty => self.output_pretty(node),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(node)?);
            }
        }

        Ok(())
    }

    fn output_pretty(&self, node: &Descriptor) {
        println!("# {}", node.location());
        println!("{}\n", node.display_name());

        println!("{}", "Node".dim());
        println!("  Category:  {}", node.category().category());
        println!("  Class:     {}", node.class());

        if !node.metadata().is_empty() {
            println!("\n{}", "Metadata".dim());
            for (key, value) in node.metadata() {
                println!("  {key}: {value}");
            }
        }

        if !node.children().is_empty() {
            println!("\n{}", "Children".dim());
            for child in node.children() {
                println!("  • {child}");
            }
        }

        if self.with_data {
            if let Some(data) = node.data().filter(|data| !data.is_empty()) {
                println!("\n{}", "Data".dim());
                println!("{data}");
            }
        }
    }
}
