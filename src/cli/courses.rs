use clap::Parser;
use serde_json::json;
use tracing::instrument;

use super::{StoreOptions, terminal::Colorize};

#[derive(Debug, Parser, Default)]
#[command(about = "List loaded and configured courses")]
pub struct Courses {
    /// Output format (table, json)
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl Courses {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, options: &StoreOptions) -> anyhow::Result<()> {
        let store = options.load()?;

        match self.output {
            OutputFormat::Json => {
                let loaded: Vec<_> = store
                    .loaded_courses()
                    .iter()
                    .map(|root| {
                        let path = store
                            .resources(root)
                            .map(|resources| resources.root().to_string_lossy());
                        json!({
                            "location": root.to_string(),
                            "org": root.org(),
                            "course": root.course(),
                            "path": path,
                        })
                    })
                    .collect();
                let skipped: Vec<_> = store
                    .skipped_courses()
                    .iter()
                    .map(|(path, error)| {
                        json!({
                            "path": path.to_string_lossy(),
                            "error": error.to_string(),
                        })
                    })
                    .collect();
                let output = json!({
                    "loaded": loaded,
                    "configured": store.get_courses(),
                    "skipped": skipped,
                    "nodes": store.index().len(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                if store.loaded_courses().is_empty() {
                    println!(
                        "No courses found in {}. Each course needs its own directory with a \
                         course.xml file.",
                        store.data_dir().display()
                    );
                }

                for root in store.loaded_courses() {
                    let title = store
                        .get_item(root)
                        .map(|course| course.display_name().to_string())
                        .unwrap_or_default();
                    println!("{}/{}  {title}", root.org(), root.course());
                    println!("  {}", root.to_string().dim());
                }

                let configured = store.get_courses();
                if !configured.is_empty() {
                    println!("\n{}", "Configured".dim());
                    for course in configured {
                        println!("  • {course}");
                    }
                }

                if !store.skipped_courses().is_empty() {
                    println!("\n{}", "Skipped".warning());
                    for (path, error) in store.skipped_courses() {
                        println!("  • {}: {error}", path.display());
                    }
                }
            }
        }

        Ok(())
    }
}
