use std::path::{Path, PathBuf};

use outline::{ClusterParams, RankedClass};
use serde::Serialize;

use crate::prelude::{println, *};

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Extract the heading outline as JSON
    Extract {
        /// Path to the PDF file
        path: PathBuf,
        /// Output file path (if omitted, prints to stdout)
        output_path: Option<PathBuf>,
    },
    /// Print the detected font-size classes and their levels
    Classes {
        /// Path to the PDF file
        path: PathBuf,
        /// Print a table instead of JSON
        #[arg(long)]
        table: bool,
    },
    /// Print document metadata
    Info {
        /// Path to the PDF file
        path: PathBuf,
    },
}

pub fn run(command: Commands, global: crate::Global) -> Result<()> {
    match command {
        Commands::Extract { path, output_path } => {
            extract(&path, output_path.as_deref(), global.params()?)
        }
        Commands::Classes { path, table } => {
            let classes = outline::size_classes(&path, global.params()?).map_err(Error::from)?;
            if table {
                print_class_table(&classes);
                Ok(())
            } else {
                println!("{}", to_json(&classes)?);
                Ok(())
            }
        }
        Commands::Info { path } => {
            let meta = outline::info(&path).map_err(Error::from)?;
            println!("{}", to_json(&meta)?);
            Ok(())
        }
    }
}

pub fn extract(path: &Path, output_path: Option<&Path>, params: ClusterParams) -> Result<()> {
    let outline = outline::extract_outline(path, params).map_err(Error::from)?;
    log::debug!(
        "{}: {} headings under {:?}",
        path.display(),
        outline.outline.len(),
        outline.title
    );
    write_output(&to_json(&outline)?, output_path)
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize JSON")
}

fn write_output(json: &str, output_path: Option<&Path>) -> Result<()> {
    match output_path {
        Some(path) => {
            std::fs::write(path, f!("{json}\n")).map_err(|source| Error::Output {
                path: path.to_path_buf(),
                source,
            })?;
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_class_table(classes: &[RankedClass]) {
    if classes.is_empty() {
        println!("No size classes found.");
        return;
    }

    let mut table = new_table();
    table.add_row(prettytable::row!["Level", "Size", "Lines"]);
    for class in classes {
        table.add_row(prettytable::row![
            class.level,
            f!("{:.1}", class.size),
            class.count
        ]);
    }
    table.printstd();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{exit_code, EXIT_EXTRACTION_FAILED, EXIT_NOT_FOUND};

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("outline.json");

        let outline = outline::Outline {
            title: "Résumé".to_string(),
            outline: vec![outline::OutlineEntry {
                level: outline::HeadingLevel::H1,
                text: "Überblick".to_string(),
                page: 1,
            }],
        };
        write_output(&to_json(&outline).unwrap(), Some(&out)).unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.ends_with('\n'));
        assert!(written.contains("Überblick"));
        let title_at = written.find("\"title\"").unwrap();
        let outline_at = written.find("\"outline\"").unwrap();
        assert!(title_at < outline_at);

        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["outline"][0]["level"], "H1");
        assert_eq!(parsed["outline"][0]["page"], 1);
    }

    #[test]
    fn test_unwritable_output_is_an_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("no-such-dir").join("outline.json");

        let report = write_output("{}", Some(&out)).unwrap_err();
        assert!(matches!(
            report.downcast_ref::<Error>(),
            Some(Error::Output { .. })
        ));
        assert_eq!(exit_code(&report), EXIT_EXTRACTION_FAILED);
    }

    #[test]
    fn test_extract_missing_input_exits_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");

        let report = extract(&missing, None, ClusterParams::default()).unwrap_err();
        assert_eq!(exit_code(&report), EXIT_NOT_FOUND);
    }

    #[test]
    fn test_extract_corrupt_input_exits_failed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"not a pdf at all").unwrap();

        let report = extract(file.path(), None, ClusterParams::default()).unwrap_err();
        assert_eq!(exit_code(&report), EXIT_EXTRACTION_FAILED);
        assert!(matches!(
            report.downcast_ref::<Error>(),
            Some(Error::Extraction(_))
        ));
    }
}
