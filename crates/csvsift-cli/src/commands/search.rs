//! Search command - scan archives and export the matching rows.

use crate::OutputFormat;
use anyhow::bail;
use csvsift_core::export::save_to_path;
use csvsift_core::{Config, Query, ScanEngine, ScanEvent, ScanOutcome, ScanRequest};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Run the search command.
pub fn run(
    config: &Config,
    folder: &Path,
    query_file: &Path,
    recursive: Option<bool>,
    output: Option<&Path>,
    format: OutputFormat,
    quiet: bool,
) -> anyhow::Result<()> {
    let query = Query::load_from(query_file)?;
    if !query.is_searchable() {
        bail!(
            "{} has no active criteria (each needs a column and a value)",
            query_file.display()
        );
    }

    let request = ScanRequest::new(folder, query.criteria().to_vec())
        .recursive(recursive.unwrap_or(config.scan.recursive));

    let engine = ScanEngine::new(config.scan.clone());
    let start = Instant::now();
    let handle = engine.start(request)?;

    for event in handle.events().iter() {
        if quiet {
            continue;
        }
        match event {
            ScanEvent::Status(message) => eprintln!("{}", message),
            ScanEvent::Progress(percent) => eprintln!("  [{:>5.1}%]", percent),
        }
    }

    let report = handle.wait()?;
    let elapsed = start.elapsed();
    info!(
        outcome = ?report.outcome,
        matched = report.matched_rows,
        elapsed_ms = elapsed.as_millis() as u64,
        "Search finished"
    );

    if let ScanOutcome::Failed(reason) = &report.outcome {
        bail!("search failed: {}", reason);
    }

    match format {
        OutputFormat::Text => {
            if report.matched_rows == 0 {
                if !quiet {
                    eprintln!("No rows to export.");
                }
            } else {
                let path = export_path(config, output);
                save_to_path(&report.rows, &path)?;
                if !quiet {
                    eprintln!("Results exported to {}", path.display());
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report.rows)?);
            if let Some(path) = output {
                save_to_path(&report.rows, path)?;
            }
        }
    }

    if !quiet {
        eprintln!(
            "Scanned {} of {} archives ({} unreadable) in {:.3}s",
            report.archives_scanned,
            report.archives_found,
            report.archive_errors,
            elapsed.as_secs_f64()
        );
    }
    Ok(())
}

fn export_path(config: &Config, output: Option<&Path>) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => config.export_path(&chrono::Local::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csvsift_core::{Criterion, SearchType};
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, name: &str, contents: &str) {
        let file = fs::File::create(path).unwrap();
        let mut writer = ZipWriter::new(file);
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
        writer.finish().unwrap();
    }

    fn adults_query(dir: &Path) -> PathBuf {
        let path = dir.join("adults.json");
        Query::from_criteria(vec![Criterion::new("Age", SearchType::GreaterThan, "18")])
            .save_to(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_search_exports_matches() {
        let temp_dir = TempDir::new().unwrap();
        let data = temp_dir.path().join("data");
        fs::create_dir(&data).unwrap();
        write_zip(&data.join("people.zip"), "people.csv", "Name,Age\nAlice,30\nBob,17\n");

        let query = adults_query(temp_dir.path());
        let out = temp_dir.path().join("out.csv");
        run(
            &Config::default(),
            &data,
            &query,
            None,
            Some(out.as_path()),
            OutputFormat::Text,
            true,
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "Source ZIP Archive,Source CSV File,Name,Age\npeople.zip,people.csv,Alice,30\n"
        );
    }

    #[test]
    fn test_search_without_matches_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        write_zip(&temp_dir.path().join("kids.zip"), "kids.csv", "Name,Age\nBob,17\n");

        let query = adults_query(temp_dir.path());
        let out = temp_dir.path().join("out.csv");
        run(
            &Config::default(),
            temp_dir.path(),
            &query,
            None,
            Some(out.as_path()),
            OutputFormat::Text,
            true,
        )
        .unwrap();

        assert!(!out.exists());
    }

    #[test]
    fn test_search_requires_active_criteria() {
        let temp_dir = TempDir::new().unwrap();
        let query = temp_dir.path().join("empty.json");
        Query::from_criteria(vec![Criterion::default()])
            .save_to(&query)
            .unwrap();

        let result = run(
            &Config::default(),
            temp_dir.path(),
            &query,
            None,
            None,
            OutputFormat::Text,
            true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_search_missing_folder_fails() {
        let temp_dir = TempDir::new().unwrap();
        let query = adults_query(temp_dir.path());

        let result = run(
            &Config::default(),
            &temp_dir.path().join("missing"),
            &query,
            None,
            None,
            OutputFormat::Text,
            true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_command_line_overrides_recursive_config() {
        let temp_dir = TempDir::new().unwrap();
        let data = temp_dir.path().join("data");
        fs::create_dir_all(data.join("nested")).unwrap();
        write_zip(
            &data.join("nested").join("people.zip"),
            "people.csv",
            "Name,Age\nAlice,30\n",
        );
        let query = adults_query(temp_dir.path());

        let mut config = Config::default();
        config.scan.recursive = true;

        let out = temp_dir.path().join("flat.csv");
        run(&config, &data, &query, Some(false), Some(out.as_path()), OutputFormat::Text, true)
            .unwrap();
        assert!(!out.exists());

        let out = temp_dir.path().join("deep.csv");
        run(&config, &data, &query, None, Some(out.as_path()), OutputFormat::Text, true).unwrap();
        assert!(out.exists());
    }
}
