// src/cli.rs

//! Command-line surface: argument definitions and one handler per subcommand.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use thiserror::Error;
use tracing::info;

use crate::error::EngineError;
use crate::format::{self, Compression, WriteOptions};
use crate::inspect::inspect;
use crate::ingest::{read_csv, write_csv};
use crate::query::run_query;
use crate::render::{format_count, render_info_json, render_info_text, render_info_yaml, render_table};
use crate::schema::{reconcile, SchemaDeclaration};

/// Exit status for bad input: missing files, conflicting flags, engine errors.
pub const EXIT_USER_ERROR: u8 = 1;
/// Exit status for anything else.
pub const EXIT_INTERNAL_ERROR: u8 = 70;

#[derive(Debug, Parser)]
#[command(
    name = "parquet-tools",
    version,
    about = "CLI tools for working with columnar table files",
    disable_version_flag = true
)]
pub struct Cli {
    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Display the first N rows of a file
    Head {
        /// File to read
        file: PathBuf,

        /// Number of rows to display
        #[arg(short = 'n', long, default_value_t = 10)]
        rows: usize,

        /// Write the rows to this CSV file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Display metadata and schema of a file
    Info {
        /// File to inspect
        file: PathBuf,

        /// Output as YAML
        #[arg(long)]
        yaml: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge every *.parquet file in a directory into one file
    Merge {
        /// Directory holding the files to merge
        input_dir: PathBuf,

        /// Output path (default: <input_dir>_merged.parquet next to the directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        write: WriteArgs,
    },

    /// Convert a CSV file, optionally typing its columns from a schema file
    #[command(name = "csv2parquet")]
    Csv2Parquet {
        /// CSV file to convert
        file: PathBuf,

        /// Output path (default: the input with a .parquet extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// YAML or JSON schema declaration
        #[arg(long)]
        schema: Option<PathBuf>,

        #[command(flatten)]
        write: WriteArgs,
    },

    /// Run SQL against a file exposed as table `data`
    Query {
        /// File to query
        file: PathBuf,

        /// SQL text
        sql: Option<String>,

        /// Read the SQL from a file instead
        #[arg(long)]
        sql_file: Option<PathBuf>,

        /// Write results here; `.csv` writes CSV, anything else the columnar format
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Encoding flags shared by the commands that write files.
#[derive(Debug, Clone, Args)]
pub struct WriteArgs {
    /// Compression codec: none, snappy, zstd, gzip, lz4
    #[arg(short = 'c', long, default_value = "snappy")]
    pub compression: String,

    /// Rows per row group (default: one row group)
    #[arg(long, env = "PARQUET_TOOLS_ROW_GROUP_SIZE")]
    pub row_group_size: Option<usize>,
}

impl WriteArgs {
    pub fn options(&self) -> Result<WriteOptions> {
        let codec: Compression = self.compression.parse()?;
        Ok(WriteOptions::default()
            .with_compression(codec)
            .with_row_group_size(self.row_group_size))
    }
}

/// A bad invocation the user can fix: missing input, conflicting flags.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UsageError(pub String);

fn usage<T>(message: impl Into<String>) -> Result<T> {
    Err(UsageError(message.into()).into())
}

/// Exit status for a failed command.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    let user_facing = err
        .chain()
        .any(|cause| cause.is::<EngineError>() || cause.is::<UsageError>());
    if user_facing {
        EXIT_USER_ERROR
    } else {
        EXIT_INTERNAL_ERROR
    }
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Head { file, rows, output } => head(&file, rows, output.as_deref()),
        Command::Info { file, yaml, json } => info_cmd(&file, yaml, json),
        Command::Merge {
            input_dir,
            output,
            write,
        } => merge(&input_dir, output, &write),
        Command::Csv2Parquet {
            file,
            output,
            schema,
            write,
        } => csv2parquet(&file, output, schema.as_deref(), &write),
        Command::Query {
            file,
            sql,
            sql_file,
            output,
        } => query_cmd(&file, sql, sql_file.as_deref(), output.as_deref()),
    }
}

fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return usage(format!("File not found: {}", path.display()));
    }
    Ok(())
}

fn head(file: &Path, rows: usize, output: Option<&Path>) -> Result<()> {
    require_file(file)?;
    let table = format::read_head(file, rows)
        .with_context(|| format!("reading {}", file.display()))?;
    info!(rows = table.num_rows(), "head");

    match output {
        Some(out) => {
            write_csv(out, &table).with_context(|| format!("writing {}", out.display()))?;
            println!("Saved: {}", out.display());
        }
        None => print!("{}", render_table(&table)),
    }
    Ok(())
}

fn info_cmd(file: &Path, yaml: bool, json: bool) -> Result<()> {
    if yaml && json {
        return usage("--yaml and --json cannot be used together");
    }
    require_file(file)?;
    let meta = inspect(file).with_context(|| format!("inspecting {}", file.display()))?;

    let text = if yaml {
        render_info_yaml(&meta)?
    } else if json {
        render_info_json(&meta)?
    } else {
        render_info_text(&meta)
    };
    print!("{text}");
    Ok(())
}

fn merge(input_dir: &Path, output: Option<PathBuf>, write: &WriteArgs) -> Result<()> {
    let options = write.options()?;

    // 1) discover inputs in sorted path order
    let pattern = input_dir.join("*.parquet");
    let mut files: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
        .context("building glob pattern")?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    if files.is_empty() {
        return usage(format!("No .parquet files found in {}", input_dir.display()));
    }
    println!("Files found: {}", files.len());

    // 2) read and stack
    let tables = files
        .iter()
        .map(|f| format::read_table(f).with_context(|| format!("reading {}", f.display())))
        .collect::<Result<Vec<_>>>()?;
    let merged = crate::table::Table::concat(&tables).context("merging tables")?;
    println!(
        "Merged: {} rows, {} columns",
        format_count(merged.num_rows() as u64),
        merged.num_columns()
    );

    // 3) write
    let output = match output {
        Some(p) => p,
        None => default_merge_output(input_dir)?,
    };
    format::write_table(&output, &merged, &options)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(files = files.len(), rows = merged.num_rows(), "merge done");
    println!("compression: {}", options.compression);
    println!("Saved: {}", output.display());
    Ok(())
}

/// `<parent>/<dir name>_merged.parquet`.
fn default_merge_output(input_dir: &Path) -> Result<PathBuf> {
    let dir = if input_dir.file_name().is_some() {
        input_dir.to_path_buf()
    } else {
        input_dir
            .canonicalize()
            .with_context(|| format!("resolving {}", input_dir.display()))?
    };
    let name = dir
        .file_name()
        .map_or_else(|| "output".to_string(), |n| n.to_string_lossy().into_owned());
    let parent = dir.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(format!("{name}_merged.parquet")))
}

fn csv2parquet(
    file: &Path,
    output: Option<PathBuf>,
    schema: Option<&Path>,
    write: &WriteArgs,
) -> Result<()> {
    require_file(file)?;
    let options = write.options()?;

    let is_csv = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        println!("Warning: Input file does not have .csv extension");
    }

    let declaration = match schema {
        Some(path) if !path.is_file() => {
            return usage(format!("Schema file not found: {}", path.display()))
        }
        Some(path) => {
            let decl = SchemaDeclaration::load(path)
                .with_context(|| format!("loading schema {}", path.display()))?;
            println!("Schema loaded: {} fields", decl.len());
            Some(decl)
        }
        None => None,
    };

    let mut table = read_csv(file).with_context(|| format!("reading {}", file.display()))?;
    if let Some(decl) = &declaration {
        table = reconcile(&table, decl).context("applying schema")?;
    }
    println!(
        "Converted: {} rows, {} columns",
        format_count(table.num_rows() as u64),
        table.num_columns()
    );

    let output = output.unwrap_or_else(|| file.with_extension("parquet"));
    format::write_table(&output, &table, &options)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("compression: {}", options.compression);
    println!("Saved: {}", output.display());
    Ok(())
}

fn query_cmd(
    file: &Path,
    sql: Option<String>,
    sql_file: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let sql = match (sql, sql_file) {
        (Some(_), Some(_)) => return usage("give either SQL text or --sql-file, not both"),
        (None, None) => return usage("no SQL given: pass SQL text or --sql-file"),
        (Some(sql), None) => sql,
        (None, Some(path)) => {
            if !path.is_file() {
                return usage(format!("SQL file not found: {}", path.display()));
            }
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
    };
    require_file(file)?;

    let table = format::read_table(file).with_context(|| format!("reading {}", file.display()))?;
    let result = run_query(&table, &sql)?;
    info!(rows = result.num_rows(), columns = result.num_columns(), "query done");

    match output {
        Some(out) => {
            let as_csv = out
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            let written = if as_csv {
                write_csv(out, &result)
            } else {
                format::write_table(out, &result, &WriteOptions::default()).map(|_| ())
            };
            written.with_context(|| format!("writing {}", out.display()))?;
            println!("Saved: {}", out.display());
        }
        None => print!("{}", render_table(&result)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn engine_and_usage_errors_exit_with_one() {
        let engine = anyhow::Error::from(EngineError::InvalidTable("x".into())).context("reading");
        assert_eq!(exit_code(&engine), EXIT_USER_ERROR);

        let usage = anyhow::Error::from(UsageError("nope".into()));
        assert_eq!(exit_code(&usage), EXIT_USER_ERROR);

        let other = anyhow::anyhow!("broken pipe");
        assert_eq!(exit_code(&other), EXIT_INTERNAL_ERROR);
    }

    #[test]
    fn write_args_build_options() -> Result<()> {
        let args = WriteArgs {
            compression: "ZSTD".into(),
            row_group_size: Some(100),
        };
        let options = args.options()?;
        assert_eq!(options.compression, Compression::Zstd);
        assert_eq!(options.row_group_size, Some(100));

        let bad = WriteArgs {
            compression: "brotli".into(),
            row_group_size: None,
        };
        assert_eq!(exit_code(&bad.options().unwrap_err()), EXIT_USER_ERROR);
        Ok(())
    }

    #[test]
    fn default_merge_output_sits_next_to_the_directory() -> Result<()> {
        assert_eq!(
            default_merge_output(Path::new("/data/parts"))?,
            PathBuf::from("/data/parts_merged.parquet")
        );
        assert_eq!(
            default_merge_output(Path::new("/data/parts/"))?,
            PathBuf::from("/data/parts_merged.parquet")
        );
        Ok(())
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["parquet-tools", "head", "f.parquet", "-n", "3"]).unwrap();
        assert!(matches!(cli.command, Command::Head { rows: 3, .. }));

        let cli = Cli::try_parse_from([
            "parquet-tools",
            "csv2parquet",
            "in.csv",
            "-c",
            "gzip",
            "--row-group-size",
            "5",
        ])
        .unwrap();
        match cli.command {
            Command::Csv2Parquet { write, .. } => {
                assert_eq!(write.compression, "gzip");
                assert_eq!(write.row_group_size, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
