mod output;
mod script;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use memfs_core::{FileKind, FsConfig, MemFs};
use output::{
    CatOutput, ConfigOutput, CreateOutput, FsckOutput, LinkOutput, LsOutput, OutputWriter,
    RemoveOutput, StatOutput, TreeOutput, TruncateOutput, UtimeOutput, WriteOutput, kind_char,
};
use script::Command;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// memfs - An in-memory hierarchical filesystem engine
#[derive(Parser)]
#[command(name = "memfs")]
#[command(about = "Drive an in-memory filesystem with scripted operations", long_about = None)]
#[command(version)]
struct Cli {
    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Engine configuration file (defaults to MEMFS_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Owner uid for created objects (defaults to the effective uid)
    #[arg(long, global = true)]
    uid: Option<u32>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a script of filesystem commands
    Run {
        /// Script file, or "-" for stdin
        script: PathBuf,
    },

    /// Read commands interactively from stdin
    Shell,

    /// Show the resolved engine configuration
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = OutputWriter::new(cli.json);
    if let Err(err) = run(cli, &output) {
        output.write_error(&err, 1);
        std::process::exit(1);
    }
}

fn run(cli: Cli, output: &OutputWriter) -> Result<()> {
    let config_path = cli
        .config
        .or_else(|| std::env::var("MEMFS_CONFIG").ok().map(PathBuf::from));
    let config = resolve_config(config_path, cli.uid)?;
    tracing::debug!(owner = config.owner, root_mode = config.root_mode, "resolved config");

    match cli.command {
        Commands::Run { script } => cmd_run(config, &script, output),
        Commands::Shell => cmd_shell(config, output),
        Commands::Config => cmd_config(config, output),
    }
}

/// Install a stderr subscriber filtered by MEMFS_LOG, then RUST_LOG.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("MEMFS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Load `path` (or defaults), then apply `uid`, falling back to the
/// effective uid only when no config file was given.
fn resolve_config(path: Option<PathBuf>, uid: Option<u32>) -> Result<FsConfig> {
    let mut config = match &path {
        Some(path) => FsConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => FsConfig::default(),
    };

    match uid {
        Some(uid) => config.owner = uid,
        None if path.is_none() => config.owner = effective_uid(),
        None => {}
    }

    Ok(config)
}

#[cfg(unix)]
fn effective_uid() -> u32 {
    use std::os::unix::fs::MetadataExt;
    std::fs::metadata("/proc/self")
        .map(|meta| meta.uid())
        .unwrap_or(0)
}

#[cfg(not(unix))]
fn effective_uid() -> u32 {
    0
}

fn cmd_run(config: FsConfig, script: &Path, output: &OutputWriter) -> Result<()> {
    let content = if script == Path::new("-") {
        io::read_to_string(io::stdin()).context("Failed to read script from stdin")?
    } else {
        std::fs::read_to_string(script)
            .with_context(|| format!("Failed to read script {}", script.display()))?
    };

    let mut fs = MemFs::new(config);
    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let Some(command) = script::parse_line(line).with_context(|| format!("line {}", line_no))?
        else {
            continue;
        };
        execute(&mut fs, command, output).with_context(|| format!("line {}", line_no))?;
    }

    Ok(())
}

fn cmd_shell(config: FsConfig, output: &OutputWriter) -> Result<()> {
    let interactive = atty::is(atty::Stream::Stdin) && !output.is_json();
    let mut fs = MemFs::new(config);
    let mut failures = 0usize;

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            print!("memfs> ");
            io::stdout().flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read from stdin")?;

        let result = script::parse_line(&line).and_then(|command| match command {
            Some(command) => execute(&mut fs, command, output),
            None => Ok(()),
        });
        if let Err(err) = result {
            output.write_error(&err, 1);
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{} command(s) failed", failures);
    }
    Ok(())
}

fn cmd_config(config: FsConfig, output: &OutputWriter) -> Result<()> {
    let text = config.to_config_string();
    output.write(
        &ConfigOutput {
            success: true,
            result_code: 0,
            config,
        },
        || text,
    )
}

fn execute(fs: &mut MemFs, command: Command, output: &OutputWriter) -> Result<()> {
    match command {
        Command::Mkdir { path, mode } => {
            let id = fs
                .mkdir(&path, mode)
                .with_context(|| format!("Failed to create directory {}", path))?;
            let kind = fs.node(id)?.kind();
            output.write(
                &CreateOutput {
                    success: true,
                    result_code: 0,
                    path,
                    id,
                    kind,
                },
                String::new,
            )
        }
        Command::Touch { path, mode } => {
            let id = fs
                .mknod(&path, mode)
                .with_context(|| format!("Failed to create file {}", path))?;
            let kind = fs.node(id)?.kind();
            output.write(
                &CreateOutput {
                    success: true,
                    result_code: 0,
                    path,
                    id,
                    kind,
                },
                String::new,
            )
        }
        Command::Write { path, data, offset } => {
            let bytes_written = fs
                .write_at(&path, &data, offset)
                .with_context(|| format!("Failed to write {}", path))?;
            let size = fs.getattr(&path)?.size;
            output.write(
                &WriteOutput {
                    success: true,
                    result_code: 0,
                    path,
                    offset,
                    bytes_written,
                    size,
                },
                String::new,
            )
        }
        Command::Cat { path, size, offset } => {
            let file = fs
                .resolve_file(&path)
                .with_context(|| format!("Failed to read {}", path))?;
            let available = fs.file(file)?.size().saturating_sub(offset);
            let len = size.map_or(available, |size| available.min(size as u64));

            let len = usize::try_from(len).context("File too large to read at once")?;
            let mut buf = vec![0u8; len];
            let bytes_read = fs.read(file, &mut buf, offset)?;

            let content = String::from_utf8_lossy(&buf).into_owned();
            let text = format!("{}\n", content.escape_debug());
            output.write(
                &CatOutput {
                    success: true,
                    result_code: 0,
                    path,
                    offset,
                    bytes_read,
                    content,
                },
                || text,
            )
        }
        Command::Ls { path } => {
            let entries = fs
                .readdir(&path)
                .with_context(|| format!("Failed to list {}", path))?;
            let mut text = String::new();
            for entry in &entries {
                text.push_str(&format!(
                    "{} {:>6} {}\n",
                    kind_char(entry.kind),
                    entry.id,
                    entry.name
                ));
            }
            output.write(
                &LsOutput {
                    success: true,
                    result_code: 0,
                    path,
                    entries,
                },
                || text,
            )
        }
        Command::Stat { path } => {
            let attrs = fs
                .getattr(&path)
                .with_context(|| format!("Failed to stat {}", path))?;
            let stat = StatOutput::new(path, attrs);
            let text = format!(
                "Path: {}\nId: {}\nType: {}\nOwner: {}\nMode: {:o}\nLinks: {}\nSize: {}\nAllocated: {}\nAccess: {}\nModify: {}\nChange: {}\n",
                stat.path,
                stat.attrs.id,
                stat.attrs.kind.as_str(),
                stat.attrs.owner,
                stat.attrs.st_mode,
                stat.attrs.nlink,
                stat.attrs.size,
                stat.attrs.allocated,
                stat.atime_human,
                stat.mtime_human,
                stat.ctime_human,
            );
            output.write(&stat, || text)
        }
        Command::Ln { from, to } => {
            let id = fs
                .link(&from, &to)
                .with_context(|| format!("Failed to link {} to {}", from, to))?;
            let nlink = fs.node(id)?.nlink();
            output.write(
                &LinkOutput {
                    success: true,
                    result_code: 0,
                    from,
                    to,
                    id,
                    nlink,
                },
                String::new,
            )
        }
        Command::Rm { path } => {
            fs.unlink(&path)
                .with_context(|| format!("Failed to remove {}", path))?;
            output.write(
                &RemoveOutput {
                    success: true,
                    result_code: 0,
                    path,
                },
                String::new,
            )
        }
        Command::Rmdir { path } => {
            fs.rmdir(&path)
                .with_context(|| format!("Failed to remove directory {}", path))?;
            output.write(
                &RemoveOutput {
                    success: true,
                    result_code: 0,
                    path,
                },
                String::new,
            )
        }
        Command::Truncate { path, size } => {
            fs.truncate_path(&path, size)
                .with_context(|| format!("Failed to truncate {}", path))?;
            output.write(
                &TruncateOutput {
                    success: true,
                    result_code: 0,
                    path,
                    size,
                },
                String::new,
            )
        }
        Command::Utime { path, atime, mtime } => {
            fs.utimens(&path, atime, mtime)
                .with_context(|| format!("Failed to set times on {}", path))?;
            output.write(
                &UtimeOutput {
                    success: true,
                    result_code: 0,
                    path,
                    atime,
                    mtime,
                },
                String::new,
            )
        }
        Command::Tree { path } => {
            let entries = fs
                .walk(&path)
                .with_context(|| format!("Failed to walk {}", path))?;
            let mut text = String::new();
            for entry in &entries {
                let name = match entry.depth {
                    0 => entry.path.as_str(),
                    _ => entry.path.rsplit('/').next().unwrap_or_default(),
                };
                text.push_str(&format!(
                    "{}{}{}\n",
                    "  ".repeat(entry.depth),
                    name,
                    if entry.depth > 0 && entry.attrs.kind == FileKind::Directory {
                        "/"
                    } else {
                        ""
                    }
                ));
            }
            output.write(
                &TreeOutput {
                    success: true,
                    result_code: 0,
                    entries,
                },
                || text,
            )
        }
        Command::Fsck => {
            let report = fs.fsck();
            let objects = fs.store().len();
            let text = if report.is_clean() {
                format!("clean: {} objects\n", objects)
            } else {
                format!(
                    "{} link mismatches, {} unreachable objects\n",
                    report.link_mismatches.len(),
                    report.unreachable.len()
                )
            };
            let clean = report.is_clean();
            output.write(
                &FsckOutput {
                    success: clean,
                    result_code: if clean { 0 } else { 1 },
                    objects,
                    report,
                },
                || text,
            )?;
            if !clean {
                bail!("Filesystem check found inconsistencies");
            }
            Ok(())
        }
    }
}
