//! vdir CLI
//!
//! Inspect and edit a virtual directory container from the shell.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use vdir::{Config, OpenMode, Result, VirtualDirectory};

/// vdir CLI
#[derive(Parser, Debug)]
#[command(name = "vdir")]
#[command(about = "Inspect and edit single-file virtual directories")]
#[command(version)]
struct Args {
    /// Virtual directory (holds the container file)
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Container file name inside the directory
    #[arg(long, default_value = vdir::config::DEFAULT_FILE_NAME)]
    file_name: String,

    /// Skip fsync when closing
    #[arg(long)]
    no_sync: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List entries with their offsets and sizes
    Ls,

    /// Print an entry's payload
    Get {
        /// Entry name
        name: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Store a file's contents as an entry
    Put {
        /// Entry name
        name: String,

        /// Source file
        file: PathBuf,
    },

    /// Remove an entry
    Rm {
        /// Entry name
        name: String,
    },

    /// Show container size and free space
    Stat,
}

impl Commands {
    fn mode(&self) -> OpenMode {
        match self {
            Commands::Ls | Commands::Get { .. } | Commands::Stat => OpenMode::READ,
            Commands::Put { .. } | Commands::Rm { .. } => OpenMode::BOTH,
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vdir=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .dir(&args.dir)
        .file_name(&args.file_name)
        .sync_on_close(!args.no_sync)
        .build();
    let mode = args.command.mode();

    if let Err(e) = VirtualDirectory::with_session(config, mode, |dir| run(dir, &args.command)) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(dir: &mut VirtualDirectory, command: &Commands) -> Result<()> {
    match command {
        Commands::Ls => {
            let names: Vec<String> = dir.names().map(str::to_string).collect();
            for name in names {
                let offset = dir.entry_offset(&name).unwrap_or_default();
                let size = dir.entry_size(&name)?;
                println!("{:>10} {:>10}  {}", offset, size, name);
            }
        }
        Commands::Get { name, output } => {
            let data = dir.read(name)?;
            match output {
                Some(path) => fs::write(path, &data)?,
                None => io::stdout().write_all(&data)?,
            }
        }
        Commands::Put { name, file } => {
            let data = fs::read(file)?;
            dir.write(name, &data)?;
            tracing::info!(name = %name, bytes = data.len(), "stored entry");
        }
        Commands::Rm { name } => {
            dir.remove(name)?;
            tracing::info!(name = %name, "removed entry");
        }
        Commands::Stat => {
            let free = dir.free_list();
            println!("container:   {}", dir.path().display());
            println!("entries:     {}", dir.len());
            println!("data end:    {}", dir.file_size());
            println!("free ranges: {} ({} bytes)", free.len(), free.total_free());
            for (offset, len) in free.iter() {
                println!("  {:>10} {:>10}", offset, len);
            }
        }
    }

    Ok(())
}
