use clap::{Parser, Subcommand};
use embedfs::embedder::{ArtifactPaths, EmbedOptions, Embedder};
use embedfs::manifest::Manifest;
use embedfs::vfs::{DiskFs, FileSource, FileStream};
use embedfs::{identity_hash, EmbeddedFs};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "embedfs", about = "Build and inspect embedded file artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack files and directories into <OUTPUT>.idx and <OUTPUT>.blob
    Pack {
        /// Artifact stem; suffixes are appended
        #[arg(short, long)]
        output: PathBuf,
        /// Remove this prefix from input paths to form logical names
        #[arg(long)]
        strip_prefix: Option<PathBuf>,
        /// Follow symlinks while walking directories
        #[arg(long)]
        follow_links: bool,
        /// Skip unreadable inputs instead of aborting
        #[arg(short, long)]
        keep_going: bool,
        /// Fail when two logical names share an identity hash
        #[arg(long)]
        reject_collisions: bool,
        /// Do not write <OUTPUT>.manifest.json
        #[arg(long)]
        no_manifest: bool,
        #[arg(short, long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// List index entries
    List {
        stem: PathBuf,
    },
    /// Write one embedded file to stdout
    Cat {
        /// Artifact stem, or a directory with --dir
        source: PathBuf,
        name: String,
        /// Read NAME from the directory SOURCE instead of from artifacts
        #[arg(long)]
        dir: bool,
    },
    /// Print the identity hash of each name
    Hash {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Check index/blob consistency and, if present, the manifest
    Verify {
        stem: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(
            &std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default(),
        ))
        .with_writer(io::stderr)
        .init();

    match Cli::parse().command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { output, strip_prefix, follow_links, keep_going, reject_collisions, no_manifest, input } => {
            let opts = EmbedOptions {
                strip_prefix,
                follow_links,
                keep_going,
                reject_collisions,
                write_manifest: !no_manifest,
            };
            let write_manifest = opts.write_manifest;
            let mut embedder = Embedder::with_options(opts);
            for path in &input {
                let added = embedder.add_input(path)?;
                println!("  packed  {} ({} file(s))", path.display(), added);
            }
            let built = embedder.finish();
            let paths = ArtifactPaths::from_stem(&output);
            built.write_to(&paths, write_manifest)?;
            println!("Created: {} ({} entries)", paths.index.display(), built.index.len());
            println!("         {} ({} B)", paths.blob.display(), built.blob.len());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { stem } => {
            let artifacts = Artifacts::load(&stem)?;
            let fs = artifacts.fs()?;
            println!("{:<10} {:>10} {:>10}  Name", "Hash", "Offset", "Size");
            for (i, entry) in fs.entries().enumerate() {
                let name = artifacts.manifest.as_ref()
                    .and_then(|m| m.entries.get(i))
                    .filter(|m| m.identity_hash == entry.identity_hash)
                    .map(|m| m.name.as_str())
                    .unwrap_or("-");
                println!("{:08x}   {:>10} {:>10}  {}", entry.identity_hash, entry.offset, entry.size, name);
            }
        }

        // ── Cat ──────────────────────────────────────────────────────────────
        Commands::Cat { source, name, dir } => {
            if dir {
                cat(&DiskFs::new(&source), &name, io::stdout().lock())?;
            } else {
                let artifacts = Artifacts::load(&source)?;
                cat(&artifacts.fs()?, &name, io::stdout().lock())?;
            }
        }

        // ── Hash ─────────────────────────────────────────────────────────────
        Commands::Hash { names } => {
            for name in &names {
                println!("{:08x}  {}", identity_hash(name), name);
            }
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { stem } => {
            let artifacts = Artifacts::load(&stem)?;
            let fs = artifacts.fs()?;
            match &artifacts.manifest {
                Some(manifest) => {
                    let findings = manifest.verify(&fs);
                    for finding in &findings {
                        println!("  {finding}");
                    }
                    if !findings.is_empty() {
                        return Err(format!("{} problem(s) found", findings.len()).into());
                    }
                    println!("OK: {} entries, {} B, manifest matches", fs.len(), fs.blob().len());
                }
                None => {
                    println!("OK: {} entries, {} B (no manifest; structure only)", fs.len(), fs.blob().len());
                }
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// `RUST_LOG`-style directives, with INFO only when none are given.
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

struct Artifacts {
    index:    Vec<u8>,
    blob:     Vec<u8>,
    manifest: Option<Manifest>,
}

impl Artifacts {
    fn load(stem: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let paths = ArtifactPaths::from_stem(stem);
        let index = std::fs::read(&paths.index)?;
        let blob = std::fs::read(&paths.blob)?;
        let manifest = if paths.manifest.exists() {
            Some(Manifest::from_bytes(&std::fs::read(&paths.manifest)?)?)
        } else {
            None
        };
        Ok(Self { index, blob, manifest })
    }

    fn fs(&self) -> embedfs::Result<EmbeddedFs<'_>> {
        EmbeddedFs::new(&self.index, &self.blob)
    }
}

fn cat<S: FileSource, W: Write>(source: &S, name: &str, mut out: W) -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = source.open(name)?;
    let mut chunk = [0u8; 8192];
    let len = chunk.len();
    loop {
        let n = stream.read_elements(&mut chunk, 1, len)?;
        if n == 0 {
            break;
        }
        out.write_all(&chunk[..n])?;
    }
    out.flush()?;
    Ok(())
}
