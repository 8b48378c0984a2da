use clap::{Parser, Subcommand};
use seedfs::commands::{self, CatArgs, ListArgs, MountArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seedfs")]
#[command(version, about = "Read-only FUSE filesystem of deterministic pseudo-random files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Mount the files using ./seedfs mount /mnt/seedfs -f testfile_1M,1M,1")]
    Mount(MountArgs),
    #[command(about = "Print a file's content using ./seedfs cat testfile_1M,1M,1 testfile_1M")]
    Cat(CatArgs),
    #[command(about = "List name, size and seed of each file")]
    List(ListArgs),
}

fn init_tracing() {
    // stdout carries file content for `cat`
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Mount(args) => commands::mount(args).await,
        Commands::Cat(args) => commands::cat(args),
        Commands::List(args) => commands::list(args),
    }
}
