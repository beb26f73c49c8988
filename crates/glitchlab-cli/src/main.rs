use clap::Parser;
use glitchlab_cli::args::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    glitchlab_cli::init_tracing(cli.verbose);
    glitchlab_cli::run::run(cli)
}
