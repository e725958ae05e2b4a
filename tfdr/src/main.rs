mod config;
mod logging;
mod state;

use std::{
    io::{self, IsTerminal as _},
    path::PathBuf,
    process::exit,
};

use anyhow::Result;
use clap::{ColorChoice, CommandFactory as _, Parser, Subcommand};
use config::Configuration;

fn main() {
    let args = Args::parse();
    handle_result(run_args(args));
}

fn run_args(args: Args) -> Result<()> {
    match &args.command {
        Commands::State(sub) => {
            let config = set_up(&args.options)?;
            state::run(&config, sub)
        }
        Commands::Config(sub) => match sub {
            ConfigCommands::Get {} => {
                let config = set_up(&args.options)?;
                config_get(&config)
            }
            // does not read the existing file, which may be missing or broken
            ConfigCommands::New {} => config_new(&args.options),
        },
        Commands::GenerateMan => (|| {
            let cmd = Args::command();
            let man = clap_mangen::Man::new(cmd);
            let mut buffer: Vec<u8> = Default::default();
            man.render(&mut buffer)?;
            println!("{}", String::from_utf8(buffer)?);
            Ok(())
        })(),
        Commands::GenerateMarkdown => {
            let opts = clap_markdown::MarkdownOptions::new().show_footer(false);
            let markdown: String = clap_markdown::help_markdown_custom::<Args>(&opts);
            println!("{}", markdown);
            Ok(())
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(*shell, &mut cmd, "tfdr", &mut io::stdout());
            Ok(())
        }
    }
}

/// Load the configuration and start logging at the level it asks for.
fn set_up(options: &Options) -> Result<Configuration> {
    let config = Configuration::load(options.config.as_deref())?;
    let color = match options.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => io::stderr().is_terminal(),
    };
    logging::set_up(logging::Options {
        verbose: options.verbose,
        level: config.log_level(),
        color,
    })?;
    Ok(config)
}

fn config_get(config: &Configuration) -> Result<()> {
    print!("{}", config.redacted().to_yaml()?);
    Ok(())
}

fn config_new(options: &Options) -> Result<()> {
    let path = match &options.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };
    let mut input = io::stdin().lock();
    let mut output = io::stdout();
    if path.exists() && !config::confirm_overwrite(&mut input, &mut output, &path)? {
        println!("Keeping existing config file {}", path.display());
        return Ok(());
    }
    let new_config = config::prompt_new(&mut input, &mut output)?;
    new_config.save(&path)?;
    println!("Wrote config file {}", path.display());
    Ok(())
}

fn handle_result(r: Result<()>) {
    match r {
        Ok(()) => {}
        Err(e) => {
            eprintln!("tfdr error: {:?}", e);
            exit(1);
        }
    }
}

/// tfdr: copy and prune Terraform Cloud workspace state during disaster recovery
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: Options,
}

#[derive(Parser, Debug, Clone)]
struct Options {
    /// Config file to read instead of ~/.tfdr/config.yaml or ./config.yaml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    /// When to use colors in log output
    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration, with the token redacted
    Get {},

    /// Interactively write a new config file
    New {},
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy or prune the state of Terraform Cloud workspaces
    #[command(subcommand)]
    State(state::Commands),

    /// Show or create the tfdr configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate markdown documentation for tfdr
    #[command(hide = true)]
    GenerateMarkdown,

    /// Generate a manpage for tfdr
    #[command(hide = true)]
    GenerateMan,

    /// Generate shell completion for tfdr
    #[command(hide = true)]
    GenerateCompletion {
        /// The shell to generate completion for
        #[arg(long)]
        shell: clap_complete::Shell,
    },
}
