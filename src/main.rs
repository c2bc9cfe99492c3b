use clap::{Parser, Subcommand};
use sitepress::config::{self, Config};
use sitepress::content::ContentStore;
use sitepress::plugin::{self, PluginRegistry};
use sitepress::{generate, output, runtime};
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "sitepress")]
#[command(about = "Theme-based templater for multi-domain landing sites")]
#[command(long_about = "\
Theme-based templater for multi-domain landing sites

One sitepress.toml lists every site. Each project copies its theme into
build/<domain>/ and fills the PHP templates with its data.

Layout:

  sitepress.toml                   # Projects, data, style rules
  themes/
  └── theme1/
      ├── header.php               # Meta, canonical and schema rewritten per domain
      ├── index.php                # <?= $data['key'] ?> placeholders, [content id=\"1\"]
      ├── robots.txt               # {{DOMAIN}}
      └── sitemap.xml              # {{DOMAIN}}, {{DATE}}
  plugins/
  └── tinymce/
      ├── plugin.toml              # Shortcode and function bindings
      └── data/content-1.html      # Content blocks

Existing files in build/ are never overwritten; use 'build --clean' after
changing a theme. Block commands edit plugins/ unless --domain names a built
site, whose blocks rebuilds keep. Set RUST_LOG=debug for per-file diagnostics.

Run 'sitepress gen-config' to generate a documented sitepress.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file; paths inside it are relative to its directory
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build every project into <build_dir>/<domain>/
    Build {
        /// Remove the build directory first
        #[arg(long)]
        clean: bool,
    },
    /// Validate config and plugins without building
    Check,
    /// Print a stock sitepress.toml with all options documented
    GenConfig,
    /// Manage content blocks of a plugin
    #[command(subcommand)]
    Block(BlockCommand),
}

/// Shared flags for block commands.
#[derive(clap::Args, Clone)]
struct BlockArgs {
    /// Plugin whose data directory holds the blocks
    #[arg(long, default_value = "tinymce")]
    plugin: String,

    /// Edit the blocks a built domain serves instead of the source plugin
    #[arg(long)]
    domain: Option<String>,
}

#[derive(Subcommand)]
enum BlockCommand {
    /// List block ids
    List(BlockArgs),
    /// Create an empty block with the next free id
    New(BlockArgs),
    /// Print a block
    Show {
        id: u32,
        /// Apply the alt and srcset transforms used when serving
        #[arg(long)]
        render: bool,
        #[command(flatten)]
        args: BlockArgs,
    },
    /// Replace a block with the contents of a file
    Save {
        id: u32,
        file: PathBuf,
        #[command(flatten)]
        args: BlockArgs,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Build { clean } => {
            let (config, base) = load(&cli.config)?;
            let plugins = load_plugins(&config, &base)?;
            println!("==> Building {}", base.join(&config.build_dir).display());
            let report = generate::generate(&config, &base, &plugins, clean)?;
            output::print_build_output(&report);
            println!("==> Build complete");
        }
        Command::Check => {
            let (config, base) = load(&cli.config)?;
            let plugins = load_plugins(&config, &base)?;
            println!("==> Checking {}", cli.config.display());
            output::print_check_output(&config, &base, &plugins);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Block(block) => run_block(&cli.config, block)?,
    }

    Ok(())
}

fn load(config_path: &Path) -> Result<(Config, PathBuf), config::ConfigError> {
    let config = config::load_config(config_path)?;
    Ok((config, config::base_dir(config_path)))
}

fn load_plugins(config: &Config, base: &Path) -> Result<PluginRegistry, plugin::PluginError> {
    plugin::load_plugins(&base.join(&config.plugins_dir))
}

fn run_block(config_path: &Path, command: BlockCommand) -> Result<(), Box<dyn std::error::Error>> {
    let (config, base) = load(config_path)?;
    let open_store = |args: &BlockArgs| {
        ContentStore::for_plugin(&config, &base, &args.plugin, args.domain.as_deref())
    };

    match command {
        BlockCommand::List(args) => {
            let store = open_store(&args)?;
            for line in output::format_block_list(&store.list()?, store.dir()) {
                println!("{}", line);
            }
        }
        BlockCommand::New(args) => {
            let store = open_store(&args)?;
            let id = store.create()?;
            println!("Created {} \u{2192} [content id=\"{}\"]", store.path(id).display(), id);
        }
        BlockCommand::Show { id, render, args } => {
            let store = open_store(&args)?;
            let html = store.load(id)?;
            if render {
                // Image paths in blocks are relative to the site root.
                let site_root = match &args.domain {
                    Some(domain) => base.join(&config.build_dir).join(domain),
                    None => base.clone(),
                };
                println!("{}", runtime::transform_response(&html, &site_root, None));
            } else {
                println!("{}", html);
            }
        }
        BlockCommand::Save { id, file, args } => {
            let html = std::fs::read_to_string(&file)?;
            let store = open_store(&args)?;
            let path = store.save(id, &html)?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}
