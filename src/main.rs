use anyhow::{Context, Result};
use clap::{App, Arg, ArgMatches, SubCommand};
use log::{error, info, LevelFilter};
use quire::build::build_site;
use quire::config::Config;
use quire::serve::serve;
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};
use url::Url;

const DEFAULT_PORT: &str = "8888";

fn main() {
    let matches = App::new("quire")
        .about("Builds a static site from Markdown pages and a theme")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::with_name("project")
                .short("p")
                .long("project")
                .takes_value(true)
                .default_value(".")
                .help("Directory holding (or below) quire.yaml"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .help("Overrides the output directory"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Logs each page and post as it is processed"),
        )
        .subcommand(SubCommand::with_name("build").about("Builds the site"))
        .subcommand(
            SubCommand::with_name("test")
                .about("Builds the site into a temporary directory and serves it")
                .arg(
                    Arg::with_name("port")
                        .long("port")
                        .takes_value(true)
                        .default_value(DEFAULT_PORT)
                        .help("Port to serve on"),
                ),
        )
        .get_matches();

    init_logging(matches.is_present("verbose"));

    if let Err(e) = run(&matches) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    // Only fails if a logger is already installed.
    let _ = SimpleLogger::new().with_level(level).init();
}

fn run(matches: &ArgMatches) -> Result<()> {
    let project = Path::new(matches.value_of("project").unwrap_or("."));
    let mut config = Config::from_directory(project)?;
    if let Some(output) = matches.value_of("output") {
        config.output_directory = PathBuf::from(output);
    }

    match matches.subcommand() {
        ("test", Some(sub)) => {
            let port: u16 = sub
                .value_of("port")
                .unwrap_or(DEFAULT_PORT)
                .parse()
                .context("Parsing --port")?;
            test(config, port)
        }
        _ => {
            build_site(&config)?;
            Ok(())
        }
    }
}

/// Builds the site into a temporary directory with its URL pointed at the
/// local server, then serves it until interrupted.
fn test(mut config: Config, port: u16) -> Result<()> {
    let output = tempfile::tempdir().context("Creating temporary output")?;
    config.site.url = Url::parse(&format!("http://127.0.0.1:{}/", port))?;
    config.output_directory = output.path().to_owned();
    build_site(&config)?;
    info!("Built test site in {}", output.path().display());
    serve(output.path(), port)
}
