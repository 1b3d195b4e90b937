use std::path::PathBuf;

use clap::{Arg, ArgMatches, Command};

pub fn build_cli() -> Command {
    Command::new("auracap-replay")
        .version(env!("CARGO_PKG_VERSION"))
        .author("AuraCap Developers")
        .about("Replay a recorded packet stream through the live view pipeline")
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .help("JSON-lines file of packet summaries and details")
                .value_parser(clap::value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("filter")
                .short('f')
                .long("filter")
                .value_name("QUERY")
                .help("Filter query, e.g. protocol:tcp, ip:10.0.0.1, port:443 or free text"),
        )
        .arg(
            Arg::new("select")
                .short('s')
                .long("select")
                .value_name("ID")
                .help("Packet id whose detail and hex dump are printed")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("limit")
                .short('n')
                .long("limit")
                .value_name("ROWS")
                .help("Maximum filtered rows to print")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("buffer-capacity")
                .long("buffer-capacity")
                .value_name("PACKETS")
                .help("Maximum packets kept in the live buffer")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_name("FILE")
                .help("Settings file (defaults to $XDG_CONFIG_HOME/auracap/settings.json)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("save-settings")
                .long("save-settings")
                .help("Write the effective settings back to the settings file")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the report as JSON")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Parsed command line
#[derive(Debug, Clone)]
pub struct ReplayArgs {
    pub input: PathBuf,
    pub filter: Option<String>,
    pub select: Option<u64>,
    pub limit: Option<usize>,
    pub buffer_capacity: Option<usize>,
    pub settings: Option<PathBuf>,
    pub save_settings: bool,
    pub json: bool,
}

impl ReplayArgs {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            input: matches
                .get_one::<PathBuf>("input")
                .cloned()
                .unwrap_or_default(),
            filter: matches.get_one::<String>("filter").cloned(),
            select: matches.get_one::<u64>("select").copied(),
            limit: matches.get_one::<usize>("limit").copied(),
            buffer_capacity: matches.get_one::<usize>("buffer-capacity").copied(),
            settings: matches.get_one::<PathBuf>("settings").cloned(),
            save_settings: matches.get_flag("save-settings"),
            json: matches.get_flag("json"),
        }
    }
}
