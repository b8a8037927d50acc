use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use crossterm::tty::IsTty;
use tracing_subscriber::EnvFilter;

use peruse::app::App;
use peruse::config::Config;
use peruse::document::Document;
use peruse::log_doc::log_document;
use peruse::term::TermScreen;

const USAGE: &str = "\
usage: peruse [options] [file]

Reads the file, or standard input when none is given.

options:
  -f, --follow                 tail the input as it grows
  -S, --no-wrap                scroll horizontally instead of wrapping
  -n, --line-number            show the line-number gutter
  -H, --header N               freeze the first N lines
  -t, --tab-width N            tab stop interval (default 8)
  -d, --column-delimiter S     split columns on S (/re/ for a regex)
      --section-delimiter S    section delimiter regular expression
  -m, --multi-color WORD       highlight WORD (repeatable)
  -h, --help                   show this help
";

#[derive(Default)]
struct Args {
    path: Option<PathBuf>,
    follow: bool,
    no_wrap: bool,
    line_number: bool,
    header: Option<isize>,
    tab_width: Option<usize>,
    column_delimiter: Option<String>,
    section_delimiter: Option<String>,
    multi_color: Vec<String>,
    help: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-f" | "--follow" => args.follow = true,
            "-S" | "--no-wrap" => args.no_wrap = true,
            "-n" | "--line-number" => args.line_number = true,
            "-H" | "--header" => {
                let v = it.next().context("--header needs a number")?;
                args.header = Some(v.parse().context("--header needs a number")?);
            }
            "-t" | "--tab-width" => {
                let v = it.next().context("--tab-width needs a number")?;
                args.tab_width = Some(v.parse().context("--tab-width needs a number")?);
            }
            "-d" | "--column-delimiter" => {
                args.column_delimiter = Some(it.next().context("--column-delimiter needs a value")?);
            }
            "--section-delimiter" => {
                args.section_delimiter = Some(it.next().context("--section-delimiter needs a value")?);
            }
            "-m" | "--multi-color" => {
                args.multi_color.push(it.next().context("--multi-color needs a word")?);
            }
            "-h" | "--help" => args.help = true,
            "-" => args.path = None,
            _ if arg.starts_with('-') => {
                anyhow::bail!("unknown option: {}\n{}", arg, USAGE);
            }
            _ => args.path = Some(PathBuf::from(arg)),
        }
    }
    Ok(args)
}

fn apply_args(config: &mut Config, args: &Args) {
    if args.follow {
        config.general.follow_mode = true;
    }
    if args.no_wrap {
        config.general.wrap_mode = false;
    }
    if args.line_number {
        config.general.line_num_mode = true;
    }
    if let Some(header) = args.header {
        config.general.header = header;
    }
    if let Some(tab_width) = args.tab_width {
        config.general.tab_width = tab_width;
    }
    if let Some(delimiter) = &args.column_delimiter {
        config.general.column_delimiter = delimiter.clone();
        config.general.column_mode = true;
    }
    if let Some(delimiter) = &args.section_delimiter {
        config.general.section_delimiter = delimiter.clone();
        config.general.section_header = true;
    }
    if !args.multi_color.is_empty() {
        config.general.multi_color_words = args.multi_color.clone();
    }
}

fn run() -> anyhow::Result<()> {
    let args = parse_args()?;
    if args.help {
        print!("{}", USAGE);
        return Ok(());
    }
    if args.path.is_none() && std::io::stdin().is_tty() {
        print!("{}", USAGE);
        return Ok(());
    }

    let mut config = match Config::default_path() {
        Some(path) => Config::load(&path).context("loading config")?,
        None => Config::default(),
    };
    apply_args(&mut config, &args);

    // The pager's own diagnostics land in the log document, not the tty.
    let (log_doc, sink) = log_document(&config);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(sink)
        .with_ansi(false)
        .init();

    let (events_tx, events_rx) = std::sync::mpsc::channel();
    let doc = match &args.path {
        Some(path) => Document::open(path, &config, Some(events_tx.clone()))
            .with_context(|| format!("opening {}", path.display()))?,
        None => Document::from_stdin(&config, Some(events_tx.clone())),
    };

    let mut app = App::new(doc, log_doc, config, events_tx, events_rx)?;
    let result = app.run();
    TermScreen::restore();
    result
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            TermScreen::restore();
            eprintln!("peruse: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
