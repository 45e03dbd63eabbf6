use std::io::Write;
use std::process::ExitCode;

use dvtag::catalog::dlsite::DlsiteClient;
use dvtag::cli::commands::Cli;
use dvtag::signal::{install_interrupt_handler, INTERRUPTED_EXIT_CODE};
use dvtag::transcode::Transcoder;
use dvtag::utils::reporting::Reporter;
use dvtag::{CancellationFlag, CatalogResolver, Config, DvtagError, FormatWriters, LibraryWalker};
use log::{error, info, warn};

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse_normalized();

    let cwd = std::env::current_dir().unwrap_or_default();
    let mut config = Config::load(cli.config.as_deref(), &cwd);
    if let Some(jobs) = cli.jobs {
        config.jobs = usize::from(jobs);
    }
    info!("Initialized with {} worker(s)", config.jobs);

    let client = match DlsiteClient::new(config.embed_cover) {
        Ok(client) => client,
        Err(e) => {
            error!("Cannot create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let resolver = CatalogResolver::new(client, config.retry.clone());
    let writers = FormatWriters::default();
    let transcoder = cli
        .transcode_target()
        .map(|target| Transcoder::new(&config.ffmpeg, target));

    let cancel = CancellationFlag::new();
    if let Err(e) = install_interrupt_handler(cancel.clone()) {
        warn!("Ctrl-C handling unavailable: {}", e);
    }

    let walker = LibraryWalker::new(&config, &resolver, &writers)
        .with_transcoder(transcoder.as_ref())
        .with_cancellation(cancel);

    let summary = match walker.run(&cli.dirpath) {
        Ok(summary) => summary,
        Err(e @ DvtagError::RootUnreadable { .. }) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("Run aborted: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let reporter = Reporter::new();
    reporter.print_summary(&summary);
    if let Some(path) = &cli.report {
        if let Err(e) = reporter.write_csv(&summary, path) {
            error!("Error generating report: {}", e);
        }
    }

    if summary.was_cancelled() {
        ExitCode::from(INTERRUPTED_EXIT_CODE as u8)
    } else {
        ExitCode::SUCCESS
    }
}
