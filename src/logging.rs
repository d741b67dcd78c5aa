use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{format, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
    FmtSubscriber,
};

const TIME_FORMAT: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Pick the log level from the number of `-v` flags, or from the configured
/// level name when there is none
pub fn level_from(verbose: u8, configured: &str) -> Level {
    match verbose {
        0 => configured.parse().unwrap_or(Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialize the logging system.
///
/// Logs go to stderr so they never mix with results printed on stdout.
pub fn init_logging(level: Level) -> Result<()> {
    // Reading the local offset can fail once threads exist, UTC will do then
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let subscriber = FmtSubscriber::builder()
        .event_format(PrettyLogger::new(local_offset))
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .into_diagnostic()
        .wrap_err("Setting default subscriber failed")
}

/// One line per event: local time, level, thread, then the event fields
struct PrettyLogger {
    offset: UtcOffset,
}

impl PrettyLogger {
    fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }
}

impl<S, N> FormatEvent<S, N> for PrettyLogger
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();

        let now = OffsetDateTime::now_utc().to_offset(self.offset).time();
        let now = now.format(TIME_FORMAT).map_err(|_| std::fmt::Error)?;
        let thread = std::thread::current();
        let thread_name = thread.name().unwrap_or("?");

        if writer.has_ansi_escapes() {
            let level = match *metadata.level() {
                Level::ERROR => metadata.level().red().to_string(),
                Level::WARN => metadata.level().yellow().to_string(),
                Level::DEBUG => metadata.level().blue().to_string(),
                Level::TRACE => metadata.level().dimmed().to_string(),
                _ => metadata.level().green().to_string(),
            };

            write!(
                &mut writer,
                "{} {:>5} {} ",
                now.dimmed(),
                level,
                thread_name.yellow(),
            )?;
        } else {
            write!(
                &mut writer,
                "{} {:>5} {} ",
                now,
                metadata.level(),
                thread_name,
            )?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
