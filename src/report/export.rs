use std::io::Write;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::profile::{InfoSort, Profile, SortOrder};

/// Configuration for the delimited per-event export.
///
/// With the defaults, each exported line looks like:
///
/// ```text
/// Q1\t10\t15\tEvent1\n
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Field separator. Defaults to `"\t"`.
    pub separator: String,
    /// Line terminator. Defaults to `"\n"`.
    pub newline: String,
    /// String wrapped around the queue name. Defaults to `""`.
    pub queue_delim: String,
    /// String wrapped around the event name. Defaults to `""`.
    pub evname_delim: String,
    /// Subtract the session's earliest start instant from all exported
    /// timestamps, so the trace starts at 0 rather than at raw device
    /// time. Defaults to `true`.
    pub zero_start: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            separator: "\t".to_string(),
            newline: "\n".to_string(),
            queue_delim: String::new(),
            evname_delim: String::new(),
            zero_start: true,
        }
    }
}

// Process-wide default export options, snapshot on read and replaced
// wholesale on write, both under the lock.
static DEFAULTS: Lazy<Mutex<ExportOptions>> = Lazy::new(|| Mutex::new(ExportOptions::default()));

/// Returns a snapshot of the process-wide default export options.
pub fn export_defaults() -> ExportOptions {
    DEFAULTS.lock().unwrap().clone()
}

/// Replaces the process-wide default export options.
pub fn set_export_defaults(options: ExportOptions) {
    *DEFAULTS.lock().unwrap() = options;
}

/// Exports one delimited line per recorded event, ordered by start
/// timestamp.
///
/// Line format:
///
/// ```text
/// <queue_delim><queue><queue_delim><sep><start><sep><end><sep><evname_delim><name><evname_delim><newline>
/// ```
///
/// I/O failures surface as
/// [`Error::StreamWrite`](crate::Error::StreamWrite) and leave the
/// computed profile untouched, so the export may simply be retried.
pub fn export<W>(prof: &mut Profile, options: &ExportOptions, mut writer: W) -> Result<()>
where
    W: Write,
{
    let zero = if options.zero_start {
        prof.earliest_start()?
    } else {
        0
    };

    let mut start_buf = itoa::Buffer::new();
    let mut end_buf = itoa::Buffer::new();
    for info in prof.infos(InfoSort::Started, SortOrder::Ascending)? {
        let times = info.times();
        let start = start_buf.format(times.started.saturating_sub(zero));
        let end = end_buf.format(times.ended.saturating_sub(zero));
        for part in [
            options.queue_delim.as_str(),
            info.queue_name(),
            options.queue_delim.as_str(),
            options.separator.as_str(),
            start,
            options.separator.as_str(),
            end,
            options.separator.as_str(),
            options.evname_delim.as_str(),
            info.event_name(),
            options.evname_delim.as_str(),
            options.newline.as_str(),
        ] {
            writer.write_all(part.as_bytes())?;
        }
    }
    Ok(())
}

/// Exports with the process-wide default options. See [`export`].
pub fn export_default<W>(prof: &mut Profile, writer: W) -> Result<()>
where
    W: Write,
{
    let options = export_defaults();
    export(prof, &options, writer)
}
