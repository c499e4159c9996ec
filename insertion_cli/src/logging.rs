//! Console and file log setup.

use std::path::Path;

use insertion_config::Logging;
use tracing_appender::rolling::{self, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::cli::FILE_GUARD;

fn rotation(name: Option<&str>) -> Rotation {
    match name.map(str::to_ascii_lowercase).as_deref() {
        Some("daily") => Rotation::DAILY,
        Some("hourly") => Rotation::HOURLY,
        _ => Rotation::NEVER,
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the level; the
/// command-line level overrides `[logging] level`.
///
/// Console output goes to stderr so stdout stays parseable; a `[logging]
/// file` tees the same output into a non-blocking rolling file whose guard
/// lives in [`FILE_GUARD`] for the rest of the process.
pub fn init(json: bool, level: Option<&str>, cfg: &Logging) {
    let level = level.or(cfg.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file = cfg.file.as_deref().map(Path::new).and_then(|path| {
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map_or_else(|| "insertion.log".to_string(), |n| n.to_string_lossy().into_owned());
        let appender = match rolling::RollingFileAppender::builder()
            .rotation(rotation(cfg.rotation.as_deref()))
            .filename_prefix(name)
            .build(dir)
        {
            Ok(a) => a,
            Err(e) => {
                eprintln!("cannot open log file {}: {e}", path.display());
                return None;
            }
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        Some(writer)
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let res = match (json, file) {
        (true, Some(f)) => builder
            .json()
            .with_writer(std::io::stderr.and(f))
            .try_init(),
        (true, None) => builder.json().with_writer(std::io::stderr).try_init(),
        (false, Some(f)) => builder
            .compact()
            .with_writer(std::io::stderr.and(f))
            .try_init(),
        (false, None) => builder.compact().with_writer(std::io::stderr).try_init(),
    };
    if let Err(e) = res {
        eprintln!("logging already initialised: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_names() {
        assert_eq!(rotation(Some("Daily")), Rotation::DAILY);
        assert_eq!(rotation(Some("hourly")), Rotation::HOURLY);
        assert_eq!(rotation(Some("weekly")), Rotation::NEVER);
        assert_eq!(rotation(None), Rotation::NEVER);
    }
}
