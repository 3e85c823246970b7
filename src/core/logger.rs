use flexi_logger::filter::{self, LogLineFilter};

/// Drops the HTTP stack's own records, they drown the client's diagnostics
pub struct IgnoreReqwest;

impl IgnoreReqwest {
    fn is_ignored(module_path: &str) -> bool {
        ["reqwest", "hyper", "hyper_util", "h2", "rustls"]
            .iter()
            .any(|p| module_path.starts_with(p))
    }
}

impl LogLineFilter for IgnoreReqwest {
    fn write(
        &self,
        now: &mut flexi_logger::DeferredNow,
        record: &log::Record,
        log_line_writer: &dyn filter::LogLineWriter,
    ) -> std::io::Result<()> {
        let path = record.module_path().unwrap_or_default();

        if IgnoreReqwest::is_ignored(path) {
            return Ok(());
        }

        log_line_writer.write(now, record)
    }
}
