pub mod file;
pub mod stdin;

use optmark_core::market_data::loader::{load_quotes, load_quotes_from_path, LoadOptions, LoadedQuotes};
use tracing::debug;

/// Load the quote book from a file, or from piped stdin when no path is given.
pub fn load_book(
    path: Option<&str>,
    options: &LoadOptions,
) -> Result<LoadedQuotes, Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            let resolved = file::resolve_path(p)?;
            debug!(path = %resolved.display(), "reading quote book");
            Ok(load_quotes_from_path(&resolved, options)?)
        }
        None => match stdin::read_stdin()? {
            Some(text) => {
                debug!(bytes = text.len(), "reading quote book from stdin");
                Ok(load_quotes(text.as_bytes(), options)?)
            }
            None => Err("no input: pass --input <file> or pipe CSV on stdin".into()),
        },
    }
}
