//! Files written at the output root once the mirror is complete

use crate::output::writer::SiteWriter;
use crate::rewrite::relative_reference;
use std::io;
use std::path::{Path, PathBuf};

pub const ROOT_INDEX: &str = "index.html";
pub const FAILED_LOG: &str = "failed_urls.txt";

/// Writes a root `index.html` that redirects to the seed page
///
/// Nothing is written if a root index already exists.
///
/// # Returns
///
/// * `Ok(Some(path))` - The redirect was written
/// * `Ok(None)` - A root index was already present
pub fn write_root_redirect(writer: &SiteWriter, seed_path: &Path) -> io::Result<Option<PathBuf>> {
    let index = Path::new(ROOT_INDEX);
    if writer.exists(index) {
        return Ok(None);
    }

    let target = relative_reference(index, seed_path);
    let html = format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"0; url={target}\">\n\
         <title>Redirecting</title>\n\
         </head>\n\
         <body>\n\
         <p><a href=\"{target}\">Open the mirrored site</a></p>\n\
         </body>\n\
         </html>\n"
    );

    writer.write(index, html.as_bytes()).map(Some)
}

/// Writes the sorted list of permanently failed URLs
///
/// A log left over from an earlier run is removed when nothing failed.
pub fn write_failed_log(writer: &SiteWriter, failed: &[String]) -> io::Result<Option<PathBuf>> {
    let log = Path::new(FAILED_LOG);

    if failed.is_empty() {
        if writer.exists(log) {
            std::fs::remove_file(writer.absolute(log))?;
        }
        return Ok(None);
    }

    let mut sorted = failed.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut contents = sorted.join("\n");
    contents.push('\n');
    writer.write(log, contents.as_bytes()).map(Some)
}
