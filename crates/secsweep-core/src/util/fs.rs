//! Output directory preparation.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SweepError};

const CHECK_FILE: &str = ".secsweep-write-check";

/// Create `dir` if needed and prove it is writable.
///
/// This is the only check that may abort a run; it happens before any step
/// executes.
pub fn ensure_writable_dir(dir: &Path) -> Result<()> {
    let unwritable = |source: std::io::Error| SweepError::OutputDirUnwritable {
        path: dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(unwritable)?;

    let marker = dir.join(CHECK_FILE);
    let mut file = fs::File::create(&marker).map_err(unwritable)?;
    file.write_all(b"ok").map_err(unwritable)?;
    drop(file);
    fs::remove_file(&marker).map_err(unwritable)?;

    debug!("Output directory {} is writable", dir.display());
    Ok(())
}
