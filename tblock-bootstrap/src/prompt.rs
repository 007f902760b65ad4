//! Interactive license key entry.

use std::io::{self, BufRead, Write};

use tblock_license::LicenseKey;

/// Text shown to the operator, advertising the cached key as the default.
pub fn prompt_label(cached: Option<&LicenseKey>) -> String {
    match cached {
        Some(key) => format!("Enter license key [{key}]: "),
        None => "Enter license key: ".to_string(),
    }
}

/// Asks for a key on stderr and reads one line from stdin.
///
/// EOF is treated as an empty answer.
pub fn read_key(cached: Option<&LicenseKey>) -> io::Result<String> {
    let mut stderr = io::stderr().lock();
    stderr.write_all(prompt_label(cached).as_bytes())?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}
