//! Thin wrapper over the `tesseract` binary.

use anyhow::{Context, Result, anyhow, bail};
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

const TESSERACT: &str = "tesseract";

/// Language packs tesseract reports as installed.
pub fn list_tesseract_languages() -> Result<Vec<String>> {
    let stdout = run(Command::new(TESSERACT).arg("--list-langs"))?;
    Ok(installed_from_listing(&stdout))
}

// First line is the "List of available languages ..." banner.
fn installed_from_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
        .collect()
}

/// Turns `recognizer.languages` into the value passed to `-l`.
///
/// Packs that are not installed are skipped with a warning. When the
/// installed list cannot be read the request goes through as is and
/// tesseract reports the problem on first use.
pub(super) fn resolve_languages(requested: &str) -> Result<String> {
    let wanted = requested
        .split(['+', ',', ' '])
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
        .collect::<Vec<_>>();
    if wanted.is_empty() {
        bail!("recognizer.languages is empty");
    }
    match list_tesseract_languages() {
        Ok(installed) => pick_installed(&wanted, &installed),
        Err(err) => {
            debug!("cannot list tesseract languages: {:#}", err);
            Ok(wanted.join("+"))
        }
    }
}

fn pick_installed(wanted: &[&str], installed: &[String]) -> Result<String> {
    let (usable, missing): (Vec<&str>, Vec<&str>) = wanted
        .iter()
        .copied()
        .partition(|lang| installed.iter().any(|pack| pack.as_str() == *lang));
    if usable.is_empty() {
        bail!(
            "no tesseract language pack for {} (installed: {})",
            wanted.join("+"),
            installed.join(", ")
        );
    }
    if !missing.is_empty() {
        warn!("skipping missing tesseract languages: {}", missing.join(", "));
    }
    Ok(usable.join("+"))
}

/// Runs OCR on `image` and returns word-level TSV.
pub(super) fn recognize_tsv(image: &Path, languages: &str, psm: u32) -> Result<String> {
    let psm = psm.to_string();
    run(Command::new(TESSERACT).arg(image).args([
        "stdout",
        "-l",
        languages,
        "--oem",
        "1",
        "--psm",
        psm.as_str(),
        "--dpi",
        "300",
        "tsv",
    ]))
}

fn run(command: &mut Command) -> Result<String> {
    let output = command
        .output()
        .with_context(|| format!("failed to run {} (is it installed?)", TESSERACT))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("{} failed: {}", TESSERACT, stderr.trim()));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_banner_and_blank_lines_are_skipped() {
        let stdout =
            "List of available languages in \"/usr/share/tessdata/\" (3):\neng\ndeu\n\nosd\n";
        assert_eq!(installed_from_listing(stdout), vec!["eng", "deu", "osd"]);
    }

    #[test]
    fn missing_packs_are_skipped() {
        let installed = vec!["eng".to_string(), "deu".to_string()];
        assert_eq!(
            pick_installed(&["eng", "fra", "deu"], &installed).unwrap(),
            "eng+deu"
        );
        assert!(pick_installed(&["fra"], &installed).is_err());
    }

    #[test]
    fn empty_request_is_rejected() {
        assert!(resolve_languages(" + , ").is_err());
    }
}
