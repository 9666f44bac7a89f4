//! WildFire verdict batch: submit a file of hashes, tally verdicts.
//!
//! Per-hash failures are counted, not fatal. Ctrl-C stops the loop between
//! lookups and still prints totals for the work already done.

use std::path::Path;
use std::time::Duration;

use panoply_api::{Error as ApiError, TlsMode, TransportConfig, Verdict, WildfireClient};

use crate::cli::{GlobalOpts, WildfireArgs};
use crate::config::Config;
use crate::error::CliError;
use crate::runlog::RunLog;

/// Running verdict tally for one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub malicious: usize,
    pub benign: usize,
    pub errors: usize,
}

impl Totals {
    /// Count one lookup outcome and return its report line.
    fn record(&mut self, hash: &str, outcome: Result<Verdict, ApiError>) -> String {
        match outcome {
            Ok(Verdict::Malware) => {
                self.malicious += 1;
                format!("{hash} : malware")
            }
            Ok(Verdict::Benign) => {
                self.benign += 1;
                format!("{hash} : benign")
            }
            Err(err) => {
                self.errors += 1;
                format!("{hash} : error ({err})")
            }
        }
    }

    /// Hashes that came back with a verdict; failed lookups don't count.
    pub fn submitted(&self) -> usize {
        self.malicious + self.benign
    }
}

pub async fn handle(
    args: &WildfireArgs,
    config: &Config,
    _global: &GlobalOpts,
) -> Result<(), CliError> {
    let api_key = config.resolve_wildfire_key(args.api_key.as_deref())?;
    let hashes = read_hashes(&args.hash_file)?;

    // The public cloud endpoint carries a real certificate; the insecure
    // setting only applies to device management interfaces.
    let transport = TransportConfig {
        tls: TlsMode::System,
        timeout: Duration::from_secs(config.timeout),
    };
    let client = WildfireClient::new(&config.wildfire.url, api_key, &transport)?;

    let mut log = RunLog::open(&config.log_file);
    let mut totals = Totals::default();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    for hash in &hashes {
        let outcome = tokio::select! {
            _ = &mut ctrl_c => {
                log.blank();
                log.line("Keyboard interrupt. Exiting.");
                break;
            }
            outcome = client.verdict(hash) => outcome,
        };
        let line = totals.record(hash, outcome);
        log.line(&line);
    }

    report(&mut log, &totals);
    Ok(())
}

fn read_hashes(path: &Path) -> Result<Vec<String>, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CliError::HashFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

fn report(log: &mut RunLog, totals: &Totals) {
    log.blank();
    log.line("----------  Totals  ----------");
    log.line(&format!("Submitted : {}", totals.submitted()));
    log.line(&format!("Malware   : {}", totals.malicious));
    log.line(&format!("Benign    : {}", totals.benign));
    log.line(&format!("Errors    : {}", totals.errors));
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn every_outcome_lands_in_exactly_one_bucket() {
        let mut totals = Totals::default();

        let line = totals.record("aaaa", Ok(Verdict::Malware));
        assert_eq!(line, "aaaa : malware");
        let line = totals.record("bbbb", Ok(Verdict::Benign));
        assert_eq!(line, "bbbb : benign");
        totals.record(
            "cccc",
            Err(ApiError::Parse {
                message: "report has no <malware> field".into(),
                body: String::new(),
            }),
        );

        assert_eq!(totals, Totals {
            malicious: 1,
            benign: 1,
            errors: 1,
        });
        assert_eq!(totals.submitted(), 2);
    }

    #[test]
    fn partial_batches_keep_their_counts() {
        let mut totals = Totals::default();
        totals.record("aaaa", Ok(Verdict::Benign));
        totals.record("bbbb", Ok(Verdict::Malware));
        // interrupted before the rest of the batch
        assert_eq!(totals.submitted(), 2);
    }

    #[test]
    fn hash_files_skip_blank_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hashes.txt");
        std::fs::write(&path, "aaaa\n\n  \nbbbb\n").expect("write hashes");

        let hashes = read_hashes(&path).expect("read hashes");
        assert_eq!(hashes, ["aaaa", "bbbb"]);
    }

    #[test]
    fn missing_hash_file_is_reported_with_its_path() {
        let err = read_hashes(Path::new("/nonexistent/hashes.txt"))
            .expect_err("missing file");
        assert!(matches!(err, CliError::HashFile { .. }));
    }
}
