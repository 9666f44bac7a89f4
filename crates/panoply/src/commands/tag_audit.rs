//! Dynamic tag audit: find address objects that carry tags but resolve
//! into no dynamic address group.
//!
//! Membership is a live snapshot from the device, not stored config; an
//! object with tags that the snapshot doesn't know about usually means a
//! tag typo or a dynamic group whose match expression drifted.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use panoply_api::AddressObject;

use crate::cli::{GlobalOpts, TagAuditArgs};
use crate::config::Config;
use crate::connect;
use crate::error::CliError;
use crate::runlog::RunLog;

/// Row for the known-membership audit CSV.
#[derive(Debug, Serialize)]
struct MembershipRow<'a> {
    group: &'a str,
    member: &'a str,
}

/// A tagged address object absent from every dynamic group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub device_group: String,
    pub object: String,
    /// Tags joined with `;` to keep a fixed three-column layout.
    pub tags: String,
}

pub async fn handle(
    args: &TagAuditArgs,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let session = connect::establish(global, config).await?;
    let mut log = RunLog::open(&config.log_file);
    log.line(&format!("Connected to {}", session.mode()));

    let pano = connect::require_panorama(session, "tag-audit")?;

    // Address objects across the organization: shared scope plus every
    // device group.
    let mut objects: Vec<(String, AddressObject)> = pano
        .shared_address_objects()
        .await?
        .into_iter()
        .map(|obj| ("shared".to_owned(), obj))
        .collect();
    for group in pano.device_groups().await? {
        for obj in pano.address_objects(&group).await? {
            objects.push((group.clone(), obj));
        }
    }

    let snapshot = pano.dynamic_group_snapshot().await?;
    let grouped = snapshot.member_set();

    let members_csv = args.members_csv.as_deref().unwrap_or(&config.members_csv);
    write_members_csv(members_csv, &snapshot.memberships())?;

    let anomalies = find_anomalies(&objects, &grouped);

    log.blank();
    for anomaly in &anomalies {
        log.line(&format!(
            "{} : {} is tagged [{}] but in no dynamic group",
            anomaly.device_group, anomaly.object, anomaly.tags
        ));
    }

    let anomalies_csv = args
        .anomalies_csv
        .as_deref()
        .unwrap_or(&config.anomalies_csv);
    write_anomalies_csv(anomalies_csv, &anomalies)?;

    log.blank();
    log.line(&format!(
        "Tagged objects outside any dynamic group: {}",
        anomalies.len()
    ));
    log.line(&format!(
        "Audit trails written to {} and {}",
        members_csv.display(),
        anomalies_csv.display()
    ));
    Ok(())
}

/// Flag every object that carries at least one tag but is absent from the
/// flattened membership set. Objects with zero tags are never flagged,
/// regardless of group membership.
fn find_anomalies(
    objects: &[(String, AddressObject)],
    grouped: &HashSet<&str>,
) -> Vec<Anomaly> {
    objects
        .iter()
        .filter(|(_, obj)| !obj.tags.is_empty() && !grouped.contains(obj.name.as_str()))
        .map(|(device_group, obj)| Anomaly {
            device_group: device_group.clone(),
            object: obj.name.clone(),
            tags: obj.tags.join(";"),
        })
        .collect()
}

fn write_members_csv(path: &Path, rows: &[(&str, &str, &str)]) -> Result<(), CliError> {
    let csv_err = |source| CliError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for (_, group, member) in rows {
        writer
            .serialize(MembershipRow { group, member })
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|e| CliError::Csv {
        path: path.display().to_string(),
        source: e.into(),
    })
}

fn write_anomalies_csv(path: &Path, anomalies: &[Anomaly]) -> Result<(), CliError> {
    let csv_err = |source| CliError::Csv {
        path: path.display().to_string(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for anomaly in anomalies {
        writer.serialize(anomaly).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| CliError::Csv {
        path: path.display().to_string(),
        source: e.into(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn obj(name: &str, tags: &[&str]) -> AddressObject {
        AddressObject {
            name: name.to_owned(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        }
    }

    #[test]
    fn untagged_objects_are_never_flagged() {
        let objects = vec![("branch".to_owned(), obj("quiet-host", &[]))];
        let grouped = HashSet::new();
        assert!(find_anomalies(&objects, &grouped).is_empty());
    }

    #[test]
    fn tagged_object_outside_all_groups_is_flagged_once() {
        let objects = vec![
            ("branch".to_owned(), obj("stray", &["quarantine", "web"])),
            ("branch".to_owned(), obj("member", &["quarantine"])),
        ];
        let grouped: HashSet<&str> = ["member"].into_iter().collect();

        let anomalies = find_anomalies(&objects, &grouped);
        assert_eq!(anomalies, vec![Anomaly {
            device_group: "branch".to_owned(),
            object: "stray".to_owned(),
            tags: "quarantine;web".to_owned(),
        }]);
    }

    #[test]
    fn grouped_objects_are_not_flagged() {
        let objects = vec![("dc".to_owned(), obj("member", &["db"]))];
        let grouped: HashSet<&str> = ["member"].into_iter().collect();
        assert!(find_anomalies(&objects, &grouped).is_empty());
    }

    #[test]
    fn anomaly_csv_rows_have_fixed_columns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("anomalies.csv");
        let anomalies = vec![Anomaly {
            device_group: "branch".to_owned(),
            object: "stray".to_owned(),
            tags: "a;b".to_owned(),
        }];

        write_anomalies_csv(&path, &anomalies).expect("write csv");
        let contents = std::fs::read_to_string(&path).expect("read csv");
        assert_eq!(contents, "device_group,object,tags\nbranch,stray,a;b\n");
    }
}
