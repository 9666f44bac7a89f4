//! Zone split: decompose multi-zone security rules into single-zone
//! clones placed immediately before the original.
//!
//! Every clone and its original get a marker tag, so a second run over the
//! same rulebase plans nothing. Clones are rewrites of the original's raw
//! element, so rule fields beyond the name and zone lists carry over
//! untouched; the marker tag is applied with an additive set that leaves
//! the rest of the rule alone on the device. Planning is pure; the handler
//! only walks the plan, fail-fast, to keep partial writes visible.

use panoply_api::{Error as ApiError, RuleEntry};

use crate::cli::{GlobalOpts, ZoneSplitArgs};
use crate::config::Config;
use crate::connect;
use crate::error::CliError;
use crate::runlog::RunLog;

/// Effective split settings after flag/config merging.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub marker_tag: String,
    pub suffix: String,
    pub include_disabled: bool,
    pub ignore_tags: Vec<String>,
}

pub async fn handle(
    args: &ZoneSplitArgs,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let device_group = args
        .device_group
        .clone()
        .or_else(|| config.device_group.clone())
        .ok_or_else(|| CliError::Validation {
            field: "device_group".into(),
            reason: "pass --device-group or set device_group in the config file".into(),
        })?;

    let opts = SplitOptions {
        marker_tag: args.tag.clone().unwrap_or_else(|| config.rule_tag.clone()),
        suffix: args
            .suffix
            .clone()
            .unwrap_or_else(|| config.rule_suffix.clone()),
        include_disabled: args.include_disabled || config.include_disabled,
        ignore_tags: config.ignore_tags.clone(),
    };

    let session = connect::establish(global, config).await?;
    let mut log = RunLog::open(&config.log_file);
    log.line(&format!("Connected to {}", session.mode()));

    let pano = connect::require_panorama(session, "zone-split")?;

    let rules = pano.post_rulebase(&device_group).await?;
    log.line(&format!(
        "Scanning {} rules in the '{device_group}' post-rulebase",
        rules.len()
    ));

    let mut split_count = 0usize;
    for rule in &rules {
        let clones = plan_split(rule, &opts)?;
        if clones.is_empty() {
            continue;
        }

        log.blank();
        log.line(&format!(
            "Splitting '{}' into {} single-zone clones",
            rule.name(),
            clones.len()
        ));
        for clone in &clones {
            pano.create_rule(&device_group, clone).await?;
            pano.move_rule_before(&device_group, clone.name(), rule.name())
                .await?;
            pano.tag_rule(&device_group, clone.name(), &opts.marker_tag)
                .await?;
            log.line(&format!(
                "  created {} ({} -> {})",
                clone.name(),
                clone.from_zones().join(","),
                clone.to_zones().join(",")
            ));
        }
        // Tag the original last: an aborted run leaves it untagged and a
        // re-run plans it again rather than leaving it half-split.
        pano.tag_rule(&device_group, rule.name(), &opts.marker_tag)
            .await?;
        split_count += 1;
    }

    log.blank();
    log.line(&format!("Total source rules cloned: {split_count}"));
    Ok(())
}

/// Plan the clones for one rule; an empty plan means the rule is not
/// eligible.
///
/// Eligible rules have at least two source and two destination zones, no
/// marker tag, no ignore tag, and are enabled (unless disabled rules are
/// included). Clones cover the cartesian product of zone pairs minus the
/// same-zone diagonal, numbered from 1 in that order.
pub fn plan_split(rule: &RuleEntry, opts: &SplitOptions) -> Result<Vec<RuleEntry>, ApiError> {
    if rule.from_zones().len() < 2 || rule.to_zones().len() < 2 {
        return Ok(Vec::new());
    }
    if rule.has_tag(&opts.marker_tag) {
        return Ok(Vec::new());
    }
    if rule.is_disabled() && !opts.include_disabled {
        return Ok(Vec::new());
    }
    if opts.ignore_tags.iter().any(|t| rule.has_tag(t)) {
        return Ok(Vec::new());
    }

    let mut clones = Vec::new();
    for src in rule.from_zones() {
        for dst in rule.to_zones() {
            if src == dst {
                continue;
            }
            let name = format!("{}{}{}", rule.name(), opts.suffix, clones.len() + 1);
            clones.push(rule.clone_for_zone_pair(&name, src, dst)?);
        }
    }
    Ok(clones)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn rule(name: &str, from: &[&str], to: &[&str], extra: &str) -> RuleEntry {
        let members = |zones: &[&str]| {
            zones
                .iter()
                .map(|z| format!("<member>{z}</member>"))
                .collect::<String>()
        };
        let xml = format!(
            r#"<entry name="{name}">
                <from>{}</from>
                <to>{}</to>
                <source><member>any</member></source>
                <destination><member>any</member></destination>
                <application><member>any</member></application>
                <service><member>any</member></service>
                <action>allow</action>
                {extra}
            </entry>"#,
            members(from),
            members(to),
        );
        RuleEntry::parse(&xml).expect("parse rule")
    }

    fn opts() -> SplitOptions {
        SplitOptions {
            marker_tag: "ZONE_SPLIT".into(),
            suffix: "_clone_".into(),
            include_disabled: false,
            ignore_tags: Vec::new(),
        }
    }

    #[test]
    fn clones_cover_distinct_zone_pairs_in_order() {
        let rule = rule("allow-web", &["a", "b", "c"], &["d", "e"], "");
        let clones = plan_split(&rule, &opts()).expect("plan");

        assert_eq!(clones.len(), 6);
        let pairs: Vec<(&str, &str)> = clones
            .iter()
            .map(|c| {
                (
                    c.from_zones().first().map(String::as_str).expect("src"),
                    c.to_zones().first().map(String::as_str).expect("dst"),
                )
            })
            .collect();
        assert_eq!(pairs, vec![
            ("a", "d"),
            ("a", "e"),
            ("b", "d"),
            ("b", "e"),
            ("c", "d"),
            ("c", "e"),
        ]);
        assert_eq!(clones[0].name(), "allow-web_clone_1");
        assert_eq!(clones[5].name(), "allow-web_clone_6");
    }

    #[test]
    fn same_zone_pairs_are_excluded() {
        let rule = rule("intra", &["a", "b"], &["a", "b"], "");
        let clones = plan_split(&rule, &opts()).expect("plan");

        assert_eq!(clones.len(), 2);
        assert_eq!(clones[0].from_zones(), ["a"]);
        assert_eq!(clones[0].to_zones(), ["b"]);
        assert_eq!(clones[1].from_zones(), ["b"]);
        assert_eq!(clones[1].to_zones(), ["a"]);
    }

    #[test]
    fn clones_carry_fields_beyond_the_zone_lists() {
        let rule = rule(
            "targeted",
            &["a", "b"],
            &["c", "d"],
            "<schedule>work-hours</schedule>\
             <target><devices><entry name=\"007951000001\"/></devices></target>",
        );
        let clones = plan_split(&rule, &opts()).expect("plan");

        assert_eq!(clones.len(), 4);
        for clone in &clones {
            assert!(clone.element().contains("<schedule>work-hours</schedule>"));
            assert!(clone
                .element()
                .contains(r#"<target><devices><entry name="007951000001"/></devices></target>"#));
            assert!(clone.element().contains("<action>allow</action>"));
        }
        // the original is left untouched by planning
        assert_eq!(rule.from_zones(), ["a", "b"]);
        assert!(rule.element().contains("<schedule>work-hours</schedule>"));
    }

    #[test]
    fn tagged_rules_are_not_planned_again() {
        let rule = rule(
            "done",
            &["a", "b"],
            &["c", "d"],
            "<tag><member>ZONE_SPLIT</member></tag>",
        );
        assert!(plan_split(&rule, &opts()).expect("plan").is_empty());
    }

    #[test]
    fn single_zone_rules_are_not_eligible() {
        let narrow = rule("narrow", &["a"], &["c", "d"], "");
        assert!(plan_split(&narrow, &opts()).expect("plan").is_empty());
        let tight = rule("tight", &["a", "b"], &["c"], "");
        assert!(plan_split(&tight, &opts()).expect("plan").is_empty());
    }

    #[test]
    fn disabled_rules_are_skipped_unless_included() {
        let rule = rule(
            "parked",
            &["a", "b"],
            &["c", "d"],
            "<disabled>yes</disabled>",
        );
        assert!(plan_split(&rule, &opts()).expect("plan").is_empty());

        let include = SplitOptions {
            include_disabled: true,
            ..opts()
        };
        let clones = plan_split(&rule, &include).expect("plan");
        assert!(!clones.is_empty());
        assert!(clones.iter().all(RuleEntry::is_disabled));
    }

    #[test]
    fn ignore_tags_exempt_a_rule() {
        let rule = rule(
            "fragile",
            &["a", "b"],
            &["c", "d"],
            "<tag><member>no-touch</member></tag>",
        );
        let exempt = SplitOptions {
            ignore_tags: vec!["no-touch".into()],
            ..opts()
        };
        assert!(plan_split(&rule, &exempt).expect("plan").is_empty());
        assert!(!plan_split(&rule, &opts()).expect("plan").is_empty());
    }
}
