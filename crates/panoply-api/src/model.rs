//! Typed views of the XML payloads the management API exchanges.
//!
//! The API speaks `<entry name="…">` elements with `<member>` lists; these
//! structs round-trip through quick-xml so a cloned rule keeps every field
//! of the original apart from the ones the caller rewrites.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ── Member lists ─────────────────────────────────────────────────────

/// A `<member>` list, e.g. `<from><member>trust</member></from>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Members {
    #[serde(default, rename = "member")]
    pub member: Vec<String>,
}

impl Members {
    pub fn one(value: impl Into<String>) -> Self {
        Self {
            member: vec![value.into()],
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.member.iter().any(|m| m == value)
    }
}

impl<S: Into<String>> FromIterator<S> for Members {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            member: iter.into_iter().map(Into::into).collect(),
        }
    }
}

// ── Response envelope ────────────────────────────────────────────────

/// Minimal envelope view used to check `<response status="…">` before the
/// typed payload is deserialized.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(rename = "@status")]
    pub status: String,
    #[serde(rename = "@code")]
    pub code: Option<String>,
}

/// Full envelope carrying a typed `<result>` payload.
#[derive(Debug, Deserialize)]
pub(crate) struct Response<T> {
    pub result: T,
}

/// Keygen result: `<result><key>…</key></result>`.
#[derive(Debug, Deserialize)]
pub(crate) struct KeygenResult {
    pub key: String,
}

// ── System info ──────────────────────────────────────────────────────

/// `show system info` payload (the subset the tools need).
#[derive(Debug, Clone, Deserialize)]
pub struct SystemInfo {
    pub hostname: String,
    pub model: String,
    #[serde(rename = "sw-version")]
    pub sw_version: Option<String>,
    pub serial: Option<String>,
}

impl SystemInfo {
    /// Panorama reports its model literally as `Panorama` (virtual
    /// appliance) or an `M-…` management appliance model.
    pub fn is_panorama(&self) -> bool {
        self.model.eq_ignore_ascii_case("panorama") || self.model.starts_with("M-")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SystemInfoResult {
    pub system: SystemInfo,
}

// ── Device groups ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceGroupResult {
    #[serde(rename = "device-group")]
    pub device_group: Option<DeviceGroupNode>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DeviceGroupNode {
    #[serde(default, rename = "entry")]
    pub entries: Vec<NamedEntry>,
}

/// An `<entry name="…">` where only the name matters.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedEntry {
    #[serde(rename = "@name")]
    pub name: String,
}

// ── Address objects ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct AddressResult {
    pub address: Option<AddressNode>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AddressNode {
    #[serde(default, rename = "entry")]
    pub entries: Vec<AddressEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AddressEntry {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(default)]
    pub tag: Option<Members>,
}

/// An address object and the tags attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressObject {
    pub name: String,
    pub tags: Vec<String>,
}

impl From<AddressEntry> for AddressObject {
    fn from(entry: AddressEntry) -> Self {
        Self {
            name: entry.name,
            tags: entry.tag.map(|t| t.member).unwrap_or_default(),
        }
    }
}

// ── Dynamic address group snapshot ───────────────────────────────────

// Raw shape of `show object dynamic-address-group all`:
// result/device-groups/entry[@name]/entry[@name]/member-list/entry[@name]

#[derive(Debug, Deserialize)]
pub(crate) struct DagResult {
    #[serde(rename = "device-groups")]
    pub device_groups: Option<DagDeviceGroups>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DagDeviceGroups {
    #[serde(default, rename = "entry")]
    pub entries: Vec<DagDeviceGroupEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DagDeviceGroupEntry {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(default, rename = "entry")]
    pub groups: Vec<DagGroupEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DagGroupEntry {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "member-list")]
    pub member_list: Option<DagMemberList>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DagMemberList {
    #[serde(default, rename = "entry")]
    pub entries: Vec<NamedEntry>,
}

/// Live dynamic-address-group membership, flattened per device group.
#[derive(Debug, Clone, Default)]
pub struct DagSnapshot {
    pub device_groups: Vec<DagDeviceGroup>,
}

#[derive(Debug, Clone)]
pub struct DagDeviceGroup {
    pub name: String,
    pub groups: Vec<DagGroup>,
}

#[derive(Debug, Clone)]
pub struct DagGroup {
    pub name: String,
    pub members: Vec<String>,
}

impl DagSnapshot {
    /// All member names currently resolved into any dynamic group.
    pub fn member_set(&self) -> HashSet<&str> {
        self.device_groups
            .iter()
            .flat_map(|dg| &dg.groups)
            .flat_map(|g| &g.members)
            .map(String::as_str)
            .collect()
    }

    /// `(device group, dynamic group, member)` rows across the snapshot.
    pub fn memberships(&self) -> Vec<(&str, &str, &str)> {
        let mut rows = Vec::new();
        for dg in &self.device_groups {
            for group in &dg.groups {
                for member in &group.members {
                    rows.push((dg.name.as_str(), group.name.as_str(), member.as_str()));
                }
            }
        }
        rows
    }
}

impl From<DagResult> for DagSnapshot {
    fn from(raw: DagResult) -> Self {
        let device_groups = raw
            .device_groups
            .unwrap_or_default()
            .entries
            .into_iter()
            .map(|dg| DagDeviceGroup {
                name: dg.name,
                groups: dg
                    .groups
                    .into_iter()
                    .map(|g| DagGroup {
                        name: g.name,
                        members: g
                            .member_list
                            .unwrap_or_default()
                            .entries
                            .into_iter()
                            .map(|m| m.name)
                            .collect(),
                    })
                    .collect(),
            })
            .collect();
        Self { device_groups }
    }
}

// ── Security rules ───────────────────────────────────────────────────

/// Parsed fields of a rule the tools inspect for split eligibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct RuleView {
    #[serde(rename = "@name")]
    name: String,
    #[serde(default)]
    from: Members,
    #[serde(default)]
    to: Members,
    #[serde(default)]
    disabled: Option<String>,
    #[serde(default)]
    tag: Option<Members>,
}

/// A security rule: the raw `<entry name="…">` element as stored on the
/// device, plus the parsed fields the tools inspect.
///
/// Mutations rewrite the raw XML, so schema fields the parsed view does
/// not model (`<target>`, `<schedule>`, profile settings, …) survive
/// cloning byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEntry {
    raw: String,
    view: RuleView,
}

impl RuleEntry {
    /// Parse one raw `<entry name="…">…</entry>` element.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let view: RuleView = quick_xml::de::from_str(raw).map_err(|e| Error::Parse {
            message: e.to_string(),
            body: raw.to_owned(),
        })?;
        Ok(Self {
            raw: raw.to_owned(),
            view,
        })
    }

    pub fn name(&self) -> &str {
        &self.view.name
    }

    pub fn from_zones(&self) -> &[String] {
        &self.view.from.member
    }

    pub fn to_zones(&self) -> &[String] {
        &self.view.to.member
    }

    pub fn is_disabled(&self) -> bool {
        self.view.disabled.as_deref() == Some("yes")
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.view.tag.as_ref().is_some_and(|t| t.contains(tag))
    }

    /// The raw element, suitable as an `action=set` payload.
    pub fn element(&self) -> &str {
        &self.raw
    }

    /// Deep-copy this rule under a new name with a single zone pair.
    /// Only the name attribute and the two zone lists change; every other
    /// part of the element is carried over from the raw XML.
    pub fn clone_for_zone_pair(&self, name: &str, src: &str, dst: &str) -> Result<Self, Error> {
        let raw = rewrite_entry(&self.raw, name, src, dst)?;
        Self::parse(&raw)
    }
}

/// Stream `raw` through a writer, renaming the root `<entry>` and
/// replacing the depth-1 `<from>`/`<to>` lists with single members.
fn rewrite_entry(raw: &str, name: &str, src: &str, dst: &str) -> Result<String, Error> {
    use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

    let parse_err = |message: String| Error::Parse {
        message,
        body: raw.to_owned(),
    };

    let mut reader = quick_xml::Reader::from_str(raw);
    let mut writer = quick_xml::Writer::new(Vec::new());
    let mut depth = 0u32;

    loop {
        match reader.read_event().map_err(|e| parse_err(e.to_string()))? {
            Event::Start(e) => {
                depth += 1;
                let elem = e.name().as_ref().to_vec();
                if depth == 1 && elem == b"entry" {
                    let mut entry = BytesStart::new("entry");
                    entry.push_attribute(("name", name));
                    writer
                        .write_event(Event::Start(entry))
                        .map_err(|e| parse_err(e.to_string()))?;
                } else if depth == 2 && (elem == b"from" || elem == b"to") {
                    let (tag, zone) = if elem == b"from" {
                        ("from", src)
                    } else {
                        ("to", dst)
                    };
                    for event in [
                        Event::Start(BytesStart::new(tag)),
                        Event::Start(BytesStart::new("member")),
                        Event::Text(BytesText::new(zone)),
                        Event::End(BytesEnd::new("member")),
                        Event::End(BytesEnd::new(tag)),
                    ] {
                        writer
                            .write_event(event)
                            .map_err(|e| parse_err(e.to_string()))?;
                    }
                    reader
                        .read_to_end(quick_xml::name::QName(&elem))
                        .map_err(|e| parse_err(e.to_string()))?;
                    depth -= 1;
                } else {
                    writer
                        .write_event(Event::Start(e))
                        .map_err(|e| parse_err(e.to_string()))?;
                }
            }
            Event::End(e) => {
                depth -= 1;
                writer
                    .write_event(Event::End(e))
                    .map_err(|e| parse_err(e.to_string()))?;
            }
            Event::Eof => break,
            event => writer
                .write_event(event)
                .map_err(|e| parse_err(e.to_string()))?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| parse_err(e.to_string()))
}

/// Extract the `<rules><entry>…</entry></rules>` elements of a config-get
/// response as raw slices and parse each into a [`RuleEntry`], preserving
/// device order.
pub(crate) fn rules_from_response(body: &str) -> Result<Vec<RuleEntry>, Error> {
    use quick_xml::events::Event;

    let parse_err = |message: String| Error::Parse {
        message,
        body: body.to_owned(),
    };

    let mut reader = quick_xml::Reader::from_str(body);
    let mut rules = Vec::new();
    let mut in_rules = false;
    // element depth inside the entry currently being captured
    let mut depth = 0u32;
    let mut start = 0usize;
    let mut prev = 0usize;

    loop {
        match reader.read_event().map_err(|e| parse_err(e.to_string()))? {
            Event::Start(e) => {
                if depth > 0 {
                    depth += 1;
                } else if in_rules && e.name().as_ref() == b"entry" {
                    start = prev;
                    depth = 1;
                } else if e.name().as_ref() == b"rules" {
                    in_rules = true;
                }
            }
            Event::End(e) => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        let end = usize::try_from(reader.buffer_position())
                            .map_err(|e| parse_err(e.to_string()))?;
                        let raw = body
                            .get(start..end)
                            .ok_or_else(|| parse_err("rule element out of bounds".to_owned()))?;
                        rules.push(RuleEntry::parse(raw)?);
                    }
                } else if e.name().as_ref() == b"rules" {
                    in_rules = false;
                }
            }
            Event::Empty(e) => {
                if depth == 0 && in_rules && e.name().as_ref() == b"entry" {
                    let end = usize::try_from(reader.buffer_position())
                        .map_err(|e| parse_err(e.to_string()))?;
                    let raw = body
                        .get(prev..end)
                        .ok_or_else(|| parse_err("rule element out of bounds".to_owned()))?;
                    rules.push(RuleEntry::parse(raw)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        prev =
            usize::try_from(reader.buffer_position()).map_err(|e| parse_err(e.to_string()))?;
    }

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const RULE_XML: &str = r#"<entry name="allow-web">
            <from><member>trust</member><member>dmz</member></from>
            <to><member>untrust</member><member>dmz</member></to>
            <source><member>any</member></source>
            <destination><member>any</member></destination>
            <application><member>web-browsing</member></application>
            <service><member>application-default</member></service>
            <action>allow</action>
            <log-end>yes</log-end>
            <schedule>work-hours</schedule>
            <target><devices><entry name="007951000001"/></devices></target>
            <tag><member>reviewed</member></tag>
        </entry>"#;

    #[test]
    fn rule_entry_parses_zone_and_tag_lists() {
        let rule = RuleEntry::parse(RULE_XML).expect("parse rule");
        assert_eq!(rule.name(), "allow-web");
        assert_eq!(rule.from_zones(), ["trust", "dmz"]);
        assert_eq!(rule.to_zones(), ["untrust", "dmz"]);
        assert!(rule.has_tag("reviewed"));
        assert!(!rule.has_tag("ZONE_SPLIT"));
        assert!(!rule.is_disabled());
    }

    #[test]
    fn clone_rewrites_name_and_zone_pair_only() {
        let rule = RuleEntry::parse(RULE_XML).expect("parse rule");
        let clone = rule
            .clone_for_zone_pair("allow-web_clone_1", "trust", "untrust")
            .expect("clone rule");

        assert_eq!(clone.name(), "allow-web_clone_1");
        assert_eq!(clone.from_zones(), ["trust"]);
        assert_eq!(clone.to_zones(), ["untrust"]);
        // everything else is carried over from the raw element
        assert!(clone.element().contains("<action>allow</action>"));
        assert!(clone.element().contains("<schedule>work-hours</schedule>"));
        assert!(clone
            .element()
            .contains(r#"<target><devices><entry name="007951000001"/></devices></target>"#));
        assert!(clone.element().contains("<tag><member>reviewed</member></tag>"));
        // the original is untouched
        assert_eq!(rule.from_zones(), ["trust", "dmz"]);
        assert!(rule.element().contains("<member>dmz</member>"));
    }

    #[test]
    fn clone_does_not_rename_nested_entries() {
        let rule = RuleEntry::parse(RULE_XML).expect("parse rule");
        let clone = rule
            .clone_for_zone_pair("c1", "dmz", "untrust")
            .expect("clone rule");
        assert!(clone.element().starts_with(r#"<entry name="c1">"#));
        assert!(clone.element().contains(r#"<entry name="007951000001"/>"#));
    }

    #[test]
    fn rules_from_response_captures_raw_entries_in_order() {
        let body = r#"<response status="success"><result>
            <rules>
                <entry name="first">
                    <from><member>a</member><member>b</member></from>
                    <to><member>c</member></to>
                    <target><devices><entry name="sn1"/></devices></target>
                </entry>
                <entry name="second">
                    <from><member>a</member></from>
                    <to><member>c</member></to>
                    <disabled>yes</disabled>
                </entry>
            </rules>
        </result></response>"#;

        let rules = rules_from_response(body).expect("parse rules");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name(), "first");
        assert!(rules[0].element().contains(r#"<entry name="sn1"/>"#));
        assert_eq!(rules[1].name(), "second");
        assert!(rules[1].is_disabled());
        assert!(rules[1].element().starts_with(r#"<entry name="second">"#));
        assert!(rules[1].element().ends_with("</entry>"));
    }

    #[test]
    fn rules_from_response_handles_an_empty_result() {
        let body = r#"<response status="success"><result/></response>"#;
        assert!(rules_from_response(body).expect("parse rules").is_empty());
    }

    #[test]
    fn dag_snapshot_flattens_member_lists() {
        let xml = r#"
            <response status="success"><result>
                <device-groups>
                    <entry name="branch">
                        <entry name="dag-quarantine">
                            <member-list>
                                <entry name="host-a" type="ip-netmask"/>
                                <entry name="host-b" type="ip-netmask"/>
                            </member-list>
                        </entry>
                        <entry name="dag-empty"/>
                    </entry>
                </device-groups>
            </result></response>"#;
        let raw: Response<DagResult> = quick_xml::de::from_str(xml).expect("parse snapshot");
        let snapshot = DagSnapshot::from(raw.result);

        let members = snapshot.member_set();
        assert!(members.contains("host-a"));
        assert!(members.contains("host-b"));
        assert_eq!(members.len(), 2);

        let rows = snapshot.memberships();
        assert_eq!(rows, vec![
            ("branch", "dag-quarantine", "host-a"),
            ("branch", "dag-quarantine", "host-b"),
        ]);
    }

    #[test]
    fn address_entry_without_tags_maps_to_empty_tag_list() {
        let xml = r#"<entry name="web-srv"><ip-netmask>10.0.0.5/32</ip-netmask></entry>"#;
        let entry: AddressEntry = quick_xml::de::from_str(xml).expect("parse address");
        let object = AddressObject::from(entry);
        assert_eq!(object.name, "web-srv");
        assert!(object.tags.is_empty());
    }
}
