//! Authenticated sessions and endpoint classification.
//!
//! [`Session::connect`] performs the one handshake of a run and returns an
//! explicit tagged result: a [`Firewall`] for a single device or a
//! [`Panorama`] for a multi-device-group orchestrator. Callers match on
//! the variant instead of inspecting a generic handle after the fact.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::Error;
use crate::model::{
    rules_from_response, AddressObject, AddressResult, DagResult, DagSnapshot, DeviceGroupResult,
    Response, RuleEntry, SystemInfo, SystemInfoResult,
};
use crate::transport::TransportConfig;
use crate::xapi::XapiClient;

const SYSTEM_INFO_CMD: &str = "<show><system><info></info></system></show>";
const DAG_SNAPSHOT_CMD: &str =
    "<show><object><dynamic-address-group><all></all></dynamic-address-group></object></show>";

/// An authenticated management session, classified by endpoint kind.
pub enum Session {
    Firewall(Firewall),
    Panorama(Panorama),
}

impl Session {
    /// Authenticate against `host` and classify the endpoint from its
    /// `show system info` model string.
    ///
    /// Failures here are operator-actionable (wrong address, wrong
    /// credentials), so there is no automatic retry.
    pub async fn connect(
        host: &str,
        username: &str,
        password: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let client =
            XapiClient::connect(host, username, password.expose_secret(), transport).await?;

        let info: Response<SystemInfoResult> = client.op(SYSTEM_INFO_CMD, None).await?;
        let info = info.result.system;
        debug!(model = %info.model, hostname = %info.hostname, "classified endpoint");

        if info.is_panorama() {
            Ok(Self::Panorama(Panorama { client, info }))
        } else {
            Ok(Self::Firewall(Firewall { client, info }))
        }
    }

    /// Human-readable mode tag for reports.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Firewall(_) => "Firewall",
            Self::Panorama(_) => "Panorama",
        }
    }

    pub fn system_info(&self) -> &SystemInfo {
        match self {
            Self::Firewall(fw) => &fw.info,
            Self::Panorama(pano) => &pano.info,
        }
    }
}

/// A session against a single firewall.
pub struct Firewall {
    client: XapiClient,
    info: SystemInfo,
}

impl Firewall {
    pub fn info(&self) -> &SystemInfo {
        &self.info
    }

    pub fn client(&self) -> &XapiClient {
        &self.client
    }
}

/// A session against a Panorama orchestrator managing device groups.
pub struct Panorama {
    client: XapiClient,
    info: SystemInfo,
}

impl Panorama {
    pub fn info(&self) -> &SystemInfo {
        &self.info
    }

    // ── Enumeration ──────────────────────────────────────────────────

    /// Names of all device groups configured on this Panorama.
    pub async fn device_groups(&self) -> Result<Vec<String>, Error> {
        let result: Response<DeviceGroupResult> =
            self.client.config_get(&device_groups_xpath()).await?;
        Ok(result
            .result
            .device_group
            .unwrap_or_default()
            .entries
            .into_iter()
            .map(|e| e.name)
            .collect())
    }

    /// Address objects defined in a device group, with their tags.
    pub async fn address_objects(&self, device_group: &str) -> Result<Vec<AddressObject>, Error> {
        let xpath = format!("{}/address", device_group_xpath(device_group));
        self.addresses_at(&xpath).await
    }

    /// Address objects defined in the shared scope.
    pub async fn shared_address_objects(&self) -> Result<Vec<AddressObject>, Error> {
        self.addresses_at("/config/shared/address").await
    }

    async fn addresses_at(&self, xpath: &str) -> Result<Vec<AddressObject>, Error> {
        let result: Response<AddressResult> = self.client.config_get(xpath).await?;
        Ok(result
            .result
            .address
            .unwrap_or_default()
            .entries
            .into_iter()
            .map(AddressObject::from)
            .collect())
    }

    /// Live dynamic-address-group membership snapshot across all device
    /// groups (an operational command, not a config read).
    pub async fn dynamic_group_snapshot(&self) -> Result<DagSnapshot, Error> {
        let result: Response<DagResult> =
            self.client.op(DAG_SNAPSHOT_CMD, Some("vsys1")).await?;
        Ok(DagSnapshot::from(result.result))
    }

    /// Security rules in a device group's post-rulebase, in evaluation
    /// order. Each rule keeps its raw `<entry>` element so mutations
    /// never drop fields the typed view does not model.
    pub async fn post_rulebase(&self, device_group: &str) -> Result<Vec<RuleEntry>, Error> {
        let body = self
            .client
            .config_get_raw(&post_rules_xpath(device_group))
            .await?;
        rules_from_response(&body)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Create a new rule at the end of the post-rulebase.
    pub async fn create_rule(&self, device_group: &str, rule: &RuleEntry) -> Result<(), Error> {
        self.client
            .config_set(&post_rules_xpath(device_group), rule.element())
            .await
    }

    /// Append `tag` to a rule's tag list. `action=set` is additive, so
    /// the rest of the rule is untouched on the device.
    pub async fn tag_rule(
        &self,
        device_group: &str,
        rule_name: &str,
        tag: &str,
    ) -> Result<(), Error> {
        let xpath = format!("{}/tag", rule_xpath(device_group, rule_name));
        let element = format!("<member>{}</member>", quick_xml::escape::escape(tag));
        self.client.config_set(&xpath, &element).await
    }

    /// Move `rule_name` immediately before `dst_name` in the post-rulebase.
    pub async fn move_rule_before(
        &self,
        device_group: &str,
        rule_name: &str,
        dst_name: &str,
    ) -> Result<(), Error> {
        let xpath = rule_xpath(device_group, rule_name);
        self.client.config_move_before(&xpath, dst_name).await
    }
}

/// Open a session with default transport settings.
pub async fn connect(
    host: &str,
    username: &str,
    password: &SecretString,
) -> Result<Session, Error> {
    Session::connect(host, username, password, &TransportConfig::default()).await
}

// ── XPath builders ───────────────────────────────────────────────────

fn device_groups_xpath() -> String {
    "/config/devices/entry[@name='localhost.localdomain']/device-group".to_owned()
}

fn device_group_xpath(device_group: &str) -> String {
    format!("{}/entry[@name='{device_group}']", device_groups_xpath())
}

fn post_rules_xpath(device_group: &str) -> String {
    format!(
        "{}/post-rulebase/security/rules",
        device_group_xpath(device_group)
    )
}

fn rule_xpath(device_group: &str, rule_name: &str) -> String {
    format!(
        "{}/entry[@name='{rule_name}']",
        post_rules_xpath(device_group)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xpaths_scope_to_the_device_group() {
        assert_eq!(
            device_group_xpath("branch"),
            "/config/devices/entry[@name='localhost.localdomain']/device-group/entry[@name='branch']"
        );
        assert_eq!(
            rule_xpath("branch", "allow-web_clone_1"),
            "/config/devices/entry[@name='localhost.localdomain']/device-group/entry[@name='branch']/post-rulebase/security/rules/entry[@name='allow-web_clone_1']"
        );
    }
}
