// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resource model shared by the provider surface and the orchestrator
//!
//! Resource handles are opaque, cloud-assigned identifiers.  The console
//! never persists them; they are round-tripped through each call.  The one
//! exception to opacity is the volume namespace, where the provider encodes
//! the boot/block distinction into the identifier itself; we parse that
//! once, at the provider boundary, into [`VolumeHandle`].

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use uuid::Uuid;

/// Provider-reported lifecycle state of a compute instance
///
/// Transitions are monotonic forward except Running <-> Stopped via explicit
/// actions; Terminated is absorbing.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceState {
    Provisioning,
    Starting,
    Running,
    Stopping,
    Stopped,
    Terminating,
    Terminated,
}

impl InstanceState {
    pub fn is_terminated(&self) -> bool {
        matches!(self, InstanceState::Terminated)
    }

    /// States in which the primary VNIC is gone or going away, so IP
    /// enrichment is skipped.
    pub fn network_gone(&self) -> bool {
        matches!(self, InstanceState::Terminating | InstanceState::Terminated)
    }
}

impl Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceState::Provisioning => "PROVISIONING",
            InstanceState::Starting => "STARTING",
            InstanceState::Running => "RUNNING",
            InstanceState::Stopping => "STOPPING",
            InstanceState::Stopped => "STOPPED",
            InstanceState::Terminating => "TERMINATING",
            InstanceState::Terminated => "TERMINATED",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle state of an attachment (VNIC, block volume, boot volume)
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttachmentState {
    Attaching,
    Attached,
    Detaching,
    Detached,
}

impl Display for AttachmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AttachmentState::Attaching => "ATTACHING",
            AttachmentState::Attached => "ATTACHED",
            AttachmentState::Detaching => "DETACHING",
            AttachmentState::Detached => "DETACHED",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle state of a public IP object
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IpState {
    Provisioning,
    Available,
    Assigned,
    Terminating,
    Terminated,
}

impl Display for IpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IpState::Provisioning => "PROVISIONING",
            IpState::Available => "AVAILABLE",
            IpState::Assigned => "ASSIGNED",
            IpState::Terminating => "TERMINATING",
            IpState::Terminated => "TERMINATED",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle state of a block or boot volume
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeState {
    Provisioning,
    Available,
    Terminating,
    Terminated,
    Faulty,
}

/// Instance lifecycle actions accepted by the orchestrator
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceAction {
    Start,
    Stop,
    Reset,
    Terminate,
}

impl InstanceAction {
    /// Parses a caller-supplied action string.  "restart" is accepted as an
    /// alias for reset.
    pub fn parse(s: &str) -> Option<InstanceAction> {
        match s {
            "start" => Some(InstanceAction::Start),
            "stop" => Some(InstanceAction::Stop),
            "reset" | "restart" => Some(InstanceAction::Reset),
            "terminate" => Some(InstanceAction::Terminate),
            _ => None,
        }
    }

    /// The action name on the provider wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            InstanceAction::Start => "START",
            InstanceAction::Stop => "STOP",
            InstanceAction::Reset => "RESET",
            InstanceAction::Terminate => "TERMINATE",
        }
    }

    /// States that count as "action accepted" when observed after issuing
    /// this action.  Transitional states count: the orchestrator confirms
    /// acceptance, not completion.
    pub fn expected_states(&self) -> &'static [InstanceState] {
        match self {
            InstanceAction::Start => {
                &[InstanceState::Starting, InstanceState::Running]
            }
            InstanceAction::Stop => {
                &[InstanceState::Stopping, InstanceState::Stopped]
            }
            // A reset transits through multiple states quickly, so the
            // expected set is broad.
            InstanceAction::Reset => &[
                InstanceState::Stopping,
                InstanceState::Stopped,
                InstanceState::Starting,
                InstanceState::Running,
            ],
            InstanceAction::Terminate => {
                &[InstanceState::Terminating, InstanceState::Terminated]
            }
        }
    }

    /// States in which issuing this action is rejected locally because the
    /// instance is already in (or moving to) the semantically-equivalent
    /// state.  Terminate is absent: repeat termination is idempotent
    /// success, not an error.
    pub fn conflicting_states(&self) -> &'static [InstanceState] {
        match self {
            InstanceAction::Start => {
                &[InstanceState::Running, InstanceState::Starting]
            }
            InstanceAction::Stop => {
                &[InstanceState::Stopping, InstanceState::Stopped]
            }
            InstanceAction::Reset | InstanceAction::Terminate => &[],
        }
    }
}

impl Display for InstanceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InstanceAction::Start => "start",
            InstanceAction::Stop => "stop",
            InstanceAction::Reset => "reset",
            InstanceAction::Terminate => "terminate",
        };
        write!(f, "{}", s)
    }
}

/// A caller's request to act on an instance, validated before dispatch
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ActionRequest {
    pub tenant_id: Uuid,
    pub instance_id: String,
    pub action: String,
    /// Region override; the tenant's default region applies when absent.
    pub region: Option<String>,
}

/// Tagged handle distinguishing boot volumes from block volumes
///
/// The provider encodes the distinction as an identifier prefix; we parse
/// it exactly once and carry the tag through all calls instead of
/// re-sniffing strings downstream.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Hash, Serialize)]
pub enum VolumeHandle {
    Block(String),
    Boot(String),
}

/// Identifier prefix the provider uses for boot volumes.
pub const BOOT_VOLUME_PREFIX: &str = "ocid1.bootvolume.";

impl VolumeHandle {
    /// Classifies a wire identifier.  This is the only place the prefix
    /// convention is consulted.
    pub fn from_wire(id: &str) -> VolumeHandle {
        if id.starts_with(BOOT_VOLUME_PREFIX) {
            VolumeHandle::Boot(id.to_owned())
        } else {
            VolumeHandle::Block(id.to_owned())
        }
    }

    pub fn id(&self) -> &str {
        match self {
            VolumeHandle::Block(id) | VolumeHandle::Boot(id) => id,
        }
    }

    pub fn is_boot(&self) -> bool {
        matches!(self, VolumeHandle::Boot(_))
    }
}

/// Tagged handle for a volume attachment, mirroring [`VolumeHandle`]
///
/// Block and boot volume attachments live in different provider
/// namespaces, so detach and status calls must dispatch on the tag.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub enum VolumeAttachmentHandle {
    Block(String),
    Boot(String),
}

impl VolumeAttachmentHandle {
    pub fn id(&self) -> &str {
        match self {
            VolumeAttachmentHandle::Block(id)
            | VolumeAttachmentHandle::Boot(id) => id,
        }
    }
}

/// Compute instance as reported by the provider
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Instance {
    pub id: String,
    pub display_name: String,
    pub compartment_id: String,
    pub availability_domain: String,
    pub shape: String,
    pub lifecycle_state: InstanceState,
    pub time_created: DateTime<Utc>,
    pub shape_config: Option<ShapeConfig>,
    pub image_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ShapeConfig {
    pub ocpus: f32,
    pub memory_in_gbs: f32,
}

/// Virtual network interface
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Vnic {
    pub id: String,
    pub display_name: Option<String>,
    pub private_ip: String,
    pub public_ip: Option<String>,
    pub subnet_id: String,
    pub mac_address: String,
    pub is_primary: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VnicAttachment {
    pub id: String,
    pub instance_id: String,
    /// Absent while the attachment is still provisioning.
    pub vnic_id: Option<String>,
    pub lifecycle_state: AttachmentState,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PublicIp {
    pub id: String,
    pub ip_address: String,
    pub lifecycle_state: IpState,
    pub private_ip_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PrivateIp {
    pub id: String,
    pub ip_address: String,
    pub vnic_id: String,
}

/// Block or boot volume
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Volume {
    pub handle: VolumeHandle,
    pub display_name: String,
    pub size_in_gbs: u64,
    pub vpus_per_gb: u64,
    pub lifecycle_state: VolumeState,
    pub availability_domain: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VolumeAttachment {
    pub handle: VolumeAttachmentHandle,
    pub volume: VolumeHandle,
    pub instance_id: String,
    pub lifecycle_state: AttachmentState,
    pub time_created: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Vcn {
    pub id: String,
    pub display_name: String,
    pub cidr_block: String,
    pub dns_label: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Subnet {
    pub id: String,
    pub vcn_id: String,
    pub display_name: String,
    pub cidr_block: String,
    pub availability_domain: Option<String>,
}

/// A single ingress or egress rule
///
/// `cidr` is the source for ingress rules and the destination for egress
/// rules.  Port ranges apply to TCP ("6") and UDP ("17") protocols only.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct SecurityRule {
    pub protocol: String,
    pub cidr: String,
    pub description: Option<String>,
    pub port_min: Option<u16>,
    pub port_max: Option<u16>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SecurityList {
    pub id: String,
    pub vcn_id: String,
    pub display_name: String,
    pub ingress_rules: Vec<SecurityRule>,
    pub egress_rules: Vec<SecurityRule>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct RouteRule {
    pub destination: String,
    pub network_entity_id: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RouteTable {
    pub id: String,
    pub vcn_id: String,
    pub display_name: String,
    pub route_rules: Vec<RouteRule>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ConsoleConnection {
    pub id: String,
    pub instance_id: String,
    pub lifecycle_state: String,
    pub connection_string: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AvailabilityDomain {
    pub name: String,
}

/// Parameters for launching a new instance
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LaunchInstanceSpec {
    pub display_name: String,
    pub availability_domain: String,
    pub shape: String,
    pub image_id: String,
    pub subnet_id: String,
    pub boot_volume_size_in_gbs: Option<u64>,
    /// Flex shape sizing; ignored for fixed shapes.
    pub ocpus: Option<f32>,
    pub memory_in_gbs: Option<f32>,
    pub ssh_authorized_keys: Option<String>,
    pub assign_public_ip: bool,
}

/// One page of a paginated provider listing
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page: Option<String>,
}

/// A service visible in the limits catalog
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ServiceSummary {
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LimitValue {
    pub name: String,
    pub scope_type: String,
    pub availability_domain: Option<String>,
    pub value: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ResourceAvailability {
    pub used: u64,
    pub available: u64,
}

/// A raw cost/usage line item from the provider
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UsageLineItem {
    pub service: Option<String>,
    pub sku_name: Option<String>,
    pub unit: Option<String>,
    pub computed_quantity: Option<f64>,
    pub computed_amount: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Subscription {
    pub service_name: String,
    pub payment_model: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub lifecycle_state: String,
}

/// Normalized instance view returned to the presentation layer
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InstanceView {
    pub id: String,
    pub display_name: String,
    pub lifecycle_state: InstanceState,
    pub availability_domain: String,
    pub shape: String,
    pub time_created: DateTime<Utc>,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
    pub ocpus: Option<f32>,
    pub memory_in_gbs: Option<f32>,
}

/// VNIC view including its attachment, for instance detail pages
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VnicView {
    pub id: String,
    pub display_name: Option<String>,
    pub private_ip: String,
    pub public_ip: Option<String>,
    pub subnet_id: String,
    pub mac_address: String,
    pub is_primary: bool,
    pub attachment_id: String,
    pub attachment_state: AttachmentState,
}

/// Attached volume view, tagged with its handle for later detach/update
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VolumeView {
    pub handle: VolumeHandle,
    pub display_name: String,
    pub size_in_gbs: u64,
    pub vpus_per_gb: u64,
    pub lifecycle_state: AttachmentState,
    pub attachment: VolumeAttachmentHandle,
}

/// One service limit with its usage, as reported by the quota aggregator
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QuotaEntry {
    pub service_name: String,
    pub limit_name: String,
    pub scope_type: String,
    pub availability_domain: Option<String>,
    pub quota: u64,
    pub used: u64,
    pub available: u64,
    pub usage_rate: f64,
}

/// Aggregated usage for one (SKU, unit) group
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UsageSummary {
    pub service: String,
    pub sku_name: String,
    pub unit: String,
    pub total_quantity: f64,
    pub total_cost: f64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_action_parsing() {
        assert_eq!(InstanceAction::parse("start"), Some(InstanceAction::Start));
        assert_eq!(
            InstanceAction::parse("restart"),
            Some(InstanceAction::Reset)
        );
        assert_eq!(InstanceAction::parse("reset"), Some(InstanceAction::Reset));
        assert_eq!(InstanceAction::parse("softreset"), None);
        assert_eq!(InstanceAction::parse("START"), None);
    }

    #[test]
    fn test_volume_handle_classification() {
        let boot = VolumeHandle::from_wire("ocid1.bootvolume.oc1..aaaa");
        assert!(boot.is_boot());
        assert_eq!(boot.id(), "ocid1.bootvolume.oc1..aaaa");

        let block = VolumeHandle::from_wire("ocid1.volume.oc1..bbbb");
        assert!(!block.is_boot());
    }

    #[test]
    fn test_expected_states() {
        assert!(InstanceAction::Start
            .expected_states()
            .contains(&InstanceState::Starting));
        assert!(!InstanceAction::Stop
            .expected_states()
            .contains(&InstanceState::Running));
        assert_eq!(InstanceAction::Reset.expected_states().len(), 4);
    }

    #[test]
    fn test_state_wire_format() {
        let s = serde_json::to_string(&InstanceState::Provisioning).unwrap();
        assert_eq!(s, "\"PROVISIONING\"");
        let s: InstanceState = serde_json::from_str("\"RUNNING\"").unwrap();
        assert_eq!(s, InstanceState::Running);
    }
}
