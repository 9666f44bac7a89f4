//! Async client for the PAN-OS XML management API and the WildFire
//! verdict API.
//!
//! [`Session::connect`] performs one authenticated handshake and classifies
//! the endpoint as a single firewall or a Panorama orchestrator; the
//! [`Panorama`] handle exposes the device-group operations the automation
//! tasks are built on.

pub mod error;
pub mod model;
pub mod session;
pub mod transport;
pub mod wildfire;
pub mod xapi;

pub use error::Error;
pub use model::{AddressObject, DagSnapshot, RuleEntry, SystemInfo};
pub use session::{Firewall, Panorama, Session};
pub use transport::{TlsMode, TransportConfig};
pub use wildfire::{Verdict, WildfireClient};
pub use xapi::XapiClient;
