mod application_info;
mod capabilities;
mod pairing_info;
mod version;

pub use application_info::ApplicationInfo;
pub use capabilities::{Capabilities, Capability};
pub use pairing_info::PairingInfo;
pub use version::Version;
