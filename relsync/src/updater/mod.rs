//! Release synchronization.
//!
//! [`SyncManager`] reconciles the local and remote catalogs, resolves
//! inheritance chains, installs descriptors and drives the download jobs a
//! release needs before it can be launched:
//!
//! ```text
//! prepare_launch(id)
//!   ├─ newer remote copy?  ─► sync_release
//!   ├─ resolve + launch gates
//!   ├─ "Version & Libraries" job  (blocking, failures abort)
//!   ├─ "Resources" job            (best effort)
//!   ├─ virtual asset tree
//!   └─ every required file present? ─► LaunchPlan
//! ```

mod manager;
mod state;

pub use manager::{LaunchPlan, SyncManager, LIBRARIES_JOB, RESOURCES_JOB};
pub use state::{ReleaseState, ReleaseStatus};
