//! sfd-orders
//!
//! Order status workflow for the storefront admin.
//! - `OrderStatus` is a closed set; labels outside it are rejected at parse time
//! - `TransitionTable` is an immutable value, injected wherever it is needed
//! - `WorkflowValidator` answers "may the admin move this order from X to Y?"
//!   and, when not, which route through the workflow it must take
//!
//! Pure deterministic logic. No IO. Shared by the CLI and the daemon so the
//! client-side check and the server-side check cannot diverge.

mod registry;
mod status;
mod table;
mod update;
mod validator;

pub use registry::{WorkflowConfigError, WorkflowRegistry, WorkflowSpec};
pub use status::{OrderStatus, UnknownStatus};
pub use table::{CancelPolicy, TableError, TransitionTable};
pub use update::{check_status_update, AcceptedUpdate, StatusUpdateRequest, UpdateRefusal};
pub use validator::{workflow_message, TransitionVerdict, WorkflowValidator};
