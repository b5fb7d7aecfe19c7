//! Storefront backend server
//!
//! # Architecture
//!
//! - **engine**: the order & fulfillment consistency engine: stock and
//!   coupon counters, the order state machines, receipt verification,
//!   refund adjudication, and the notification outbox, all over a single
//!   crash-safe redb store
//! - **collaborators**: trait boundaries for the catalog, object storage,
//!   and notifier this system depends on but does not own
//! - **auth**: JWT validation and the typed customer/staff identity
//! - **api**: HTTP routes and handlers
//! - **core**: configuration, state, logging, server bootstrap
//!
//! # Module Structure
//!
//! ```text
//! store-server/src/
//! ├── core/           # Config, state, logging, server
//! ├── auth/           # JWT, caller identity
//! ├── engine/         # Consistency engine
//! ├── collaborators/  # External system boundaries
//! └── api/            # HTTP routes and handlers
//! ```

pub mod api;
pub mod auth;
pub mod collaborators;
pub mod core;
pub mod engine;

// Re-export public types
pub use auth::{CurrentUser, JwtService, Role};
pub use core::{Config, Server, ServerState};
pub use engine::{NotifyWorker, OrderEngine, Storage};

/// Load environment and initialize logging
pub fn setup_environment() {
    dotenv::dotenv().ok();
    core::logging::init_logger();
}

pub fn print_banner() {
    println!(
        r#"
   _____ __                  ____                  __
  / ___// /_____  ________  / __/________  ____  / /_
  \__ \/ __/ __ \/ ___/ _ \/ /_/ ___/ __ \/ __ \/ __/
 ___/ / /_/ /_/ / /  /  __/ __/ /  / /_/ / / / / /_
/____/\__/\____/_/   \___/_/ /_/   \____/_/ /_/\__/
"#
    );
}
