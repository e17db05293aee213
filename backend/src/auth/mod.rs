pub mod context;
pub mod guard;
pub mod provider;
pub mod session;

pub use context::{AuthContext, AuthEvent, AuthState};
pub use guard::{AdminUser, GuardDecision, check_admin, require_admin};
pub use provider::{AuthProvider, SignUpOutcome};
pub use session::{CurrentSession, SessionStore};
