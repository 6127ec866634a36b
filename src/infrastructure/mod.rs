pub mod cdp_driver;
pub mod driver;
pub mod session;

pub use cdp_driver::CdpDriver;
pub use driver::{cookie_header, BrowserDriver, SessionCookie};
pub use session::{Readiness, WorkflowSession};
