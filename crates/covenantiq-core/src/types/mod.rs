//! Domain types for the covenant compliance model.

mod alert;
mod covenant;
mod date;
mod ids;
mod loan;
mod operator;
mod status;

pub use alert::{Alert, AlertKey, AlertSeverity, AlertType};
pub use covenant::{Covenant, CovenantMeasurement};
pub use date::Date;
pub use ids::{AlertId, CovenantId, LoanId, MeasurementId, UserId};
pub use loan::{LoanAgreement, LoanLifecycle};
pub use operator::ThresholdOperator;
pub use status::{ComplianceStatus, Trajectory};
