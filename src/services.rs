pub mod auth;
pub mod assignment_service;
pub use assignment_service::AssignmentService;
pub mod dashboard_service;
pub use dashboard_service::DashboardService;
pub mod feedback_service;
pub use feedback_service::FeedbackService;
pub mod lead_service;
pub use lead_service::LeadService;
