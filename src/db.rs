pub mod dashboard_repo;
pub use dashboard_repo::DashboardRepository;
pub mod feedback_repo;
pub use feedback_repo::FeedbackRepository;
pub mod lead_repo;
pub use lead_repo::LeadRepository;
pub mod member_repo;
pub use member_repo::MemberRepository;
