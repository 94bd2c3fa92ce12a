pub mod agentcis;
pub mod attendance;
pub mod delivery;
pub mod hr;
pub mod reports;
pub mod sheets;
