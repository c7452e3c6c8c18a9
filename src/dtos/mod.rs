pub mod contractdtos;
pub mod disputedtos;
