pub mod endpoint;
pub mod ipapi;
pub mod opencage;
