pub mod attendance;
pub mod employee;
pub mod location;
pub mod payroll;
pub mod role;
pub mod shift;
pub mod site;
pub mod user;
