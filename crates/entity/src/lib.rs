pub mod app_user;
pub mod department;
pub mod designation;
pub mod employee;
pub mod employee_profile;
pub mod user_credential;
