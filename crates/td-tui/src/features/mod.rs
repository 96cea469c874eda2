pub mod auth;
pub mod task_form;
pub mod task_list;
