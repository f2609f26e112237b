pub mod generate;
pub mod health;
pub mod history;
pub mod papers;
pub mod projects;
