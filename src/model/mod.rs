pub mod admin;
pub mod answer;
pub mod auth;
pub mod pagination;
pub mod participant;
pub mod question;
pub mod report;
pub mod sqlite;
