//! Domain services

pub mod sms_template;
