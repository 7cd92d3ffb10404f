pub mod abuseipdb;
pub mod comment;
