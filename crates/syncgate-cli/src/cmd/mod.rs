pub mod config;
pub mod init;
pub mod rotation;
pub mod run;
pub mod watermark;
