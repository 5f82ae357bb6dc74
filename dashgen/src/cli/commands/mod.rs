// Command implementations, one module per subcommand

pub mod apply;
pub mod init;
pub mod render;
pub mod scan;
pub mod serve;
